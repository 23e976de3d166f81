/*!
 * Prompt templates for slide translation.
 *
 * The request is sent as JSON inside the user prompt; the model must answer
 * with JSON only. Responses wrapped in a Markdown code fence are accepted.
 */

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::TranslationError;
use crate::model::{RunText, TranslationResult};
use crate::translation::glossary::Glossary;
use crate::translation::items::TranslationItem;

/// System prompt template for slide translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for slide text translation.
    pub const SLIDE_TRANSLATOR: &'static str = r#"You are a professional translator localizing presentation slides from {source_language} to {target_language}.

## Input
- A JSON object with an "items" array
- Each item is one paragraph or table cell, split into formatting runs
- Each run has an "index" and a "text"

## Rules
- Translate every run and return it under the same index
- Never merge, split, add, drop or reorder runs
- Keep leading and trailing whitespace of each run unchanged
- Leave placeholders, URLs, email addresses, product codes and numbers unchanged
- A run may be a fragment of a sentence; translate it so the runs read naturally when concatenated

## Output Requirements
- Return ONLY valid JSON of the form {"items": [{"paragraphId": "...", "translatedRuns": [{"index": 0, "text": "..."}]}]}
- Do not include any text outside the JSON structure"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default slide translator template.
    pub fn slide_translator() -> Self {
        Self::new(Self::SLIDE_TRANSLATOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::slide_translator()
    }
}

/// Builder for constructing translation prompts for one chunk.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    source_language: String,
    target_language: String,
    items: Vec<TranslationItem>,
    glossary: Option<Glossary>,
    fit_to_length: Option<u8>,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder. Languages are display names, with
    /// "auto" meaning the source language should be detected.
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            items: Vec::new(),
            glossary: None,
            fit_to_length: None,
        }
    }

    /// Set the items to translate.
    pub fn with_items(mut self, items: &[TranslationItem]) -> Self {
        self.items = items.to_vec();
        self
    }

    /// Set the glossary of forced translations.
    pub fn with_glossary(mut self, glossary: &Glossary) -> Self {
        if !glossary.is_empty() {
            self.glossary = Some(glossary.clone());
        }
        self
    }

    /// Ask the model to keep translations close to the original length.
    /// Strength 0 disables the instruction.
    pub fn with_fit_to_length(mut self, strength: Option<u8>) -> Self {
        self.fit_to_length = strength.filter(|s| *s > 0).map(|s| s.min(100));
        self
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        let source = if self.source_language.eq_ignore_ascii_case("auto") {
            "the detected source language"
        } else {
            self.source_language.as_str()
        };
        let mut prompt = PromptTemplate::slide_translator().render(source, &self.target_language);

        if let Some(glossary) = &self.glossary {
            prompt.push_str("\n\n## Glossary (highest priority)\nAlways translate these terms exactly as given:\n");
            for term in glossary.terms() {
                prompt.push_str(&format!("- {} => {}\n", term.term, term.translation));
            }
        }

        if let Some(strength) = self.fit_to_length {
            prompt.push_str(&format!(
                "\n\n## Length\nKeep each translated run close to the length of the original. \
                 Strength {}%: at 100% shorten aggressively, lower values allow more freedom.",
                strength
            ));
        }

        prompt
    }

    /// Build the user prompt as a JSON request.
    pub fn build_user_prompt(&self) -> String {
        let request = TranslationRequest {
            items: self
                .items
                .iter()
                .map(|item| RequestItem {
                    paragraph_id: item.paragraph_id.clone(),
                    runs: item.runs.clone(),
                })
                .collect(),
        };

        serde_json::to_string_pretty(&request).unwrap_or_else(|_| "{}".to_string())
    }

    /// Build both system and user prompts.
    pub fn build(&self) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt())
    }
}

/// Translation request structure for JSON communication with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub items: Vec<RequestItem>,
}

/// One paragraph or cell in a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItem {
    pub paragraph_id: String,
    pub runs: Vec<RunText>,
}

/// Expected response structure from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub items: Vec<TranslationResult>,
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model response against the items that were requested.
///
/// Unknown paragraph ids and run indices are dropped, missing ones are simply
/// absent from the result. Anything that is not the expected JSON shape is a
/// schema violation for the whole chunk.
pub fn parse_response(
    content: &str,
    requested: &[TranslationItem],
) -> Result<Vec<TranslationResult>, TranslationError> {
    let json = strip_code_fence(content);
    let response: TranslationResponse = serde_json::from_str(json)
        .map_err(|e| TranslationError::SchemaViolation(format!("{}: {}", e, truncate(json, 80))))?;

    let expected: HashMap<&str, HashSet<usize>> = requested
        .iter()
        .map(|item| {
            (
                item.paragraph_id.as_str(),
                item.runs.iter().map(|r| r.index).collect(),
            )
        })
        .collect();

    Ok(response
        .items
        .into_iter()
        .filter_map(|result| {
            let indices = expected.get(result.paragraph_id.as_str())?;
            let translated_runs: Vec<RunText> = result
                .translated_runs
                .into_iter()
                .filter(|run| indices.contains(&run.index))
                .collect();
            Some(TranslationResult {
                paragraph_id: result.paragraph_id,
                translated_runs,
            })
        })
        .collect())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
