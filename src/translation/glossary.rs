/*!
 * User glossary.
 *
 * Parsed from `Term=Translation` lines. Glossary entries are forced
 * translations and take priority over anything else in the prompt.
 */

use log::warn;
use serde::{Deserialize, Serialize};

/// One forced translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub translation: String,
}

/// Ordered list of forced translations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glossary {
    terms: Vec<GlossaryTerm>,
}

impl Glossary {
    /// Parse `Term=Translation` lines.
    ///
    /// Blank lines and lines starting with `#` are ignored. Lines without
    /// `=` or with an empty side are skipped with a warning. A later entry
    /// for the same term replaces the earlier one.
    pub fn parse(text: &str) -> Self {
        let mut glossary = Self::default();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((term, translation)) = line.split_once('=') else {
                warn!("Ignoring glossary line {}: missing '='", number + 1);
                continue;
            };
            let (term, translation) = (term.trim(), translation.trim());
            if term.is_empty() || translation.is_empty() {
                warn!("Ignoring glossary line {}: empty term or translation", number + 1);
                continue;
            }
            glossary.insert(term, translation);
        }
        glossary
    }

    pub fn insert(&mut self, term: &str, translation: &str) {
        match self.terms.iter_mut().find(|t| t.term == term) {
            Some(existing) => existing.translation = translation.to_string(),
            None => self.terms.push(GlossaryTerm {
                term: term.to_string(),
                translation: translation.to_string(),
            }),
        }
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|t| t.term == term)
            .map(|t| t.translation.as_str())
    }

    pub fn terms(&self) -> &[GlossaryTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
