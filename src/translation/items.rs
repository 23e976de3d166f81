/*!
 * Translation work items.
 *
 * Every paragraph and table cell becomes one item addressed by its id. Runs
 * that carry nothing to translate are left out of the item, and items with
 * no translatable run at all are dropped before any provider call.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{RunText, SlideTargets};

/// Characters that never need translating on their own
const PROTECTED_SYMBOLS: &[char] = &[
    '%', '(', ')', '[', ']', '{', '}', '.', ',', ';', ':', '!', '?', '-', '+', '=', '/', '\\',
    '*', '#', '@', '&', '|', '<', '>', '~', '^', '_', '\'', '"', '`', '$', '€', '£', '¥', '©',
    '®', '™', '°', '•', '·', '…', '–', '—', '→', '←', '↑', '↓', '✓', '✔', '×', '÷', '±', '§',
    '¶',
];

/// Whether a run text can be left as is.
///
/// True for empty and whitespace-only text, and for text made only of
/// digits, whitespace, protected symbols and the ASCII letter `c` when it
/// appears inside a `(c)` copyright marker.
pub fn is_non_translatable(text: &str) -> bool {
    let stripped = text.replace("(c)", "").replace("(C)", "");
    stripped
        .chars()
        .all(|c| c.is_whitespace() || c.is_ascii_digit() || PROTECTED_SYMBOLS.contains(&c))
}

/// One paragraph or cell to translate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationItem {
    pub paragraph_id: String,
    /// Length of the full original text in characters
    #[serde(skip)]
    pub original_chars: usize,
    /// Translatable runs only, each keeping its original index
    pub runs: Vec<RunText>,
}

impl TranslationItem {
    /// Build an item from an ordered run list, or `None` when nothing in it
    /// needs translating
    pub fn from_runs<'a>(
        paragraph_id: &str,
        runs: impl IntoIterator<Item = &'a str>,
    ) -> Option<Self> {
        let mut original_chars = 0;
        let mut translatable = Vec::new();
        for (index, text) in runs.into_iter().enumerate() {
            original_chars += text.chars().count();
            if !is_non_translatable(text) {
                translatable.push(RunText { index, text: text.to_string() });
            }
        }
        if translatable.is_empty() {
            return None;
        }
        Some(Self {
            paragraph_id: paragraph_id.to_string(),
            original_chars,
            runs: translatable,
        })
    }

    /// Characters sent to the provider for this item
    pub fn payload_chars(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }

    /// Fingerprint of the exact ordered run texts
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self.runs.iter().map(|r| (r.index, r.text.as_str())))
    }
}

/// Content hash of an item's ordered runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash run indices and texts, length-prefixed so that different splits
    /// of the same text never collide
    pub fn of<'a>(runs: impl IntoIterator<Item = (usize, &'a str)>) -> Self {
        let mut hasher = Sha256::new();
        for (index, text) in runs {
            hasher.update((index as u64).to_le_bytes());
            hasher.update((text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..12])
    }
}

/// Flatten the targets of several slides into items, in document order
pub fn collect_items(slides: &[SlideTargets]) -> Vec<TranslationItem> {
    let mut items = Vec::new();
    for slide in slides {
        for shape in &slide.shapes {
            for paragraph in &shape.paragraphs {
                let texts = paragraph.runs.iter().map(|r| r.text.as_str());
                items.extend(TranslationItem::from_runs(&paragraph.id, texts));
            }
        }
        for cell in &slide.cells {
            let texts = cell.runs.iter().map(|r| r.text.as_str());
            items.extend(TranslationItem::from_runs(&cell.id, texts));
        }
    }
    items
}
