/*!
 * Common test utilities for the slidelingo test suite
 */

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use slidelingo::errors::{ProviderError, TranslationError};
use slidelingo::host::memory::{Deck, DeckCell, DeckParagraph, DeckShape, DeckSlide};
use slidelingo::host::MemoryDeck;
use slidelingo::model::{FontSnapshot, Run, RunText, TranslationResult};
use slidelingo::providers::mock::MockProvider;
use slidelingo::translation::{ChunkTranslator, ScopeOptions, TranslationItem, TranslationService};

/// Route library logs through the test harness
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub fn red() -> FontSnapshot {
    FontSnapshot::colored("#FF0000")
}

/// Paragraph from runs
pub fn para(runs: Vec<Run>) -> DeckParagraph {
    DeckParagraph::new(runs)
}

/// Single plain-text paragraph
pub fn plain_para(text: &str) -> DeckParagraph {
    DeckParagraph::new(vec![Run::plain(text)])
}

/// Table cell with one plain run
pub fn cell(text: &str) -> DeckCell {
    DeckCell::new(vec![Run::plain(text)])
}

/// Deck with one slide per entry
pub fn deck(slides: Vec<Vec<DeckShape>>) -> MemoryDeck {
    MemoryDeck::new(Deck {
        slides: slides.into_iter().map(|shapes| DeckSlide { shapes }).collect(),
    })
}

/// A small but varied deck: formatted title, protected runs, a group and a table
pub fn sample_deck() -> MemoryDeck {
    deck(vec![
        vec![
            DeckShape::text(
                "title",
                "Title",
                vec![para(vec![Run::new("Quarterly ", FontSnapshot::bold()), Run::new("results", red())])],
            ),
            DeckShape::text(
                "body",
                "Body",
                vec![
                    para(vec![Run::plain("Growth of "), Run::new("42%", FontSnapshot::bold()), Run::plain(" this year")]),
                    plain_para(""),
                    plain_para("Thank you"),
                ],
            ),
        ],
        vec![
            DeckShape::group(
                "grp",
                "Callouts",
                vec![DeckShape::text("note", "Note", vec![plain_para("Thank you")])],
            ),
            DeckShape::table(
                "tbl",
                "Figures",
                vec![vec![cell("Region"), cell("2024")], vec![cell("North"), cell("(c)")]],
            ),
        ],
    ])
}

/// Find a shape anywhere on a slide
pub fn find_shape<'a>(shapes: &'a [DeckShape], id: &str) -> Option<&'a DeckShape> {
    for shape in shapes {
        if shape.id() == id {
            return Some(shape);
        }
        if let DeckShape::Group { children, .. } = shape {
            if let Some(found) = find_shape(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Current paragraphs of a text shape
pub fn paragraphs_of(deck: &MemoryDeck, slide: usize, id: &str) -> Vec<DeckParagraph> {
    let snapshot = deck.snapshot();
    match find_shape(&snapshot.slides[slide].shapes, id) {
        Some(DeckShape::Text { paragraphs, .. }) => paragraphs.clone(),
        other => panic!("no text shape {} on slide {}: {:?}", id, slide, other),
    }
}

/// Current texts of a text shape, one entry per paragraph
pub fn texts_of(deck: &MemoryDeck, slide: usize, id: &str) -> Vec<String> {
    paragraphs_of(deck, slide, id).iter().map(DeckParagraph::text).collect()
}

/// Current cell texts of a table shape, row-major
pub fn cells_of(deck: &MemoryDeck, slide: usize, id: &str) -> Vec<Vec<String>> {
    let snapshot = deck.snapshot();
    match find_shape(&snapshot.slides[slide].shapes, id) {
        Some(DeckShape::Table { rows, .. }) => {
            rows.iter().map(|row| row.iter().map(DeckCell::text).collect()).collect()
        }
        other => panic!("no table {} on slide {}: {:?}", id, slide, other),
    }
}

/// Translation service backed by a working mock, plus a handle on the mock
pub fn mock_service() -> (TranslationService, MockProvider) {
    let mock = MockProvider::working();
    (TranslationService::with_mock(mock.clone()), mock)
}

/// Translator that upper-cases every run and records the chunks it received
#[derive(Default)]
pub struct RecordingTranslator {
    pub chunks: Mutex<Vec<Vec<TranslationItem>>>,
    /// Zero-based chunk numbers that fail
    pub failing_chunks: Vec<usize>,
}

impl RecordingTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(chunks: &[usize]) -> Self {
        Self { failing_chunks: chunks.to_vec(), ..Self::default() }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Every run text sent so far
    pub fn sent_texts(&self) -> Vec<String> {
        self.chunks
            .lock()
            .iter()
            .flatten()
            .flat_map(|item| item.runs.iter().map(|run| run.text.clone()))
            .collect()
    }
}

#[async_trait]
impl ChunkTranslator for RecordingTranslator {
    async fn translate_chunk(
        &self,
        items: &[TranslationItem],
        _options: &ScopeOptions,
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        let number = {
            let mut chunks = self.chunks.lock();
            chunks.push(items.to_vec());
            chunks.len() - 1
        };
        if self.failing_chunks.contains(&number) {
            return Err(ProviderError::ConnectionError(format!("chunk {} refused", number)).into());
        }
        Ok(items
            .iter()
            .map(|item| TranslationResult {
                paragraph_id: item.paragraph_id.clone(),
                translated_runs: item
                    .runs
                    .iter()
                    .map(|run| RunText { index: run.index, text: run.text.to_uppercase() })
                    .collect(),
            })
            .collect())
    }
}
