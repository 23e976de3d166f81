/*!
 * Batch translation processing.
 *
 * Turns the paragraphs and cells of a translate scope into deduplicated,
 * size-bounded chunks and runs them through a small pool of workers that
 * share one cursor. A failed chunk only loses its own items; cancellation
 * stops workers from claiming new chunks while in-flight chunks finish.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};

use crate::errors::TranslationError;
use crate::model::{SlideTargets, TranslationResult};
use crate::translation::cache::TranslationCache;
use crate::translation::core::ChunkTranslator;
use crate::translation::glossary::Glossary;
use crate::translation::items::{collect_items, Fingerprint, TranslationItem};

/// Immutable options for one translate scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeOptions {
    /// ISO code or "auto"
    pub source_language: String,
    pub target_language: String,
    pub glossary: Glossary,
    /// Fit-to-length strength in percent, `None` when disabled
    pub fit_to_length: Option<u8>,
    pub keep_line_breaks: bool,
    pub reapply_underline: bool,
    pub max_chunk_chars: usize,
    pub max_chunk_items: usize,
    /// Number of chunks translated in parallel
    pub concurrency: usize,
}

impl ScopeOptions {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            glossary: Glossary::default(),
            fit_to_length: None,
            keep_line_breaks: true,
            reapply_underline: true,
            max_chunk_chars: 12_000,
            max_chunk_items: 60,
            concurrency: 3,
        }
    }
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self::new("auto", "en")
    }
}

/// Cooperative cancellation flag shared between the caller and the workers
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Split items into chunks without ever splitting an item.
///
/// A chunk closes when the next item would push it past `max_chars` or when
/// it already holds `max_items`. An item larger than `max_chars` gets a chunk
/// of its own.
pub fn build_chunks(items: Vec<TranslationItem>, max_chars: usize, max_items: usize) -> Vec<Vec<TranslationItem>> {
    let max_items = max_items.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<TranslationItem> = Vec::new();
    let mut current_chars = 0;

    for item in items {
        let chars = item.payload_chars();
        let over_budget = !current.is_empty() && current_chars + chars > max_chars;
        if over_budget || current.len() >= max_items {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current_chars += chars;
        current.push(item);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// What a translate scope produced
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOutcome {
    /// Translations keyed by paragraph or cell id
    pub results: HashMap<String, TranslationResult>,
    /// Ids of translatable items in document order
    pub order: Vec<String>,
    pub total_chunks: usize,
    pub dispatched_chunks: usize,
    pub failed_chunks: usize,
    /// Distinct fingerprints served from the cache
    pub cache_hits: usize,
    pub cancelled: bool,
}

type ChunkResult = (usize, Result<Vec<TranslationResult>, TranslationError>);

/// Drives chunk translation for one scope
pub struct TranslationOrchestrator<'a, T: ChunkTranslator + ?Sized> {
    translator: &'a T,
    cache: TranslationCache,
}

impl<'a, T: ChunkTranslator + ?Sized> TranslationOrchestrator<'a, T> {
    pub fn new(translator: &'a T, cache: TranslationCache) -> Self {
        Self { translator, cache }
    }

    /// Translate every paragraph and cell of the given slides
    pub async fn translate(
        &self,
        slides: &[SlideTargets],
        options: &ScopeOptions,
        cancel: &CancellationToken,
    ) -> OrchestratorOutcome {
        self.translate_items(collect_items(slides), options, cancel).await
    }

    /// Translate already collected items
    pub async fn translate_items(
        &self,
        items: Vec<TranslationItem>,
        options: &ScopeOptions,
        cancel: &CancellationToken,
    ) -> OrchestratorOutcome {
        let mut outcome = OrchestratorOutcome {
            order: items.iter().map(|item| item.paragraph_id.clone()).collect(),
            ..OrchestratorOutcome::default()
        };

        // Group ids by fingerprint, keep the first item as representative
        let mut holders: HashMap<Fingerprint, Vec<String>> = HashMap::new();
        let mut representative_of: HashMap<String, Fingerprint> = HashMap::new();
        let mut pending = Vec::new();
        for item in items {
            let fingerprint = item.fingerprint();
            let ids = holders.entry(fingerprint.clone()).or_default();
            ids.push(item.paragraph_id.clone());
            if ids.len() == 1 {
                representative_of.insert(item.paragraph_id.clone(), fingerprint);
                pending.push(item);
            }
        }

        let mut uncached = Vec::new();
        for item in pending {
            let fingerprint = &representative_of[&item.paragraph_id];
            match self.cache.get(fingerprint) {
                Some(runs) => {
                    outcome.cache_hits += 1;
                    fan_out(&mut outcome.results, &holders[fingerprint], &runs);
                }
                None => uncached.push(item),
            }
        }

        let chunks = build_chunks(uncached, options.max_chunk_chars, options.max_chunk_items);
        outcome.total_chunks = chunks.len();
        if chunks.is_empty() {
            return outcome;
        }
        info!(
            "Translating {} chunk(s) with {} worker(s)",
            chunks.len(),
            options.concurrency.max(1).min(chunks.len())
        );

        let cursor = AtomicUsize::new(0);
        let workers = (0..options.concurrency.max(1).min(chunks.len()))
            .map(|_| self.worker(&chunks, &cursor, options, cancel));
        let finished: Vec<ChunkResult> = join_all(workers).await.into_iter().flatten().collect();

        outcome.dispatched_chunks = finished.len();
        outcome.cancelled = finished.len() < chunks.len() && cancel.is_cancelled();

        for (index, result) in finished {
            match result {
                Ok(results) => {
                    for result in results {
                        let Some(fingerprint) = representative_of.get(&result.paragraph_id) else {
                            continue;
                        };
                        self.cache.store(fingerprint.clone(), result.translated_runs.clone());
                        fan_out(&mut outcome.results, &holders[fingerprint], &result.translated_runs);
                    }
                }
                Err(e) => {
                    outcome.failed_chunks += 1;
                    warn!(
                        "Chunk {}/{} failed, its {} item(s) keep the original text: {}",
                        index + 1,
                        chunks.len(),
                        chunks[index].len(),
                        e
                    );
                }
            }
        }

        outcome
    }

    async fn worker(
        &self,
        chunks: &[Vec<TranslationItem>],
        cursor: &AtomicUsize,
        options: &ScopeOptions,
        cancel: &CancellationToken,
    ) -> Vec<ChunkResult> {
        let mut done = Vec::new();
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(chunk) = chunks.get(index) else {
                break;
            };
            debug!("Chunk {}/{}: {} item(s)", index + 1, chunks.len(), chunk.len());
            let result = self.translator.translate_chunk(chunk, options).await;
            done.push((index, result));
        }
        done
    }
}

fn fan_out(results: &mut HashMap<String, TranslationResult>, ids: &[String], runs: &[crate::model::RunText]) {
    for id in ids {
        results.insert(
            id.clone(),
            TranslationResult {
                paragraph_id: id.clone(),
                translated_runs: runs.to_vec(),
            },
        );
    }
}
