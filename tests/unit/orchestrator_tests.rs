/*!
 * Tests for chunking, deduplication, failure isolation and cancellation
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use slidelingo::errors::TranslationError;
use slidelingo::model::{RunText, TranslationResult};
use slidelingo::providers::mock::MockProvider;
use slidelingo::translation::{
    build_chunks, CancellationToken, ChunkTranslator, ScopeOptions, TranslationCache, TranslationItem,
    TranslationOrchestrator, TranslationService,
};

use crate::common::RecordingTranslator;

fn item(id: &str, runs: &[&str]) -> TranslationItem {
    TranslationItem::from_runs(id, runs.iter().copied()).unwrap()
}

fn options() -> ScopeOptions {
    ScopeOptions::new("en", "fr")
}

#[tokio::test]
async fn test_translate_withProtectedRuns_shouldNeverSendThem() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items = vec![item("a", &["Growth ", "42%", "   ", " this year", "(c)", "©"])];

    let outcome = orchestrator
        .translate_items(items, &options(), &CancellationToken::new())
        .await;

    assert_eq!(translator.sent_texts(), vec!["Growth ", " this year"]);
    let result = &outcome.results["a"];
    assert_eq!(result.run_text(0), Some("GROWTH "));
    assert_eq!(result.run_text(1), None);
    assert_eq!(result.run_text(3), Some(" THIS YEAR"));
}

#[test]
fn test_fromRuns_withOnlyProtectedRuns_shouldBeDropped() {
    assert!(TranslationItem::from_runs("a", ["", "   ", "42%", "(c)"]).is_none());
}

#[tokio::test]
async fn test_translate_withDuplicateContent_shouldSendOnceAndFanOut() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items = vec![item("a", &["Thank you"]), item("b", &["Thank you"]), item("c", &["Thank you"])];

    let outcome = orchestrator
        .translate_items(items, &options(), &CancellationToken::new())
        .await;

    assert_eq!(translator.chunk_count(), 1);
    assert_eq!(translator.sent_texts(), vec!["Thank you"]);
    for id in ["a", "b", "c"] {
        assert_eq!(outcome.results[id].paragraph_id, id);
        assert_eq!(outcome.results[id].run_text(0), Some("THANK YOU"));
    }
}

#[tokio::test]
async fn test_translate_withSameTextSplitDifferently_shouldNotShareCacheEntry() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items = vec![item("a", &["Thank ", "you"]), item("b", &["Thank you"])];

    orchestrator
        .translate_items(items, &options(), &CancellationToken::new())
        .await;

    assert_eq!(translator.sent_texts().len(), 3);
}

#[tokio::test]
async fn test_translate_withSharedCache_shouldServeSecondScopeFromCache() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let cancel = CancellationToken::new();

    orchestrator.translate_items(vec![item("a", &["Agenda"])], &options(), &cancel).await;
    let second = orchestrator.translate_items(vec![item("z", &["Agenda"])], &options(), &cancel).await;

    assert_eq!(translator.chunk_count(), 1);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.total_chunks, 0);
    assert_eq!(second.results["z"].run_text(0), Some("AGENDA"));
}

#[tokio::test]
async fn test_translate_shouldRespectChunkBounds() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items: Vec<_> = (0..7).map(|i| item(&format!("p{}", i), &[&format!("Line number {}", i)])).collect();
    let mut options = options();
    options.max_chunk_items = 3;
    options.max_chunk_chars = 30;

    let outcome = orchestrator
        .translate_items(items, &options, &CancellationToken::new())
        .await;

    assert_eq!(outcome.results.len(), 7);
    for chunk in translator.chunks.lock().iter() {
        assert!(chunk.len() <= 3);
        assert!(chunk.iter().map(TranslationItem::payload_chars).sum::<usize>() <= 30);
    }
    assert_eq!(outcome.total_chunks, translator.chunk_count());
}

#[test]
fn test_buildChunks_withItemOverCharBudget_shouldGiveItItsOwnChunk() {
    let long = "x".repeat(100);
    let items = vec![item("a", &["short"]), item("b", &[long.as_str()]), item("c", &["tiny"])];

    let chunks = build_chunks(items, 50, 60);

    let ids: Vec<Vec<&str>> = chunks
        .iter()
        .map(|chunk| chunk.iter().map(|i| i.paragraph_id.as_str()).collect())
        .collect();
    assert_eq!(ids, vec![vec!["a"], vec!["b"], vec!["c"]]);
}

#[tokio::test]
async fn test_translate_withFailedChunk_shouldKeepOtherResults() {
    let translator = RecordingTranslator::failing_on(&[1]);
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items = vec![item("a", &["One"]), item("b", &["Two"]), item("c", &["Three"])];
    let mut options = options();
    options.max_chunk_items = 1;
    options.concurrency = 1;

    let outcome = orchestrator
        .translate_items(items, &options, &CancellationToken::new())
        .await;

    assert_eq!(outcome.failed_chunks, 1);
    assert_eq!(outcome.dispatched_chunks, 3);
    assert!(!outcome.cancelled);
    assert!(outcome.results.contains_key("a"));
    assert!(!outcome.results.contains_key("b"));
    assert!(outcome.results.contains_key("c"));
}

#[tokio::test]
async fn test_translate_withFailedChunk_shouldNotCacheIt() {
    let translator = RecordingTranslator::failing_on(&[0]);
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let cancel = CancellationToken::new();

    orchestrator.translate_items(vec![item("a", &["Retry me"])], &options(), &cancel).await;
    let second = orchestrator.translate_items(vec![item("a", &["Retry me"])], &options(), &cancel).await;

    assert_eq!(translator.chunk_count(), 2);
    assert_eq!(second.results["a"].run_text(0), Some("RETRY ME"));
}

#[tokio::test]
async fn test_translate_withCancelAfterFirstChunk_shouldStopDispatch() {
    let cancel = CancellationToken::new();
    let hook_token = cancel.clone();
    let mock = MockProvider::working().with_request_hook(move |n| {
        if n == 0 {
            hook_token.cancel();
        }
    });
    let service = TranslationService::with_mock(mock.clone());
    let orchestrator = TranslationOrchestrator::new(&service, TranslationCache::new());
    let items = vec![item("a", &["One"]), item("b", &["Two"]), item("c", &["Three"])];
    let mut options = options();
    options.max_chunk_items = 1;
    options.concurrency = 1;

    let outcome = orchestrator.translate_items(items, &options, &cancel).await;

    assert_eq!(mock.request_count(), 1);
    assert_eq!(outcome.total_chunks, 3);
    assert_eq!(outcome.dispatched_chunks, 1);
    assert!(outcome.cancelled);
    assert_eq!(outcome.results["a"].run_text(0), Some("[fr] One"));
    assert!(!outcome.results.contains_key("b"));
    assert!(!outcome.results.contains_key("c"));
}

#[tokio::test]
async fn test_translate_withCancelBeforeStart_shouldDispatchNothing() {
    let translator = RecordingTranslator::new();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator.translate_items(vec![item("a", &["One"])], &options(), &cancel).await;

    assert_eq!(translator.chunk_count(), 0);
    assert!(outcome.cancelled);
    assert!(outcome.results.is_empty());
}

/// Translator that tracks how many chunks are in flight at once
#[derive(Default)]
struct InFlightTranslator {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl ChunkTranslator for InFlightTranslator {
    async fn translate_chunk(
        &self,
        items: &[TranslationItem],
        _options: &ScopeOptions,
    ) -> Result<Vec<TranslationResult>, TranslationError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(items
            .iter()
            .map(|item| TranslationResult {
                paragraph_id: item.paragraph_id.clone(),
                translated_runs: item.runs.iter().map(|r| RunText { index: r.index, text: r.text.clone() }).collect(),
            })
            .collect())
    }
}

#[tokio::test]
async fn test_translate_withManyChunks_shouldCapInFlightRequests() {
    let translator = InFlightTranslator::default();
    let orchestrator = TranslationOrchestrator::new(&translator, TranslationCache::new());
    let items: Vec<_> = (0..9).map(|i| item(&format!("p{}", i), &[&format!("Slide text {}", i)])).collect();
    let mut options = options();
    options.max_chunk_items = 1;

    let outcome = orchestrator
        .translate_items(items, &options, &CancellationToken::new())
        .await;

    assert_eq!(outcome.results.len(), 9);
    assert_eq!(translator.peak.load(Ordering::SeqCst), 3);
}
