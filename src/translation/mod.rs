/*!
 * Translation of slide text through LLM providers.
 *
 * - `items`: work items, non-translatable filtering and fingerprints
 * - `cache`: per-scope fingerprint cache
 * - `glossary`: forced term translations
 * - `prompts`: prompt construction and response validation
 * - `core`: provider-backed chunk translation
 * - `batch`: chunking, worker pool and cancellation
 */

pub use self::batch::{build_chunks, CancellationToken, OrchestratorOutcome, ScopeOptions, TranslationOrchestrator};
pub use self::cache::TranslationCache;
pub use self::core::{ChunkTranslator, TranslationService, UsageStats};
pub use self::glossary::{Glossary, GlossaryTerm};
pub use self::items::{collect_items, is_non_translatable, Fingerprint, TranslationItem};
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

pub mod batch;
pub mod cache;
pub mod core;
pub mod glossary;
pub mod items;
pub mod prompts;
