/*!
 * # slidelingo - formatting-preserving translation of slide decks
 *
 * A Rust library that translates the text of a presentation with an LLM
 * while keeping per-character formatting, paragraph formatting and table
 * structure intact.
 *
 * ## Features
 *
 * - Run reconstruction for hosts that only expose formatting per range
 * - Deduplicated, size-bounded translation chunks with bounded concurrency
 *   and cooperative cancellation
 * - Translate using various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API and compatible servers (LM Studio)
 *   - Anthropic API
 * - Recomposition of translated text with formatting reapplied by offset
 * - Preview mode that leaves the deck untouched
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `model`: Runs, paragraphs, formatting snapshots and translation targets
 * - `host`: Contract of the presentation-editing host, plus an in-memory deck
 * - `extract`: Shape traversal, run detection and paragraph extraction
 * - `translation`: Work items, cache, prompts and the chunk orchestrator
 * - `recompose`: Merging translations back and computing formatting offsets
 * - `app_controller`: Translate scopes and the file-level controller
 * - `app_config`: Configuration management
 * - `providers`: Client implementations for the LLM providers
 * - `language_utils`: ISO language code utilities
 * - `file_utils`: Deck file discovery and I/O
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod extract;
pub mod file_utils;
pub mod host;
pub mod language_utils;
pub mod model;
pub mod providers;
pub mod recompose;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, ScopeMode, ScopeReport, ScopeStatus, SlideSelection, TranslateScope};
pub use host::{MemoryDeck, PresentationHost};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use translation::{CancellationToken, ScopeOptions, TranslationService};
