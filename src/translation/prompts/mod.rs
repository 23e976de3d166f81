/*!
 * Prompt engineering for slide translation.
 *
 * This module provides:
 * - The system prompt template with glossary and length sections
 * - JSON request construction for a chunk of items
 * - Response parsing and schema validation
 */

pub mod templates;

// Re-export main types
pub use templates::{
    parse_response, strip_code_fence, PromptTemplate, RequestItem, TranslationPromptBuilder,
    TranslationRequest, TranslationResponse,
};
