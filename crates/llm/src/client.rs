//! LLM collaborator abstractions.
//!
//! The engine never calls a model directly: natural-language translation and
//! answer generation happen behind these traits. Implementations own prompt
//! construction, transport, and retry policy; the engine owns the structured
//! schemas they exchange.

use knowpro_core::AppResult;
use tokio_util::sync::CancellationToken;

use crate::schema::{AnswerResponse, SearchQuery};

/// Translates natural language into a structured [`SearchQuery`].
///
/// The returned query must be fully resolved: each search expression is
/// independently executable.
#[async_trait::async_trait]
pub trait QueryTranslator: Send + Sync {
    /// Translate `text` into a structured search query.
    ///
    /// # Arguments
    /// * `text` - The user's natural-language request
    /// * `preamble` - Optional conversation context preceding the request
    /// * `cancel` - Cancellation token observed for the duration of the call
    async fn translate(
        &self,
        text: &str,
        preamble: Option<&str>,
        cancel: &CancellationToken,
    ) -> AppResult<SearchQuery>;
}

/// Generates a grounded answer from a serialized answer context.
#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer to `question` grounded in `context_prompt`.
    ///
    /// `context_prompt` is the prompt-serialized answer context; generators
    /// must answer only from it and return `NoAnswer` when it is
    /// insufficient.
    async fn generate(
        &self,
        question: &str,
        context_prompt: &str,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse>;
}
