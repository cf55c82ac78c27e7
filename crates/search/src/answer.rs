//! Drives answer generation over a built [`AnswerContext`].
//!
//! Small contexts go to the generator in one call. Contexts over the
//! character budget are split into chunks and processed under bounded
//! concurrency; with fast-stop enabled, the first chunk that produces an
//! answer wins and every other chunk call is cancelled.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use knowpro_core::{AnswerConfig, AppError, AppResult};
use knowpro_llm::{AnswerGenerator, AnswerResponse};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::AnswerContext;

/// Reason reported when generation is skipped because nothing matched.
pub const NO_SEARCH_RESULTS: &str = "No search results";

const NO_PARTIAL_ANSWER: &str = "No answer found in any part of the context";

/// Orchestrates single-shot and chunked answer generation.
pub struct AnswerOrchestrator<'a> {
    generator: &'a dyn AnswerGenerator,
    settings: &'a AnswerConfig,
}

impl<'a> AnswerOrchestrator<'a> {
    pub fn new(generator: &'a dyn AnswerGenerator, settings: &'a AnswerConfig) -> AppResult<Self> {
        if settings.concurrency == 0 {
            return Err(AppError::Config(
                "answer concurrency must be greater than zero".to_string(),
            ));
        }
        if settings.max_chars_in_budget == 0 {
            return Err(AppError::Config(
                "answer character budget must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            generator,
            settings,
        })
    }

    /// Generate an answer for `question` grounded in `context`.
    ///
    /// An empty context short-circuits to a structured no-answer without any
    /// generator call.
    pub async fn generate_answer(
        &self,
        question: &str,
        context: &AnswerContext,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        if context.is_empty() {
            return Ok(AnswerResponse::no_answer(NO_SEARCH_RESULTS));
        }
        let prompt = self.context_prompt(context);
        if prompt.len() <= self.settings.max_chars_in_budget {
            return self.generator.generate(question, &prompt, cancel).await;
        }

        let chunks = split_context(context, self.settings.max_chars_in_budget);
        info!(
            chunks = chunks.len(),
            budget = self.settings.max_chars_in_budget,
            "context over budget, generating chunked answers"
        );
        self.generate_chunked(question, chunks, cancel).await
    }

    /// Run chunk generation under bounded concurrency.
    async fn generate_chunked(
        &self,
        question: &str,
        chunks: Vec<AnswerContext>,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let child = cancel.child_token();

        let mut in_flight: FuturesUnordered<_> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let semaphore = Arc::clone(&semaphore);
                let child = child.clone();
                let prompt = self.context_prompt(chunk);
                async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => return (index, Err(AppError::Cancelled)),
                    };
                    tokio::select! {
                        _ = child.cancelled() => (index, Err(AppError::Cancelled)),
                        result = self.generator.generate(question, &prompt, &child) => {
                            (index, result)
                        }
                    }
                }
            })
            .collect();

        let mut responses: Vec<(usize, AnswerResponse)> = Vec::new();
        while let Some((index, result)) = in_flight.next().await {
            match result {
                Ok(response) => {
                    if self.settings.fast_stop && response.has_answer() {
                        debug!(chunk = index, "fast-stop: chunk answered, cancelling the rest");
                        child.cancel();
                        return Ok(response);
                    }
                    responses.push((index, response));
                }
                Err(error) => {
                    child.cancel();
                    return Err(error);
                }
            }
        }

        // Chunks complete out of order; restore document order before
        // combining so the merged answer reads front to back.
        responses.sort_by_key(|(index, _)| *index);
        let responses: Vec<AnswerResponse> =
            responses.into_iter().map(|(_, response)| response).collect();
        self.combine_partial_answers(question, &responses, cancel)
            .await
    }

    /// Merge chunk-level partial answers into one response.
    pub async fn combine_partial_answers(
        &self,
        question: &str,
        responses: &[AnswerResponse],
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResponse> {
        let answered: Vec<&AnswerResponse> =
            responses.iter().filter(|r| r.has_answer()).collect();
        match answered.len() {
            0 => {
                let reason = responses
                    .iter()
                    .find_map(|r| r.why_no_answer.clone())
                    .unwrap_or_else(|| NO_PARTIAL_ANSWER.to_string());
                Ok(AnswerResponse::no_answer(reason))
            }
            1 => Ok(answered[0].clone()),
            _ => {
                let partials: Vec<&str> = answered
                    .iter()
                    .filter_map(|r| r.answer.as_deref())
                    .collect();
                let prompt = format!(
                    "The following are partial answers drawn from different parts of the \
                     conversation. Combine them into one complete answer.\n\n{}",
                    partials.join("\n\n")
                );
                self.generator.generate(question, &prompt, cancel).await
            }
        }
    }

    fn context_prompt(&self, context: &AnswerContext) -> String {
        match &self.settings.answer_instructions {
            Some(instructions) => {
                format!("{}\n{}", instructions, context.to_prompt_string())
            }
            None => context.to_prompt_string(),
        }
    }
}

/// Split an over-budget context into chunks that each fit `max_chars`.
///
/// Greedy packing in section order (entities, topics, messages); an item
/// larger than the budget still gets a chunk of its own.
pub fn split_context(context: &AnswerContext, max_chars: usize) -> Vec<AnswerContext> {
    let mut chunks: Vec<AnswerContext> = Vec::new();
    let mut current = AnswerContext::default();
    let mut current_chars = 0usize;

    let push_item = |chunks: &mut Vec<AnswerContext>,
                     current: &mut AnswerContext,
                     current_chars: &mut usize,
                     chars: usize,
                     add: &dyn Fn(&mut AnswerContext)| {
        if *current_chars + chars > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(current));
            *current_chars = 0;
        }
        add(current);
        *current_chars += chars;
    };

    if let Some(entities) = &context.entities {
        for entity in entities {
            let chars = serde_json::to_string(entity).map(|s| s.len()).unwrap_or(0);
            let entity = entity.clone();
            push_item(&mut chunks, &mut current, &mut current_chars, chars, &move |chunk| {
                chunk.entities.get_or_insert_with(Vec::new).push(entity.clone());
            });
        }
    }
    if let Some(topics) = &context.topics {
        for topic in topics {
            let chars = serde_json::to_string(topic).map(|s| s.len()).unwrap_or(0);
            let topic = topic.clone();
            push_item(&mut chunks, &mut current, &mut current_chars, chars, &move |chunk| {
                chunk.topics.get_or_insert_with(Vec::new).push(topic.clone());
            });
        }
    }
    if let Some(messages) = &context.messages {
        for message in messages {
            let chars = serde_json::to_string(message).map(|s| s.len()).unwrap_or(0);
            let message = message.clone();
            push_item(&mut chunks, &mut current, &mut current_chars, chars, &move |chunk| {
                chunk.messages.get_or_insert_with(Vec::new).push(message.clone());
            });
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
