//! Tests for answer orchestration against the generator double.

use knowpro_core::AnswerConfig;
use knowpro_llm::AnswerType;
use tokio_util::sync::CancellationToken;

use crate::answer::{AnswerOrchestrator, NO_SEARCH_RESULTS};
use crate::context::{AnswerContext, RelevantTopic};
use crate::tests::support::MockGenerator;

fn topic(text: &str) -> RelevantTopic {
    RelevantTopic {
        topic: text.to_string(),
        origin: None,
        audience: None,
        time_range: None,
    }
}

fn topics_context(texts: &[&str]) -> AnswerContext {
    AnswerContext {
        entities: None,
        topics: Some(texts.iter().map(|t| topic(t)).collect()),
        messages: None,
    }
}

#[tokio::test]
async fn test_empty_context_short_circuits() {
    let generator = MockGenerator::always("unused");
    let settings = AnswerConfig::default();
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let response = orchestrator
        .generate_answer("anything?", &AnswerContext::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.response_type, AnswerType::NoAnswer);
    assert_eq!(response.why_no_answer.as_deref(), Some(NO_SEARCH_RESULTS));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_small_context_is_one_generator_call() {
    let generator = MockGenerator::always("They talked about music.");
    let settings = AnswerConfig::default();
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let response = orchestrator
        .generate_answer(
            "what did they discuss?",
            &topics_context(&["music"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(response.has_answer());
    assert_eq!(generator.call_count(), 1);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("music"));
}

#[tokio::test]
async fn test_answer_instructions_prefix_the_prompt() {
    let generator = MockGenerator::always("ok");
    let settings = AnswerConfig {
        answer_instructions: Some("Answer in one sentence.".to_string()),
        ..Default::default()
    };
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    orchestrator
        .generate_answer("q?", &topics_context(&["music"]), &CancellationToken::new())
        .await
        .unwrap();
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].starts_with("Answer in one sentence."));
}

#[tokio::test]
async fn test_over_budget_context_is_chunked_and_combined() {
    // Two chunks answer, so a third call combines them.
    let generator = MockGenerator::always("partial answer");
    let settings = AnswerConfig {
        max_chars_in_budget: 80,
        fast_stop: false,
        ..Default::default()
    };
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let context = topics_context(&[
        "first topic with plenty of extra descriptive text attached to it",
        "second topic with plenty of extra descriptive text attached too",
    ]);
    let response = orchestrator
        .generate_answer("q?", &context, &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.has_answer());
    assert_eq!(generator.call_count(), 3);
}

#[tokio::test]
async fn test_fast_stop_returns_first_answer_without_combining() {
    // Only the chunk holding "magnet" answers; fast-stop returns it directly.
    let generator = MockGenerator::answering_on("magnet", "found it");
    let settings = AnswerConfig {
        max_chars_in_budget: 80,
        concurrency: 1,
        fast_stop: true,
        ..Default::default()
    };
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let context = topics_context(&[
        "magnet hidden in a long stretch of surrounding topic text here",
        "unrelated topic with plenty of extra descriptive text attached",
    ]);
    let response = orchestrator
        .generate_answer("q?", &context, &CancellationToken::new())
        .await
        .unwrap();
    assert!(response.has_answer());
    assert_eq!(response.answer.as_deref(), Some("found it"));
    // The winning chunk ends the run; no combine call happens.
    assert!(generator.call_count() <= 2);
}

#[tokio::test]
async fn test_combine_with_no_answers_reports_first_reason() {
    let generator = MockGenerator::always("unused");
    let settings = AnswerConfig::default();
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let responses = vec![
        knowpro_llm::AnswerResponse::no_answer("nothing in part one"),
        knowpro_llm::AnswerResponse::no_answer("nothing in part two"),
    ];
    let combined = orchestrator
        .combine_partial_answers("q?", &responses, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(combined.response_type, AnswerType::NoAnswer);
    assert_eq!(combined.why_no_answer.as_deref(), Some("nothing in part one"));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_combine_with_single_answer_skips_generator() {
    let generator = MockGenerator::always("unused");
    let settings = AnswerConfig::default();
    let orchestrator = AnswerOrchestrator::new(&generator, &settings).unwrap();
    let responses = vec![
        knowpro_llm::AnswerResponse::no_answer("nothing here"),
        knowpro_llm::AnswerResponse::answered("the one answer"),
    ];
    let combined = orchestrator
        .combine_partial_answers("q?", &responses, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(combined.answer.as_deref(), Some("the one answer"));
    assert_eq!(generator.call_count(), 0);
}

#[test]
fn test_zero_concurrency_fails_at_construction() {
    let generator = MockGenerator::always("unused");
    let settings = AnswerConfig {
        concurrency: 0,
        ..Default::default()
    };
    assert!(AnswerOrchestrator::new(&generator, &settings).is_err());
}
