use std::sync::Arc;
use std::time::Duration;

use refineloop_core::{
    LoopConfig, LoopError, LoopRunner, RetryPolicy, TerminationReason, ValidationError,
    NO_OUTPUT_TEXT,
};
use refineloop_logging::Logger;
use refineloop_model::{MockClient, ModelError, ResponseFormat};

/// Helper: a critic reply scoring every given criterion with `score`.
fn critique(criteria: &[&str], score: f64, feedback: &str, temperature: f64) -> String {
    let scores: serde_json::Map<String, serde_json::Value> = criteria
        .iter()
        .map(|name| (name.to_string(), serde_json::json!(score)))
        .collect();
    serde_json::json!({
        "scores": scores,
        "feedback": feedback,
        "suggested_temperature": temperature,
    })
    .to_string()
}

fn config(max_iterations: usize) -> LoopConfig {
    LoopConfig::new(
        "Write a short, empathetic reply to someone overwhelmed by deadlines.",
        vec!["empathy".to_string(), "clarity".to_string()],
    )
    .with_threshold(0.8)
    .with_max_iterations(max_iterations)
    .with_initial_temperature(0.7)
}

fn runner<'a>(generator: &'a MockClient, critic: &'a MockClient) -> LoopRunner<'a> {
    LoopRunner::new(generator, critic, Arc::new(Logger::silent()))
}

const CRITERIA: &[&str] = &["empathy", "clarity"];

// ============================================================
// Termination
// ============================================================

#[tokio::test]
async fn test_stops_at_first_round_meeting_threshold() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two")
        .with_text("draft three");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.5, "Acknowledge the stress first", 0.4))
        .with_text(critique(CRITERIA, 0.9, "Great", 0.3));

    let result = runner(&generator, &critic).run(&config(5)).await.unwrap();

    assert_eq!(result.termination_reason, TerminationReason::ThresholdMet);
    assert_eq!(result.history.len(), 2);
    assert_eq!(result.final_text, "draft two");
    assert!(result.error.is_none());

    let first = result.history.get(1).unwrap();
    assert!(!first.meets_threshold);
    assert!((first.average_score - 0.5).abs() < 1e-9);
    let last = result.history.last().unwrap();
    assert!(last.meets_threshold);
    assert_eq!(last.index, 2);

    assert_eq!(generator.call_count(), 2);
    assert_eq!(critic.call_count(), 2);
    assert_eq!(result.exit_code(), 0);
}

#[tokio::test]
async fn test_exhausts_iteration_budget() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two")
        .with_text("draft three");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.1, "Too cold", 0.7))
        .with_text(critique(CRITERIA, 0.2, "Still cold", 0.7))
        .with_text(critique(CRITERIA, 0.3, "Warmer", 0.7));

    let result = runner(&generator, &critic).run(&config(3)).await.unwrap();

    assert_eq!(
        result.termination_reason,
        TerminationReason::MaxIterationsReached
    );
    assert_eq!(result.history.len(), 3);
    assert_eq!(result.final_text, "draft three");
    assert_eq!(result.final_text, result.history.last().unwrap().generated_text);
    assert!(result.history.iter().all(|r| !r.meets_threshold));
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn test_history_never_exceeds_max_iterations() {
    for max in 1..=4 {
        let mut generator = MockClient::new("gen");
        let mut critic = MockClient::new("critic");
        for i in 0..10 {
            generator = generator.with_text(format!("draft {i}"));
            critic = critic.with_text(critique(CRITERIA, 0.0, "no", 0.5));
        }

        let result = runner(&generator, &critic).run(&config(max)).await.unwrap();

        assert_eq!(result.history.len(), max);
        assert_eq!(generator.call_count(), max);
        assert_eq!(critic.call_count(), max);
    }
}

// ============================================================
// Scoring
// ============================================================

#[tokio::test]
async fn test_unscored_criterion_counts_as_zero() {
    let generator = MockClient::new("gen").with_text("draft");
    let critic = MockClient::new("critic").with_text(r#"{"scores": {}}"#);
    let config = LoopConfig::new("Explain recursion", vec!["clarity".to_string()])
        .with_threshold(0.0001)
        .with_max_iterations(1);

    let result = runner(&generator, &critic).run(&config).await.unwrap();

    let record = result.history.last().unwrap();
    assert_eq!(record.average_score, 0.0);
    assert!(!record.meets_threshold);
    assert_eq!(record.feedback, "No feedback provided.");
    assert_eq!(record.suggested_next_temperature, 0.7);
    assert_eq!(
        result.termination_reason,
        TerminationReason::MaxIterationsReached
    );
}

#[tokio::test]
async fn test_average_recomputed_over_configured_criteria() {
    let generator = MockClient::new("gen").with_text("draft");
    // "empathy" is missing; "humor" is not a configured criterion
    let critic = MockClient::new("critic")
        .with_text(r#"{"scores": {"clarity": 1.0, "humor": 1.0}, "average": 1.0}"#);

    let result = runner(&generator, &critic)
        .run(&config(1).with_threshold(0.5))
        .await
        .unwrap();

    let record = result.history.last().unwrap();
    assert!((record.average_score - 0.5).abs() < 1e-9);
    assert!(record.meets_threshold);
    assert_eq!(record.scores.len(), 2);
    assert_eq!(result.termination_reason, TerminationReason::ThresholdMet);
}

// ============================================================
// Prompt and temperature threading
// ============================================================

#[tokio::test]
async fn test_suggested_temperature_propagates_unclamped() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two")
        .with_text("draft three");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.1, "Be bolder", 1.7))
        .with_text(critique(CRITERIA, 0.1, "Too wild", -0.2))
        .with_text(critique(CRITERIA, 0.1, "Meh", 0.4));

    let result = runner(&generator, &critic).run(&config(3)).await.unwrap();

    let temperatures: Vec<f64> = generator
        .requests()
        .iter()
        .map(|request| request.temperature)
        .collect();
    assert_eq!(temperatures, vec![0.7, 1.7, -0.2]);

    let used: Vec<f64> = result.history.iter().map(|r| r.temperature_used).collect();
    assert_eq!(used, vec![0.7, 1.7, -0.2]);
    assert_eq!(result.history.get(1).unwrap().suggested_next_temperature, 1.7);
}

#[tokio::test]
async fn test_refinement_prompt_restates_request_and_feedback() {
    let generator = MockClient::new("gen")
        .with_text("You'll be fine.")
        .with_text("That sounds like a lot to carry.");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.3, "Dismissive; validate feelings", 0.5))
        .with_text(critique(CRITERIA, 0.95, "Warm", 0.5));
    let config = config(3).with_system_prompt("You are a kind assistant.");

    let result = runner(&generator, &critic).run(&config).await.unwrap();
    assert_eq!(result.termination_reason, TerminationReason::ThresholdMet);

    let requests = generator.requests();
    assert_eq!(requests[0].user_prompt, config.user_message);
    assert_eq!(requests[0].system_prompt, "You are a kind assistant.");
    assert_eq!(requests[0].max_tokens, 1024);
    assert!(requests[0].response_format.is_none());

    let refinement = &requests[1].user_prompt;
    assert!(refinement.contains(&config.user_message));
    assert!(refinement.contains("You'll be fine."));
    assert!(refinement.contains("Dismissive; validate feelings"));
    assert_eq!(requests[1].system_prompt, "You are a kind assistant.");

    assert_eq!(result.history.get(2).unwrap().generator_prompt, *refinement);
}

#[tokio::test]
async fn test_critic_receives_criteria_and_draft() {
    let generator = MockClient::new("gen").with_text("A calm, kind reply.");
    let critic = MockClient::new("critic").with_text(critique(CRITERIA, 1.0, "ok", 0.5));

    runner(&generator, &critic).run(&config(1)).await.unwrap();

    let requests = critic.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user_prompt.contains("empathy, clarity"));
    assert!(requests[0].user_prompt.contains("A calm, kind reply."));
    assert_eq!(requests[0].response_format, Some(ResponseFormat::JsonObject));
    assert_eq!(requests[0].temperature, 0.1);
    assert_eq!(requests[0].max_tokens, 512);
}

// ============================================================
// Aborts
// ============================================================

#[tokio::test]
async fn test_parse_failure_mid_run_keeps_prior_history() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.2, "Needs work", 0.6))
        .with_text("I think it's pretty good overall!");

    let result = runner(&generator, &critic).run(&config(5)).await.unwrap();

    assert_eq!(result.termination_reason, TerminationReason::ParseError);
    assert_eq!(result.history.len(), 1);
    assert_eq!(result.final_text, "draft one");
    assert!(result.error.is_some());
    assert_eq!(result.exit_code(), 2);
}

#[tokio::test]
async fn test_trailing_comma_critique_aborts_instead_of_scoring_zero() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two")
        .with_text("draft three");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.2, "Needs work", 0.6))
        .with_text(
            r#"{"scores": {"empathy": 0.9, "clarity": 0.9}, "feedback": "x",}"#.to_string(),
        );

    let result = runner(&generator, &critic).run(&config(3)).await.unwrap();

    assert_eq!(result.termination_reason, TerminationReason::ParseError);
    assert_eq!(result.history.len(), 1);
    assert_eq!(result.final_text, "draft one");
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_first_generator_failure_yields_sentinel() {
    let generator =
        MockClient::new("gen").with_error(ModelError::Authentication("Invalid API Key".into()));
    let critic = MockClient::new("critic");

    let result = runner(&generator, &critic).run(&config(3)).await.unwrap();

    assert_eq!(result.termination_reason, TerminationReason::GeneratorError);
    assert!(result.history.is_empty());
    assert_eq!(result.final_text, NO_OUTPUT_TEXT);
    assert!(result.error.unwrap().contains("Invalid API Key"));
    assert_eq!(critic.call_count(), 0);
}

#[tokio::test]
async fn test_critic_failure_discards_current_round() {
    let generator = MockClient::new("gen")
        .with_text("draft one")
        .with_text("draft two");
    let critic = MockClient::new("critic")
        .with_text(critique(CRITERIA, 0.2, "Needs work", 0.6))
        .with_error(ModelError::Server {
            status: 500,
            message: "internal".into(),
        });

    let result = runner(&generator, &critic).run(&config(5)).await.unwrap();

    assert_eq!(result.termination_reason, TerminationReason::CritiqueError);
    assert_eq!(result.history.len(), 1);
    assert_eq!(result.final_text, "draft one");
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_transient_failures_retried_when_configured() {
    let generator = MockClient::new("gen")
        .with_error(ModelError::RateLimit("slow down".into()))
        .with_text("draft");
    let critic = MockClient::new("critic")
        .with_error(ModelError::Connection("reset".into()))
        .with_text(critique(CRITERIA, 0.9, "Good", 0.5));
    let retry = RetryPolicy::default()
        .with_max_retries(1)
        .with_backoff(Duration::ZERO, Duration::ZERO);

    let result = runner(&generator, &critic)
        .run(&config(2).with_retry(retry))
        .await
        .unwrap();

    assert_eq!(result.termination_reason, TerminationReason::ThresholdMet);
    assert_eq!(generator.call_count(), 2);
    assert_eq!(critic.call_count(), 2);
}

// ============================================================
// Validation
// ============================================================

#[tokio::test]
async fn test_empty_criteria_rejected_before_any_call() {
    let generator = MockClient::new("gen").with_text("draft");
    let critic = MockClient::new("critic").with_text(critique(CRITERIA, 1.0, "ok", 0.5));
    let config = LoopConfig::new("Write something", vec![]);

    let result = runner(&generator, &critic).run(&config).await;

    assert!(matches!(
        result,
        Err(LoopError::Validation(ValidationError::EmptyCriteria))
    ));
    assert_eq!(generator.call_count(), 0);
    assert_eq!(critic.call_count(), 0);
}

#[tokio::test]
async fn test_empty_user_message_rejected() {
    let generator = MockClient::new("gen");
    let critic = MockClient::new("critic");
    let config = LoopConfig::new("", vec!["clarity".to_string()]);

    let result = runner(&generator, &critic).run(&config).await;

    assert!(matches!(
        result,
        Err(LoopError::Validation(ValidationError::EmptyUserMessage))
    ));
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_result_serializes_for_audit() {
    let generator = MockClient::new("gen").with_text("draft");
    let critic = MockClient::new("critic").with_text(critique(CRITERIA, 0.9, "Good", 0.5));

    let result = runner(&generator, &critic).run(&config(1)).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["termination_reason"], "threshold-met");
    assert_eq!(json["final_text"], "draft");
    assert_eq!(json["history"][0]["index"], 1);
    assert!(json.get("error").is_none());
}
