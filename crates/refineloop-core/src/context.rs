use std::time::{Duration, Instant};

use refineloop_critic::GeneratorPrompts;

use crate::outcome::{LoopResult, TerminationReason};
use crate::{History, IterationRecord, LoopConfig};

/// Mutable state threaded between the rounds of one run
#[derive(Debug)]
pub(crate) struct LoopContext {
    /// Prompt for the next generator call
    prompt: String,
    /// Temperature for the next generator call
    temperature: f64,
    history: History,
    started_at: Instant,
}

impl LoopContext {
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            prompt: config.user_message.clone(),
            temperature: config.initial_temperature,
            history: History::default(),
            started_at: Instant::now(),
        }
    }

    /// 1-based number of the round about to run
    pub fn next_iteration(&self) -> usize {
        self.history.len() + 1
    }

    pub fn completed_rounds(&self) -> usize {
        self.history.len()
    }

    pub fn last_average_score(&self) -> Option<f64> {
        self.history.last().map(|record| record.average_score)
    }

    pub fn should_continue(&self, max_iterations: usize) -> bool {
        self.history.len() < max_iterations
    }

    pub fn current_prompt(&self) -> &str {
        &self.prompt
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record the round that met the threshold; no further round follows
    pub fn push_final(&mut self, record: IterationRecord) {
        self.history.push(record);
    }

    /// Record a round that fell short and prepare the next one from its
    /// draft, feedback and suggested temperature
    pub fn advance(&mut self, record: IterationRecord, user_message: &str) {
        self.prompt = GeneratorPrompts::build_refinement_prompt(
            user_message,
            &record.generated_text,
            &record.feedback,
        );
        self.temperature = record.suggested_next_temperature;
        self.history.push(record);
    }

    pub fn finish(self, reason: TerminationReason, error: Option<String>) -> LoopResult {
        let duration = self.total_duration();
        LoopResult::new(reason, error, self.history, duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(index: usize, suggested: f64) -> IterationRecord {
        IterationRecord {
            index,
            generator_prompt: "Write a tagline".to_string(),
            generated_text: "Coffee, but louder".to_string(),
            temperature_used: 0.7,
            scores: BTreeMap::new(),
            average_score: 0.2,
            meets_threshold: false,
            feedback: "Mention the beans".to_string(),
            suggested_next_temperature: suggested,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_first_round_uses_user_message() {
        let config = LoopConfig::new("Write a tagline", vec!["wit".to_string()]);
        let context = LoopContext::new(&config);
        assert_eq!(context.current_prompt(), "Write a tagline");
        assert_eq!(context.temperature(), 0.7);
        assert_eq!(context.next_iteration(), 1);
    }

    #[test]
    fn test_advance_threads_prompt_and_temperature() {
        let config = LoopConfig::new("Write a tagline", vec!["wit".to_string()]);
        let mut context = LoopContext::new(&config);

        context.advance(record(1, 1.3), &config.user_message);

        assert_eq!(context.next_iteration(), 2);
        assert_eq!(context.temperature(), 1.3);
        assert!(context.current_prompt().contains("Original User Request: \"Write a tagline\""));
        assert!(context.current_prompt().contains("Coffee, but louder"));
        assert!(context.current_prompt().contains("Mention the beans"));
        assert!(context.should_continue(2));
        assert!(!context.should_continue(1));
    }
}
