use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use refineloop_critic::{CriticEvaluationInput, CriticEvaluator, EvaluationError, ScoreCard};
use refineloop_logging::{LogEvent, Logger, ModelRole};
use refineloop_model::{CompletionRequest, ModelClient};

use crate::context::LoopContext;
use crate::error::LoopError;
use crate::outcome::{LoopResult, TerminationReason};
use crate::retry::RetryingClient;
use crate::{IterationRecord, LoopConfig};

/// Why a round could not complete
struct RoundFailure {
    reason: TerminationReason,
    message: String,
}

impl RoundFailure {
    fn new(reason: TerminationReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Orchestrates the generate-critique-refine loop
pub struct LoopRunner<'a> {
    generator: &'a dyn ModelClient,
    critic: &'a dyn ModelClient,
    logger: Arc<Logger>,
}

impl<'a> LoopRunner<'a> {
    pub fn new(
        generator: &'a dyn ModelClient,
        critic: &'a dyn ModelClient,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            generator,
            critic,
            logger,
        }
    }

    /// Run the loop until the threshold is met, the iteration budget is spent,
    /// or a round fails.
    ///
    /// Only an invalid configuration is returned as `Err`, before any model
    /// call. Failed rounds end the run with the matching
    /// [`TerminationReason`] and keep the history completed so far.
    pub async fn run(&self, config: &LoopConfig) -> Result<LoopResult, LoopError> {
        config.validate()?;

        self.logger.log(&LogEvent::LoopStarted {
            prompt: config.user_message.clone(),
            criteria: config.criteria.clone(),
            threshold: config.threshold,
            max_iterations: config.max_iterations,
        });

        let mut context = LoopContext::new(config);

        while context.should_continue(config.max_iterations) {
            match self.run_iteration(&mut context, config).await {
                Ok(true) => {
                    self.logger.log(&LogEvent::LoopCompleted {
                        iterations: context.completed_rounds(),
                        average_score: context.last_average_score().unwrap_or_default(),
                        duration_secs: context.total_duration().as_secs_f64(),
                    });
                    return Ok(context.finish(TerminationReason::ThresholdMet, None));
                }
                Ok(false) => {}
                Err(failure) => {
                    let iteration = context.next_iteration();
                    warn!(
                        iteration,
                        reason = %failure.reason,
                        error = %failure.message,
                        "Aborting loop"
                    );
                    self.logger.log(&LogEvent::ErrorEncountered {
                        iteration,
                        reason: failure.reason.to_string(),
                        error: failure.message.clone(),
                    });
                    return Ok(context.finish(failure.reason, Some(failure.message)));
                }
            }
        }

        self.logger.log(&LogEvent::MaxIterationsReached {
            iterations: config.max_iterations,
        });
        Ok(context.finish(TerminationReason::MaxIterationsReached, None))
    }

    /// Run a single round.
    /// Returns true when the round met the threshold and the loop should stop.
    async fn run_iteration(
        &self,
        context: &mut LoopContext,
        config: &LoopConfig,
    ) -> Result<bool, RoundFailure> {
        let iteration = context.next_iteration();
        let prompt = context.current_prompt().to_string();
        let temperature = context.temperature();

        self.logger.log(&LogEvent::GeneratorStarted {
            iteration,
            temperature,
            prompt_preview: prompt.chars().take(100).collect(),
        });

        debug!(iteration, temperature, "Running generator");
        let generator = RetryingClient::new(
            self.generator,
            config.retry,
            ModelRole::Generator,
            iteration,
            self.logger.clone(),
        );
        let request = CompletionRequest::new(
            config.generator_system_prompt.as_str(),
            prompt.as_str(),
            temperature,
            config.generator.max_tokens,
        );
        let started = Instant::now();
        let generated_text = generator
            .complete(&request)
            .await
            .map_err(|e| RoundFailure::new(TerminationReason::GeneratorError, e.to_string()))?;

        self.logger.log(&LogEvent::GeneratorCompleted {
            iteration,
            output_chars: generated_text.chars().count(),
            duration_secs: started.elapsed().as_secs_f64(),
        });

        self.logger.log(&LogEvent::CriticStarted { iteration });

        let critic = RetryingClient::new(
            self.critic,
            config.retry,
            ModelRole::Critic,
            iteration,
            self.logger.clone(),
        );
        let evaluator = CriticEvaluator::new(&critic, config.critic);
        let started = Instant::now();
        let critique = evaluator
            .evaluate(CriticEvaluationInput {
                criteria: &config.criteria,
                draft: &generated_text,
                temperature_used: temperature,
                iteration,
            })
            .await
            .map_err(|e| match e {
                EvaluationError::Model(e) => {
                    RoundFailure::new(TerminationReason::CritiqueError, e.to_string())
                }
                EvaluationError::Parse { source, raw_output } => {
                    warn!(iteration, raw_output = %raw_output, "Unparsable critique");
                    RoundFailure::new(TerminationReason::ParseError, source.to_string())
                }
            })?;

        let card = ScoreCard::compute(&critique.scores, &config.criteria, config.threshold);
        let missing = card.missing(&critique.scores);
        if !missing.is_empty() {
            debug!(iteration, ?missing, "Critic left criteria unscored; counting them as 0.0");
        }

        self.logger.log(&LogEvent::CriticCompleted {
            iteration,
            scores: card.per_criterion.clone(),
            average_score: card.average,
            meets_threshold: card.meets_threshold,
            duration_secs: started.elapsed().as_secs_f64(),
        });

        let record = IterationRecord {
            index: iteration,
            generator_prompt: prompt,
            generated_text,
            temperature_used: temperature,
            scores: critique.scores,
            average_score: card.average,
            meets_threshold: card.meets_threshold,
            feedback: critique.feedback,
            suggested_next_temperature: critique.suggested_temperature,
            timestamp: Utc::now(),
        };

        if card.meets_threshold {
            info!(iteration, average = card.average, "Threshold met");
            context.push_final(record);
            return Ok(true);
        }

        let next_temperature = record.suggested_next_temperature;
        if !(0.0..=1.0).contains(&next_temperature) {
            // Passed through unclamped; the provider decides what it accepts.
            warn!(
                iteration,
                temperature = next_temperature,
                "Critic suggested a temperature outside [0.0, 1.0]"
            );
        }
        if next_temperature != temperature {
            self.logger.log(&LogEvent::TemperatureAdjusted {
                iteration,
                from: temperature,
                to: next_temperature,
            });
        }

        info!(
            iteration,
            average = card.average,
            threshold = config.threshold,
            "Threshold not met, refining"
        );
        context.advance(record, &config.user_message);
        Ok(false)
    }
}
