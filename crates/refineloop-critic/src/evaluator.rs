use refineloop_model::{CompletionRequest, ModelClient, ModelError, ResponseFormat};
use tracing::{debug, info};

use crate::{CriticPrompts, Critique, CritiqueParseError};

/// Sampling settings for critic calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CriticSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 512,
        }
    }
}

/// Inputs required to critique one draft.
#[derive(Clone, Copy)]
pub struct CriticEvaluationInput<'a> {
    pub criteria: &'a [String],
    pub draft: &'a str,
    /// Temperature the draft was generated with
    pub temperature_used: f64,
    pub iteration: usize,
}

/// Evaluator that runs the critic model
pub struct CriticEvaluator<'a> {
    client: &'a dyn ModelClient,
    settings: CriticSettings,
}

impl<'a> CriticEvaluator<'a> {
    pub fn new(client: &'a dyn ModelClient, settings: CriticSettings) -> Self {
        Self { client, settings }
    }

    /// Build the request sent to the critic for this draft
    pub fn build_request(&self, input: CriticEvaluationInput<'_>) -> CompletionRequest {
        CompletionRequest::new(
            CriticPrompts::SYSTEM_PROMPT,
            CriticPrompts::build_critique_request(input.criteria, input.draft),
            self.settings.temperature,
            self.settings.max_tokens,
        )
        .with_response_format(ResponseFormat::JsonObject)
    }

    /// Critique the draft
    pub async fn evaluate(
        &self,
        input: CriticEvaluationInput<'_>,
    ) -> Result<Critique, EvaluationError> {
        let request = self.build_request(input);

        debug!(
            prompt_len = request.user_prompt.len(),
            iteration = input.iteration,
            "Running critic evaluation"
        );

        let output = self
            .client
            .complete(&request)
            .await
            .map_err(EvaluationError::Model)?;

        info!(
            critic = self.client.name(),
            output_len = output.len(),
            "Critic completed"
        );

        let critique = Critique::parse(&output, input.temperature_used).map_err(|source| {
            EvaluationError::Parse {
                source,
                raw_output: output,
            }
        })?;

        debug!(
            iteration = input.iteration,
            critique = %critique.short_description(),
            "Critique parsed"
        );
        Ok(critique)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Critic call failed: {0}")]
    Model(ModelError),

    #[error("Failed to parse critique: {source}")]
    Parse {
        source: CritiqueParseError,
        /// The critic's unparsable reply, kept for display
        raw_output: String,
    },
}
