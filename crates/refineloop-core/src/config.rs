use refineloop_critic::{CriticSettings, GeneratorPrompts};

use crate::error::ValidationError;
use crate::retry::RetryPolicy;

/// Sampling settings for generator calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorSettings {
    pub max_tokens: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

/// Inputs to a single run of the loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub generator_system_prompt: String,
    /// The user's request; restated on every refinement round
    pub user_message: String,
    /// Criterion names the critic scores against
    pub criteria: Vec<String>,
    /// Inclusive minimum average score, in [0.0, 1.0]
    pub threshold: f64,
    pub max_iterations: usize,
    /// Temperature for the first round. Not range-checked.
    pub initial_temperature: f64,
    pub generator: GeneratorSettings,
    pub critic: CriticSettings,
    pub retry: RetryPolicy,
}

impl LoopConfig {
    pub const DEFAULT_THRESHOLD: f64 = 0.85;
    pub const DEFAULT_MAX_ITERATIONS: usize = 3;
    pub const DEFAULT_TEMPERATURE: f64 = 0.7;

    pub fn new(user_message: impl Into<String>, criteria: Vec<String>) -> Self {
        Self {
            generator_system_prompt: GeneratorPrompts::DEFAULT_SYSTEM_PROMPT.to_string(),
            user_message: user_message.into(),
            criteria,
            threshold: Self::DEFAULT_THRESHOLD,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            initial_temperature: Self::DEFAULT_TEMPERATURE,
            generator: GeneratorSettings::default(),
            critic: CriticSettings::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.generator_system_prompt = prompt.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_initial_temperature(mut self, temperature: f64) -> Self {
        self.initial_temperature = temperature;
        self
    }

    pub fn with_generator(mut self, settings: GeneratorSettings) -> Self {
        self.generator = settings;
        self
    }

    pub fn with_critic(mut self, settings: CriticSettings) -> Self {
        self.critic = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Check the configuration before the loop starts
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_message.trim().is_empty() {
            return Err(ValidationError::EmptyUserMessage);
        }
        if self.criteria.is_empty() {
            return Err(ValidationError::EmptyCriteria);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ValidationError::ThresholdOutOfRange(self.threshold));
        }
        if self.max_iterations == 0 {
            return Err(ValidationError::ZeroIterations);
        }
        Ok(())
    }
}

/// Split comma-separated criteria, trimming each and dropping empty items
pub fn parse_criteria(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
