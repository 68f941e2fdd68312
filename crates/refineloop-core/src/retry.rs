use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use refineloop_logging::{LogEvent, Logger, ModelRole};
use refineloop_model::{CompletionRequest, ModelClient, ModelError};

/// Bounded exponential backoff for transient model-call failures.
///
/// The default makes no retries, so the first failure of a call is fatal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Wraps a model client so transient failures are retried per a [`RetryPolicy`]
pub struct RetryingClient<'a> {
    inner: &'a dyn ModelClient,
    policy: RetryPolicy,
    role: ModelRole,
    iteration: usize,
    logger: Arc<Logger>,
}

impl<'a> RetryingClient<'a> {
    pub fn new(
        inner: &'a dyn ModelClient,
        policy: RetryPolicy,
        role: ModelRole,
        iteration: usize,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            inner,
            policy,
            role,
            iteration,
            logger,
        }
    }
}

#[async_trait]
impl ModelClient for RetryingClient<'_> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ModelError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        role = %self.role,
                        iteration = self.iteration,
                        attempt,
                        error = %e,
                        "Retrying model call"
                    );
                    self.logger.log(&LogEvent::RetryScheduled {
                        iteration: self.iteration,
                        role: self.role,
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
