//! Retry wrapper for LLM clients.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use parley_core::{ChatMessage, ClientError, LlmClient};

/// Backoff parameters of a [`RetryingLlmClient`].
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction of the delay added or removed at random (0.0 disables jitter).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.2,
        }
    }
}

/// Wraps an [`LlmClient`] and retries retryable failures.
///
/// - exponential backoff `base * 2^attempt`, capped at `max_delay`, with jitter
/// - `retry_after` hints from rate limiting take precedence
/// - fatal and conflict errors are returned immediately
pub struct RetryingLlmClient<C: LlmClient> {
    inner: C,
    config: RetryConfig,
    total_retries: AtomicU64,
}

impl<C: LlmClient> RetryingLlmClient<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            total_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: C) -> Self {
        Self::new(inner, RetryConfig::default())
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn retry_delay(&self, attempt: u32, suggested: Option<Duration>) -> Duration {
        if let Some(delay) = suggested {
            return delay;
        }

        let exp = self.config.base_delay.as_millis() as f64 * 2.0_f64.powi(attempt.min(30) as i32);
        let capped = exp.min(self.config.max_delay.as_millis() as f64);

        let jitter_range = capped * self.config.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::rng().random_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for RetryingLlmClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(messages).await {
                Ok(text) => {
                    if attempt > 0 {
                        info!(client = self.inner.name(), attempt, "LLM call succeeded after retry");
                    }
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.retry_delay(attempt, e.suggested_delay());
                    warn!(
                        client = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error_kind = e.error_kind(),
                        error = %e,
                        "retrying LLM call"
                    );
                    let _ = self.total_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
