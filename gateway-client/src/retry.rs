//! Retry policy implementation with exponential backoff.
//!
//! A logical operation is attempted up to `max_attempts` times. The delay
//! before attempt `n` (n >= 2) is `base_delay * 2^(n-2)`, capped at
//! `max_delay` and optionally spread by a symmetric jitter ratio.

use crate::clock::duration_ms;
use crate::error::GatewayError;
use std::time::{Duration, Instant};
use tracing::debug;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Jitter ratio in `[0, 1]`; 0.2 spreads each delay by ±20%
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom attempt count.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create a new retry config with custom base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Create a new retry config with custom max delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Create a new retry config with custom jitter ratio (clamped to 0-1).
    #[must_use]
    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter = ratio.clamp(0.0, 1.0);
        self
    }

    /// Create a new retry config without jitter.
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }
}

/// Retry policy for executing operations with automatic retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Calculate the delay before the given 1-based attempt.
    ///
    /// The first attempt runs immediately.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(30);
        let delay = self
            .config
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.config.max_delay);

        if self.config.jitter > 0.0 {
            let spread = rand::random::<f64>().mul_add(2.0, -1.0) * self.config.jitter;
            let scaled = (delay.as_secs_f64() * (1.0 + spread)).max(0.0);
            Duration::try_from_secs_f64(scaled).unwrap_or(delay)
        } else {
            delay
        }
    }

    /// Check if an error should be retried after the given 1-based attempt.
    #[must_use]
    pub fn should_retry(&self, error: &GatewayError, attempt: u32) -> bool {
        attempt < self.config.max_attempts && error.is_retryable()
    }

    /// Execute an async operation with retries.
    ///
    /// The operation receives the 1-based attempt number. When `deadline` is
    /// set, no backoff sleep is started that would end past it.
    ///
    /// # Errors
    ///
    /// Returns the last error once it is non-retryable, attempts are
    /// exhausted, or the deadline leaves no room for another attempt.
    pub async fn execute<F, Fut, T>(
        &self,
        deadline: Option<Instant>,
        mut operation: F,
    ) -> Result<T, GatewayError>
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.should_retry(&error, attempt) {
                        return Err(error);
                    }
                    let delay = self.delay_for_attempt(attempt + 1);
                    if let Some(deadline) = deadline {
                        if Instant::now() + delay >= deadline {
                            debug!(attempt, "Deadline leaves no room for another attempt");
                            return Err(error);
                        }
                    }
                    debug!(
                        attempt,
                        delay_ms = duration_ms(delay),
                        error = %error,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}
