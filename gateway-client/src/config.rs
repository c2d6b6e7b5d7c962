//! Centralized configuration for the gateway client.
//!
//! Configuration is loaded from environment variables and validated before
//! the client is built. Leaf component configurations are derived from it.

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::clock::duration_ms;
use crate::error::{GatewayError, GatewayResult};
use crate::http::HttpConfig;
use crate::identity::DEFAULT_IDENTITY_HEADER;
use crate::retry::RetryConfig;
use reqwest::header::HeaderName;
use std::env;
use std::time::Duration;

/// Gateway client configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway base URL
    pub base_url: String,
    /// Header carrying the caller identity
    pub identity_header: String,
    /// Per-attempt timeout for listing and invocation
    pub timeout: Duration,
    /// Timeout for health checks
    pub health_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Total attempts per logical operation
    pub max_retries: u32,
    /// Delay before the second attempt
    pub retry_base_delay: Duration,
    /// Cap on any single backoff delay
    pub retry_max_delay: Duration,
    /// Backoff jitter ratio in `[0, 1]`
    pub retry_jitter: f64,
    /// Consecutive failures that open the circuit
    pub circuit_failure_threshold: u32,
    /// Time the circuit stays open before probing
    pub circuit_recovery_timeout: Duration,
    /// Admit only one probe at a time while half-open
    pub circuit_single_probe: bool,
    /// User agent sent on every request
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        let circuit = CircuitBreakerConfig::default();
        let http = HttpConfig::default();
        Self {
            base_url: "http://localhost:8080".to_string(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(5),
            connect_timeout: http.connect_timeout,
            max_retries: retry.max_attempts,
            retry_base_delay: retry.base_delay,
            retry_max_delay: retry.max_delay,
            retry_jitter: retry.jitter,
            circuit_failure_threshold: circuit.failure_threshold,
            circuit_recovery_timeout: circuit.recovery_timeout,
            circuit_single_probe: circuit.single_probe,
            user_agent: http.user_agent,
        }
    }
}

impl GatewayConfig {
    /// Create a configuration for `base_url` with defaults elsewhere.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> GatewayResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            base_url: normalize_base_url(
                lookup("MCP_GATEWAY_URL").unwrap_or(defaults.base_url),
            ),
            identity_header: lookup("MCP_GATEWAY_IDENTITY_HEADER")
                .unwrap_or(defaults.identity_header),
            timeout: Duration::from_secs(parse_var(
                &lookup,
                "MCP_GATEWAY_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            health_timeout: Duration::from_secs(parse_var(
                &lookup,
                "MCP_GATEWAY_HEALTH_TIMEOUT_SECS",
                defaults.health_timeout.as_secs(),
            )?),
            connect_timeout: Duration::from_secs(parse_var(
                &lookup,
                "MCP_GATEWAY_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?),
            max_retries: parse_var(&lookup, "MCP_GATEWAY_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay: Duration::from_millis(parse_var(
                &lookup,
                "MCP_GATEWAY_RETRY_BASE_DELAY_MS",
                duration_ms(defaults.retry_base_delay),
            )?),
            retry_max_delay: Duration::from_millis(parse_var(
                &lookup,
                "MCP_GATEWAY_RETRY_MAX_DELAY_MS",
                duration_ms(defaults.retry_max_delay),
            )?),
            retry_jitter: parse_var(&lookup, "MCP_GATEWAY_RETRY_JITTER", defaults.retry_jitter)?,
            circuit_failure_threshold: parse_var(
                &lookup,
                "MCP_GATEWAY_CIRCUIT_FAILURE_THRESHOLD",
                defaults.circuit_failure_threshold,
            )?,
            circuit_recovery_timeout: Duration::from_secs(parse_var(
                &lookup,
                "MCP_GATEWAY_CIRCUIT_RECOVERY_TIMEOUT_SECS",
                defaults.circuit_recovery_timeout.as_secs(),
            )?),
            circuit_single_probe: parse_var(
                &lookup,
                "MCP_GATEWAY_CIRCUIT_SINGLE_PROBE",
                defaults.circuit_single_probe,
            )?,
            user_agent: defaults.user_agent,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can produce a working client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] describing the first invalid field.
    pub fn validate(&self) -> GatewayResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| GatewayError::config(format!("Invalid gateway URL {:?}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::config(format!(
                "Unsupported gateway URL scheme: {}",
                url.scheme()
            )));
        }
        if HeaderName::from_bytes(self.identity_header.as_bytes()).is_err() {
            return Err(GatewayError::config(format!(
                "Invalid identity header name: {:?}",
                self.identity_header
            )));
        }
        if self.timeout.is_zero() || self.health_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(GatewayError::config("Timeouts must be greater than zero"));
        }
        if self.max_retries == 0 {
            return Err(GatewayError::config("MCP_GATEWAY_MAX_RETRIES must be at least 1"));
        }
        if self.circuit_failure_threshold == 0 {
            return Err(GatewayError::config(
                "MCP_GATEWAY_CIRCUIT_FAILURE_THRESHOLD must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.retry_jitter) {
            return Err(GatewayError::config("MCP_GATEWAY_RETRY_JITTER must be within 0.0-1.0"));
        }
        Ok(())
    }

    /// Set the identity header name.
    #[must_use]
    pub fn with_identity_header(mut self, header: impl Into<String>) -> Self {
        self.identity_header = header.into();
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the health check timeout.
    #[must_use]
    pub const fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the total attempts per operation.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff base delay.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the cap on a single backoff delay.
    #[must_use]
    pub const fn with_retry_max_delay(mut self, delay: Duration) -> Self {
        self.retry_max_delay = delay;
        self
    }

    /// Set the backoff jitter ratio (clamped to 0-1).
    #[must_use]
    pub fn with_retry_jitter(mut self, ratio: f64) -> Self {
        self.retry_jitter = ratio.clamp(0.0, 1.0);
        self
    }

    /// Set the circuit failure threshold.
    #[must_use]
    pub const fn with_circuit_failure_threshold(mut self, threshold: u32) -> Self {
        self.circuit_failure_threshold = threshold;
        self
    }

    /// Set the circuit recovery timeout.
    #[must_use]
    pub const fn with_circuit_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.circuit_recovery_timeout = timeout;
        self
    }

    /// Admit a single probe at a time while half-open.
    #[must_use]
    pub const fn with_circuit_single_probe(mut self) -> Self {
        self.circuit_single_probe = true;
        self
    }

    /// Derived HTTP client configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default()
            .with_connect_timeout(self.connect_timeout)
            .with_user_agent(self.user_agent.clone())
    }

    /// Derived retry configuration.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(self.max_retries)
            .with_base_delay(self.retry_base_delay)
            .with_max_delay(self.retry_max_delay)
            .with_jitter(self.retry_jitter)
    }

    /// Derived circuit breaker configuration.
    #[must_use]
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        let config = CircuitBreakerConfig::default()
            .with_failure_threshold(self.circuit_failure_threshold)
            .with_recovery_timeout(self.circuit_recovery_timeout);
        if self.circuit_single_probe {
            config.with_single_probe()
        } else {
            config
        }
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> GatewayResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| GatewayError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
