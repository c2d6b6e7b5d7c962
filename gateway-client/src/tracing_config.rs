//! Structured logging bootstrap.
//!
//! The client only emits `tracing` events; embedding applications that have
//! no subscriber of their own can install one here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name logged at startup
    pub service_name: String,
    /// Log level filter
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "mcp-gateway-client".to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Read `MCP_GATEWAY_LOG_LEVEL` and `MCP_GATEWAY_LOG_FORMAT` (`json` or `text`).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`TracingConfig::from_env`] over an arbitrary lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: defaults.service_name,
            log_level: lookup("MCP_GATEWAY_LOG_LEVEL")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.log_level),
            json_output: lookup("MCP_GATEWAY_LOG_FORMAT")
                .is_some_and(|format| format.trim().eq_ignore_ascii_case("json")),
        }
    }

    // RUST_LOG wins over the configured level
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Initialize tracing with the given configuration.
///
/// Should be called once at application startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn try_init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    if config.json_output {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(config.filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }
    tracing::info!(service = %config.service_name, "Tracing initialized");
    Ok(())
}

/// Initialize tracing, ignoring an already-installed subscriber.
pub fn init_tracing(config: &TracingConfig) {
    if try_init_tracing(config).is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
