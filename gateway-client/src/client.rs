//! Gateway client façade.
//!
//! Composes the circuit breaker, retry policy, transport and identity
//! propagation behind three operations. Every outcome is applied to the
//! breaker and the metrics before it is returned, and no failure of the
//! gateway ever escapes as a panic.

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::clock::{Clock, SystemClock, duration_ms};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::http::{Transport, TransportResponse};
use crate::identity::IdentityPropagator;
use crate::jsonrpc::{self, JsonRpcRequest};
use crate::metrics::{GatewayMetrics, MetricsSnapshot};
use crate::retry::RetryPolicy;
use crate::types::{
    Capability, HealthStatus, InvocationRequest, InvocationResult, ToolsListing,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Capability listing path.
pub const TOOLS_PATH: &str = "/tools";
/// JSON-RPC invocation path.
pub const INVOKE_PATH: &str = "/mcp";

const METRICS_PREFIX: &str = "mcp_gateway";

/// Resilient client for one gateway.
///
/// Safe to share across tasks behind an [`Arc`]; each instance owns its
/// breaker, metrics and connection pool.
pub struct GatewayClient {
    config: GatewayConfig,
    transport: Transport,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    identity: IdentityPropagator,
    metrics: GatewayMetrics,
    next_id: AtomicU64,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("gateway", &self.config.base_url)
            .field("breaker", &self.breaker)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client whose breaker reads time from `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::new`].
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> GatewayResult<Self> {
        config.validate()?;

        let transport = Transport::from_config(&config.http_config(), config.base_url.clone())?;
        let identity = IdentityPropagator::new(&config.identity_header)?;
        let breaker = CircuitBreaker::with_clock(
            config.base_url.clone(),
            config.circuit_breaker_config(),
            clock,
        );
        let retry = RetryPolicy::new(config.retry_config());

        Ok(Self {
            config,
            transport,
            retry,
            breaker,
            identity,
            metrics: GatewayMetrics::new(METRICS_PREFIX),
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a client configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds invalid values.
    pub fn from_env() -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Probe the gateway once with the short health timeout.
    ///
    /// Not gated by the breaker and never retried.
    #[instrument(skip(self), fields(gateway = %self.config.base_url))]
    pub async fn check_health(&self) -> HealthStatus {
        let headers = self.identity.headers(None).unwrap_or_default();
        let started = Instant::now();
        let outcome = self
            .transport
            .execute(Method::GET, HEALTH_PATH, headers, None, self.config.health_timeout)
            .await;
        let latency_ms = elapsed_ms(started);

        let (healthy, latency_ms, status_code, error) = match outcome {
            Ok(response) => (true, Some(latency_ms), Some(response.status.as_u16()), None),
            Err(err @ GatewayError::Http { status, .. }) => {
                (false, Some(latency_ms), Some(status), Some(err.to_string()))
            }
            Err(err) => (false, None, None, Some(err.to_string())),
        };

        self.metrics.record_health_check(healthy);
        if let Some(error) = &error {
            warn!(%error, "Gateway health check failed");
        }

        HealthStatus {
            healthy,
            gateway_url: self.config.base_url.clone(),
            latency_ms,
            circuit_breaker_state: self.breaker.state().await,
            status_code,
            error,
            checked_at: chrono::Utc::now(),
        }
    }

    /// List the capabilities the gateway exposes to `caller_identity`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`GatewayError`].
    pub async fn list_capabilities(
        &self,
        caller_identity: Option<&str>,
    ) -> GatewayResult<Vec<Capability>> {
        self.list_capabilities_with_deadline(caller_identity, None)
            .await
    }

    /// List capabilities, giving up at `deadline`.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; see [`GatewayError`].
    #[instrument(skip(self, caller_identity), fields(gateway = %self.config.base_url))]
    pub async fn list_capabilities_with_deadline(
        &self,
        caller_identity: Option<&str>,
        deadline: Option<Instant>,
    ) -> GatewayResult<Vec<Capability>> {
        self.call_gated(
            Method::GET,
            TOOLS_PATH,
            caller_identity,
            None,
            self.config.timeout,
            deadline,
            |response| response.json::<ToolsListing>().map(|listing| listing.tools),
        )
        .await
    }

    /// Look up one capability by name.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the underlying listing.
    pub async fn find_capability(
        &self,
        name: &str,
        caller_identity: Option<&str>,
    ) -> GatewayResult<Option<Capability>> {
        let capabilities = self.list_capabilities(caller_identity).await?;
        Ok(capabilities.into_iter().find(|c| c.name == name))
    }

    /// Invoke a capability through the JSON-RPC endpoint.
    ///
    /// Always returns a result; failures are reported in its status.
    #[instrument(
        skip(self, request),
        fields(gateway = %self.config.base_url, capability = %request.capability_name)
    )]
    pub async fn invoke_capability(&self, request: InvocationRequest) -> InvocationResult {
        let started = Instant::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = JsonRpcRequest::tool_call(id, &request.capability_name, &request.arguments);

        let outcome = match serde_json::to_value(&envelope) {
            Ok(body) => {
                self.call_gated(
                    Method::POST,
                    INVOKE_PATH,
                    request.caller_identity.as_deref(),
                    Some(&body),
                    request.timeout.unwrap_or(self.config.timeout),
                    request.deadline,
                    |response| jsonrpc::decode_response(&response.body, id),
                )
                .await
            }
            Err(e) => Err(GatewayError::invalid_request(e.to_string())),
        };

        let execution_time_ms = elapsed_ms(started);
        match outcome {
            Ok(result) => {
                debug!(execution_time_ms, "Capability invoked");
                InvocationResult::success(request.capability_name, result, execution_time_ms)
            }
            Err(err) => InvocationResult::from_error(request.capability_name, &err, execution_time_ms),
        }
    }

    /// Read all metrics. Has no side effects.
    #[must_use]
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Metrics in Prometheus text exposition format.
    #[must_use]
    pub fn metrics_text(&self) -> String {
        self.metrics.to_prometheus()
    }

    /// Current breaker state.
    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.state().await
    }

    /// Force the breaker closed, clearing its failure streak.
    pub async fn reset_circuit(&self) {
        self.breaker.reset().await;
        self.sync_circuit_gauges().await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn call_gated<T, P>(
        &self,
        method: Method,
        path: &str,
        caller_identity: Option<&str>,
        body: Option<&Value>,
        timeout: Duration,
        deadline: Option<Instant>,
        parse: P,
    ) -> GatewayResult<T>
    where
        P: Fn(&TransportResponse) -> GatewayResult<T>,
    {
        let headers = match self.identity.headers(caller_identity) {
            Ok(headers) => headers,
            Err(err) => {
                self.metrics.record_failure();
                return Err(err);
            }
        };

        // Held until the outcome is recorded; dropping it on cancellation
        // frees a single-probe slot.
        let permit = self.breaker.allow_request().await;
        self.sync_circuit_gauges().await;
        let Some(_permit) = permit else {
            self.metrics.record_circuit_open();
            warn!(path, "Gateway circuit open, request rejected");
            return Err(GatewayError::circuit_open(self.breaker.name()));
        };

        let parse = &parse;
        let outcome = self
            .retry
            .execute(deadline, |attempt| {
                let method = method.clone();
                let headers = headers.clone();
                async move {
                    let timeout = attempt_timeout(timeout, deadline)?;
                    debug!(attempt, path, timeout_ms = duration_ms(timeout), "Calling gateway");
                    let response = self
                        .transport
                        .execute(method, path, headers, body, timeout)
                        .await?;
                    parse(&response)
                }
            })
            .await;

        match &outcome {
            Err(err) if err.trips_circuit() => self.breaker.record_failure().await,
            _ => self.breaker.record_success().await,
        }
        self.sync_circuit_gauges().await;

        match &outcome {
            Ok(_) => self.metrics.record_success(),
            Err(err) => {
                self.metrics.record_failure();
                warn!(path, error = %err, kind = ?err.kind(), "Gateway request failed");
            }
        }

        outcome
    }

    async fn sync_circuit_gauges(&self) {
        self.metrics.update_circuit(self.breaker.snapshot().await);
    }
}

/// Timeout for the next attempt: the configured bound, shortened to what is
/// left before the caller's deadline.
fn attempt_timeout(timeout: Duration, deadline: Option<Instant>) -> GatewayResult<Duration> {
    match deadline {
        None => Ok(timeout),
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                Err(GatewayError::Timeout(Duration::ZERO))
            } else {
                Ok(timeout.min(remaining))
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}
