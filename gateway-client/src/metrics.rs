//! Prometheus metrics helpers.
//!
//! Counters only ever grow for the life of the process. Gauges mirror the
//! circuit breaker and are refreshed after every breaker interaction.

use crate::circuit_breaker::{CircuitSnapshot, CircuitState};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// A simple counter metric.
#[derive(Debug)]
pub struct Counter {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// A simple gauge metric.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Set the gauge value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// Read-only copy of all gateway metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Capability listings and invocations attempted
    pub requests_total: u64,
    /// Requests that succeeded
    pub requests_success: u64,
    /// Requests that failed or timed out
    pub requests_failed: u64,
    /// Requests rejected by the open circuit
    pub requests_circuit_open: u64,
    /// Health checks performed
    pub health_checks_total: u64,
    /// Health checks that found the gateway healthy
    pub health_checks_success: u64,
    /// Breaker state
    pub circuit_breaker_state: CircuitState,
    /// Breaker consecutive failure count
    pub circuit_breaker_failure_count: u64,
}

/// Gateway client metrics registry.
#[derive(Debug)]
pub struct GatewayMetrics {
    /// Capability listings and invocations attempted
    pub requests_total: Counter,
    /// Requests that succeeded
    pub requests_success: Counter,
    /// Requests that failed or timed out
    pub requests_failed: Counter,
    /// Requests rejected by the open circuit
    pub requests_circuit_open: Counter,
    /// Health checks performed
    pub health_checks_total: Counter,
    /// Health checks that found the gateway healthy
    pub health_checks_success: Counter,
    /// Breaker state (0 closed, 1 open, 2 half-open)
    pub circuit_breaker_state: Gauge,
    /// Breaker consecutive failure count
    pub circuit_breaker_failure_count: Gauge,
}

impl GatewayMetrics {
    /// Create new gateway metrics with the given prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            requests_total: Counter::new(
                format!("{prefix}_requests_total"),
                "Total number of gateway requests",
            ),
            requests_success: Counter::new(
                format!("{prefix}_requests_success_total"),
                "Total number of successful gateway requests",
            ),
            requests_failed: Counter::new(
                format!("{prefix}_requests_failed_total"),
                "Total number of failed or timed out gateway requests",
            ),
            requests_circuit_open: Counter::new(
                format!("{prefix}_requests_circuit_open_total"),
                "Total number of requests rejected by the open circuit",
            ),
            health_checks_total: Counter::new(
                format!("{prefix}_health_checks_total"),
                "Total number of gateway health checks",
            ),
            health_checks_success: Counter::new(
                format!("{prefix}_health_checks_success_total"),
                "Total number of successful gateway health checks",
            ),
            circuit_breaker_state: Gauge::new(
                format!("{prefix}_circuit_breaker_state"),
                "Circuit breaker state (0 closed, 1 open, 2 half-open)",
            ),
            circuit_breaker_failure_count: Gauge::new(
                format!("{prefix}_circuit_breaker_failure_count"),
                "Consecutive failures seen by the circuit breaker",
            ),
        }
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        self.requests_total.inc();
        self.requests_success.inc();
    }

    /// Record a failed or timed out request.
    pub fn record_failure(&self) {
        self.requests_total.inc();
        self.requests_failed.inc();
    }

    /// Record a request rejected by the open circuit.
    pub fn record_circuit_open(&self) {
        self.requests_total.inc();
        self.requests_circuit_open.inc();
    }

    /// Record a health check outcome.
    pub fn record_health_check(&self, healthy: bool) {
        self.health_checks_total.inc();
        if healthy {
            self.health_checks_success.inc();
        }
    }

    /// Mirror the breaker into the gauges.
    pub fn update_circuit(&self, snapshot: CircuitSnapshot) {
        self.circuit_breaker_state.set(snapshot.state.as_gauge());
        self.circuit_breaker_failure_count
            .set(u64::from(snapshot.failure_count));
    }

    /// Read all values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.get(),
            requests_success: self.requests_success.get(),
            requests_failed: self.requests_failed.get(),
            requests_circuit_open: self.requests_circuit_open.get(),
            health_checks_total: self.health_checks_total.get(),
            health_checks_success: self.health_checks_success.get(),
            circuit_breaker_state: CircuitState::from_gauge(self.circuit_breaker_state.get())
                .unwrap_or(CircuitState::Closed),
            circuit_breaker_failure_count: self.circuit_breaker_failure_count.get(),
        }
    }

    /// Format all metrics as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        [
            self.requests_total.to_prometheus(),
            self.requests_success.to_prometheus(),
            self.requests_failed.to_prometheus(),
            self.requests_circuit_open.to_prometheus(),
            self.health_checks_total.to_prometheus(),
            self.health_checks_success.to_prometheus(),
            self.circuit_breaker_state.to_prometheus(),
            self.circuit_breaker_failure_count.to_prometheus(),
        ]
        .concat()
    }
}
