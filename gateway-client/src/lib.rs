//! Resilient client for tools hosted behind an MCP JSON-RPC gateway.
//!
//! This crate provides:
//! - Error types classified for retry and circuit decisions
//! - A pooled HTTP transport with per-call timeouts
//! - Retry policy with exponential backoff and jitter
//! - Circuit breaker that fails fast while the gateway is down
//! - Caller identity propagation through a trusted header
//! - Prometheus-style counters and gauges
//! - The [`GatewayClient`] façade combining all of the above
//!
//! A failing or slow gateway surfaces as a structured result, never as a
//! panic or an unbounded wait.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod clock;
pub mod http;
pub mod retry;
pub mod circuit_breaker;
pub mod identity;
pub mod jsonrpc;
pub mod types;
pub mod metrics;
pub mod config;
pub mod client;
pub mod tracing_config;

pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use http::{HttpConfig, Transport, TransportResponse, build_http_client};
pub use retry::{RetryConfig, RetryPolicy};
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState,
};
pub use identity::{DEFAULT_IDENTITY_HEADER, IdentityPropagator};
pub use types::{
    Capability, HealthStatus, InvocationRequest, InvocationResult, InvocationStatus,
    ParameterDescriptor,
};
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use config::GatewayConfig;
pub use client::GatewayClient;
pub use tracing_config::{TracingConfig, init_tracing, try_init_tracing};
