//! Circuit breaker implementation for resilience.
//!
//! The breaker counts consecutive failures of logical gateway operations and
//! fails fast once the gateway is known to be bad. After a recovery timeout a
//! probe is let through; its outcome either closes the circuit or re-opens it.
//!
//! All state lives behind one mutex so that concurrent callers always observe
//! and apply transitions atomically. The single-probe slot is an atomic token
//! outside the mutex so an abandoned [`CallPermit`] can release it on drop.

use crate::clock::{Clock, SystemClock, duration_ms};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const NO_PROBE: u64 = 0;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, a probe is allowed to test recovery
    HalfOpen,
}

impl CircuitState {
    /// Wire/log name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }

    /// Numeric encoding used by the state gauge.
    #[must_use]
    pub const fn as_gauge(self) -> u64 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }

    /// Inverse of [`CircuitState::as_gauge`].
    #[must_use]
    pub const fn from_gauge(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Closed),
            1 => Some(Self::Open),
            2 => Some(Self::HalfOpen),
            _ => None,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time to wait before transitioning from open to half-open
    pub recovery_timeout: Duration,
    /// Admit only one in-flight probe while half-open
    pub single_probe: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            single_probe: false,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with custom failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Create a new config with custom recovery timeout.
    #[must_use]
    pub const fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Create a new config that serializes half-open probes.
    #[must_use]
    pub const fn with_single_probe(mut self) -> Self {
        self.single_probe = true;
        self
    }
}

/// Point-in-time view of the breaker, read under a single lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    /// Current state
    pub state: CircuitState,
    /// Current consecutive failure count
    pub failure_count: u32,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl BreakerState {
    const fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
    }
}

/// Admission granted by [`CircuitBreaker::allow_request`].
///
/// Hold it until the outcome is recorded. In single-probe mode a permit that
/// is dropped without an outcome, for example because the caller's future was
/// cancelled, frees the half-open slot for the next caller.
#[must_use = "dropping the permit early releases the half-open probe slot"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: u64,
}

impl CallPermit<'_> {
    /// Whether this permit holds the single half-open probe slot.
    #[must_use]
    pub const fn is_probe(&self) -> bool {
        self.probe != NO_PROBE
    }
}

impl fmt::Debug for CallPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("circuit", &self.breaker.name)
            .field("probe", &self.is_probe())
            .finish()
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.probe == NO_PROBE {
            return;
        }
        let released = self
            .breaker
            .probe_token
            .compare_exchange(self.probe, NO_PROBE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if released {
            debug!(circuit = %self.breaker.name, "Half-open probe abandoned without an outcome");
        }
    }
}

/// Circuit breaker protecting one gateway.
///
/// Implements the circuit breaker pattern with three states:
/// - Closed: Normal operation, requests are allowed
/// - Open: Failure threshold reached, requests are rejected
/// - Half-Open: Recovery timeout elapsed, probes test the gateway
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
    probe_token: AtomicU64,
    next_probe: AtomicU64,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker using the system clock.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a new circuit breaker reading time from `clock`.
    #[must_use]
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerState::new()),
            probe_token: AtomicU64::new(NO_PROBE),
            next_probe: AtomicU64::new(NO_PROBE),
        }
    }

    /// Create a circuit breaker with default configuration.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Check if a request is allowed, returning its permit when it is.
    ///
    /// While open, the first check after the recovery timeout moves the
    /// circuit to half-open and admits the caller as a probe.
    pub async fn allow_request(&self) -> Option<CallPermit<'_>> {
        let mut s = self.inner.lock().await;
        match s.state {
            CircuitState::Closed => Some(self.permit(NO_PROBE)),
            CircuitState::Open => {
                let now = self.clock.now();
                let elapsed = s
                    .opened_at
                    .map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
                if elapsed < self.config.recovery_timeout {
                    return None;
                }
                s.state = CircuitState::HalfOpen;
                info!(
                    circuit = %self.name,
                    elapsed_ms = duration_ms(elapsed),
                    "Circuit transitioning to half-open"
                );
                Some(self.admit_half_open())
            }
            CircuitState::HalfOpen => {
                if self.config.single_probe
                    && self.probe_token.load(Ordering::Acquire) != NO_PROBE
                {
                    return None;
                }
                Some(self.admit_half_open())
            }
        }
    }

    // Caller holds the state lock.
    fn admit_half_open(&self) -> CallPermit<'_> {
        if !self.config.single_probe {
            return self.permit(NO_PROBE);
        }
        let token = self.next_probe.fetch_add(1, Ordering::Relaxed).wrapping_add(1).max(1);
        self.probe_token.store(token, Ordering::Release);
        self.permit(token)
    }

    const fn permit(&self, probe: u64) -> CallPermit<'_> {
        CallPermit {
            breaker: self,
            probe,
        }
    }

    fn release_probe(&self) {
        self.probe_token.store(NO_PROBE, Ordering::Release);
    }

    /// Record a successful operation.
    ///
    /// Clears the failure streak. A successful half-open probe closes the circuit.
    pub async fn record_success(&self) {
        let mut s = self.inner.lock().await;
        match s.state {
            CircuitState::HalfOpen => {
                s.state = CircuitState::Closed;
                s.consecutive_failures = 0;
                s.opened_at = None;
                self.release_probe();
                info!(circuit = %self.name, "Circuit closed after recovery");
            }
            CircuitState::Closed => {
                s.consecutive_failures = 0;
            }
            CircuitState::Open => {
                // Late result from a call admitted before the circuit opened
            }
        }
    }

    /// Record a failed operation.
    ///
    /// Reaching the threshold while closed opens the circuit. Any failure while
    /// half-open re-opens it immediately.
    pub async fn record_failure(&self) {
        let mut s = self.inner.lock().await;
        s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        match s.state {
            CircuitState::Closed => {
                if s.consecutive_failures >= self.config.failure_threshold {
                    s.open(self.clock.now());
                    warn!(
                        circuit = %self.name,
                        failures = s.consecutive_failures,
                        "Circuit opened due to failures"
                    );
                }
            }
            CircuitState::HalfOpen => {
                s.open(self.clock.now());
                self.release_probe();
                warn!(
                    circuit = %self.name,
                    failures = s.consecutive_failures,
                    "Circuit re-opened from half-open"
                );
            }
            CircuitState::Open => {}
        }
    }

    /// Get the current circuit state.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Get the current consecutive failure count.
    pub async fn failure_count(&self) -> u32 {
        self.inner.lock().await.consecutive_failures
    }

    /// Get state and failure count together.
    pub async fn snapshot(&self) -> CircuitSnapshot {
        let s = self.inner.lock().await;
        CircuitSnapshot {
            state: s.state,
            failure_count: s.consecutive_failures,
        }
    }

    /// Name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Breaker configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        let mut s = self.inner.lock().await;
        let previous = s.state;
        *s = BreakerState::new();
        self.release_probe();
        if previous != CircuitState::Closed {
            info!(circuit = %self.name, from = %previous, "Circuit manually reset");
        }
    }
}
