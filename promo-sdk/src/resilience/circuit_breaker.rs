//! Circuit breaker implementation for preventing cascading failures
//!
//! This module implements the circuit breaker pattern to stop calling the
//! generation backend while it is failing. All counters live behind one
//! mutex so the admit/record read-modify-write sequences stay consistent
//! when a client is shared between concurrent request handlers.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::{Result, ServiceError};

use super::BreakerState;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens
    pub failure_threshold: usize,

    /// How long the circuit stays open after the last failure
    pub open_timeout: Duration,

    /// Number of successful probes needed to close the circuit
    pub success_threshold: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

/// Source of the current instant, replaceable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: usize,
    success_count: usize,
    last_failure: Option<Instant>,
    total_failures: u64,
    total_successes: u64,
    times_opened: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure: None,
            total_failures: 0,
            total_successes: 0,
            times_opened: 0,
        }
    }
}

/// A thread-safe circuit breaker
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    clock: Arc<dyn Clock>,
    config: CircuitBreakerConfig,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the specified configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a circuit breaker that reads time from `clock`
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        log::info!(
            "Circuit breaker initialized: failure_threshold={}, open_timeout={:?}, success_threshold={}",
            config.failure_threshold,
            config.open_timeout,
            config.success_threshold
        );

        Self {
            inner: Mutex::new(BreakerInner::new()),
            clock,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Decide whether a call may proceed
    ///
    /// An open circuit whose timeout has elapsed moves to half-open and
    /// admits the call. Never blocks and never touches the network.
    pub fn can_proceed(&self) -> bool {
        let mut inner = self.lock();

        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = match inner.last_failure {
                    Some(at) => self.clock.now().saturating_duration_since(at),
                    // No failure instant recorded, nothing to wait for
                    None => self.config.open_timeout,
                };

                if elapsed >= self.config.open_timeout {
                    log::info!(
                        "Circuit breaker transitioning to HalfOpen after {:.1}s",
                        elapsed.as_secs_f64()
                    );
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    inner.failure_count = 0;
                    true
                } else {
                    log::warn!(
                        "Circuit breaker is Open, {:.1}s left before a probe is allowed",
                        (self.config.open_timeout - elapsed).as_secs_f64()
                    );
                    false
                }
            }
        }
    }

    /// Like `can_proceed`, but fails with an `Unavailable` error
    pub fn check(&self) -> Result<()> {
        if self.can_proceed() {
            Ok(())
        } else {
            Err(ServiceError::unavailable(format!(
                "Circuit breaker is open, rejecting calls for {} more seconds",
                self.remaining_open_time().as_secs()
            )))
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.total_successes += 1;

        match inner.state {
            BreakerState::Closed => {
                inner.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                inner.failure_count = 0;
                inner.success_count += 1;
                log::info!(
                    "Circuit breaker probe succeeded: {}/{}",
                    inner.success_count,
                    self.config.success_threshold
                );

                if inner.success_count >= self.config.success_threshold {
                    log::info!("Circuit breaker transitioning to Closed state");
                    inner.state = BreakerState::Closed;
                    inner.success_count = 0;
                }
            }
            BreakerState::Open => {
                // Only reachable when a call admitted earlier finishes late
                log::warn!("Received success in Open state, ignoring");
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.total_failures += 1;
        inner.last_failure = Some(now);

        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                log::warn!(
                    "Circuit breaker failure: {}/{}",
                    inner.failure_count,
                    self.config.failure_threshold
                );

                if inner.failure_count >= self.config.failure_threshold {
                    self.trip(&mut inner);
                }
            }
            BreakerState::HalfOpen => {
                log::warn!("Circuit breaker probe failed, reopening");
                // Open always carries a full failure count
                inner.failure_count = self.config.failure_threshold.max(1);
                self.trip(&mut inner);
            }
            BreakerState::Open => {
                log::debug!("Received failure in Open state, refreshing last failure instant");
            }
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = BreakerState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure = None;
    }

    /// Get the current circuit state
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Get the current number of consecutive failures
    pub fn failure_count(&self) -> usize {
        self.lock().failure_count
    }

    /// Get the current number of consecutive successes in half-open state
    pub fn success_count(&self) -> usize {
        self.lock().success_count
    }

    /// Get the breaker configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Time left before an open circuit admits a probe
    pub fn remaining_open_time(&self) -> Duration {
        let inner = self.lock();
        match (inner.state, inner.last_failure) {
            (BreakerState::Open, Some(at)) => self
                .config
                .open_timeout
                .saturating_sub(self.clock.now().saturating_duration_since(at)),
            _ => Duration::ZERO,
        }
    }

    /// Get metrics about the circuit breaker
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let now = self.clock.now();
        let inner = self.lock();

        CircuitBreakerMetrics {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            times_opened: inner.times_opened,
            since_last_failure: inner
                .last_failure
                .map(|at| now.saturating_duration_since(at)),
        }
    }

    fn trip(&self, inner: &mut BreakerInner) {
        log::error!(
            "Circuit breaker OPENED after {} consecutive failures, next probe in {:?}",
            inner.failure_count,
            self.config.open_timeout
        );
        inner.state = BreakerState::Open;
        inner.success_count = 0;
        inner.times_opened += 1;
    }
}

/// Point-in-time snapshot of a circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerMetrics {
    /// Current state
    pub state: BreakerState,

    /// Consecutive failures
    pub failure_count: usize,

    /// Consecutive successes in half-open state
    pub success_count: usize,

    /// Total failures seen
    pub total_failures: u64,

    /// Total successes seen
    pub total_successes: u64,

    /// How many times the circuit has opened
    pub times_opened: u64,

    /// Time since the last recorded failure, if any
    pub since_last_failure: Option<Duration>,
}

/// Manually advanced clock for breaker timing tests
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<Instant>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Instant::now()),
        })
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
