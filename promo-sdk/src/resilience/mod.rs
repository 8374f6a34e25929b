//! Resilience patterns for the generation client
//!
//! This module provides implementations of common resilience patterns:
//! - Retry with exponential backoff
//! - Circuit breaker
//! - Cooperative cancellation
//! - Unified resilience facade

mod cancel;
mod circuit_breaker;
mod retry;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, Clock, SystemClock,
};
pub use retry::{RetryConfig, RetryExecutor};

#[cfg(test)]
pub(crate) use circuit_breaker::ManualClock;

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;

/// Gate plus retry loop around one logical call
///
/// The breaker sees exactly one outcome per `execute` call, however many
/// attempts the retry loop made. Cancelled calls record nothing.
#[derive(Debug, Clone)]
pub struct Resilience {
    retry: RetryExecutor,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl Default for Resilience {
    fn default() -> Self {
        Self::new(RetryConfig::default(), CircuitBreakerConfig::default())
    }
}

impl Resilience {
    /// Create a new resilience facade with specified configurations
    pub fn new(retry_config: RetryConfig, circuit_breaker_config: CircuitBreakerConfig) -> Self {
        Self::with_breaker(
            retry_config,
            Arc::new(CircuitBreaker::new(circuit_breaker_config)),
        )
    }

    /// Create a facade around an existing breaker
    pub fn with_breaker(retry_config: RetryConfig, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
            circuit_breaker,
        }
    }

    /// Execute a fallible operation with all configured resilience patterns
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_cancel(operation, &CancelToken::never())
            .await
    }

    /// Execute with resilience, aborting when `cancel` fires
    pub async fn execute_with_cancel<F, Fut, T>(
        &self,
        operation: F,
        cancel: &CancelToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.circuit_breaker.check()?;

        let outcome = self.retry.execute_with_cancel(operation, cancel).await;

        match &outcome {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(err) if err.is_cancelled() => {
                log::info!("Call cancelled, breaker state left untouched: {}", err);
            }
            Err(_) => self.circuit_breaker.record_failure(),
        }

        outcome
    }

    /// Get the current state of the circuit breaker
    pub fn breaker_state(&self) -> BreakerState {
        self.circuit_breaker.state()
    }

    /// The shared circuit breaker
    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// The retry executor
    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    /// Reset the circuit breaker state
    pub fn reset_circuit_breaker(&self) {
        self.circuit_breaker.reset();
    }
}

/// State of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakerState {
    /// Circuit is closed, allowing requests
    Closed,

    /// Circuit is open, rejecting requests
    Open,

    /// Circuit is half-open, admitting probe requests
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}
