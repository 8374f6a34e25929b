//! Retry with exponential backoff for recoverable errors
//!
//! This module provides a bounded retry loop for transient failures when
//! calling the generation backend. Sleep before attempt k (k > 1) is
//! `base_delay * multiplier^(k-2)`, capped at `max_delay`.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use super::cancel::CancelToken;
use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total invocations allowed, including the first
    pub max_attempts: u32,

    /// Sleep before the second attempt
    pub base_delay: Duration,

    /// Upper bound on a single sleep
    pub max_delay: Duration,

    /// Growth factor between sleeps
    pub multiplier: f64,

    /// Jitter applied to each sleep, 0.0 keeps the schedule exact
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            randomization_factor: 0.0,
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_attempts: {}, base_delay: {:?}, max_delay: {:?}, multiplier: {}, randomization_factor: {} }}",
            self.max_attempts,
            self.base_delay,
            self.max_delay,
            self.multiplier,
            self.randomization_factor
        )
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn backoff(&self) -> ExponentialBackoff {
        self.backoff_with_jitter(self.config.randomization_factor)
    }

    fn backoff_with_jitter(&self, randomization_factor: f64) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.base_delay)
            .with_multiplier(self.config.multiplier)
            .with_max_interval(self.config.max_delay)
            .with_randomization_factor(randomization_factor)
            // Bounded by attempt count, never by wall time
            .with_max_elapsed_time(None)
            .build()
    }

    /// Sleeps taken between attempts if every attempt fails
    pub fn schedule(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.config.max_attempts)
            .filter_map(|_| backoff.next_backoff())
            .collect()
    }

    /// Longest a run of failing attempts can take when each attempt may use
    /// up to `attempt_timeout`
    ///
    /// Jitter is counted at its upper bound.
    pub fn worst_case_elapsed(&self, attempt_timeout: Duration) -> Duration {
        let attempts = attempt_timeout.saturating_mul(self.config.max_attempts);
        let jitter = 1.0 + self.config.randomization_factor.max(0.0);

        let mut backoff = self.backoff_with_jitter(0.0);
        (1..self.config.max_attempts)
            .filter_map(|_| backoff.next_backoff())
            .fold(attempts, |total, delay| {
                total.saturating_add(Duration::from_secs_f64(delay.as_secs_f64() * jitter))
            })
    }

    /// Execute a fallible operation with retries according to the configuration
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_cancel(operation, &CancelToken::never()).await
    }

    /// Execute with retries, aborting as soon as `cancel` fires
    ///
    /// Cancellation during an attempt or a backoff sleep yields a
    /// `Cancelled` error and no further attempts.
    pub async fn execute_with_cancel<F, Fut, T>(
        &self,
        mut operation: F,
        cancel: &CancelToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(ServiceError::cancelled(format!(
                    "Cancelled before attempt {}",
                    attempt
                )));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ServiceError::cancelled(format!(
                        "Cancelled during attempt {}",
                        attempt
                    )));
                }
                result = operation() => result,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        log::info!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_permanent() {
                log::debug!("Not retrying terminal error on attempt {}: {}", attempt, err);
                return Err(err);
            }

            if attempt >= self.config.max_attempts {
                log::error!(
                    "Giving up after {} attempts, last error: {}",
                    attempt,
                    err
                );
                return Err(err.with_context_value("attempts", attempt));
            }

            let delay = backoff.next_backoff().unwrap_or(self.config.max_delay);
            log::warn!(
                "Operation failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                delay,
                attempt,
                self.config.max_attempts,
                err
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ServiceError::cancelled(format!(
                        "Cancelled during backoff after attempt {}",
                        attempt
                    )));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
