//! Tests for resilience patterns
//!
//! These tests verify that the breaker gate and the retry loop compose so
//! that the breaker sees one outcome per logical call.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use tokio_test::{assert_err, assert_ok};

    use crate::error::{Result, ServiceError};
    use crate::resilience::{
        cancel_pair, BreakerState, CircuitBreaker, CircuitBreakerConfig, ManualClock, Resilience,
        RetryConfig,
    };

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            ..RetryConfig::default()
        }
    }

    fn breaker_config(threshold: usize) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: threshold,
            open_timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_record_one_failure() {
        let resilience = Resilience::new(fast_retry(), breaker_config(5));
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = resilience
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::network("connection reset")) }
            })
            .await;

        assert_err!(result);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(resilience.circuit_breaker().failure_count(), 1);
        assert_eq!(resilience.breaker_state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_terminal_error_records_failure_without_retry() {
        let resilience = Resilience::new(fast_retry(), breaker_config(5));
        let attempts = AtomicUsize::new(0);

        let result: Result<()> = resilience
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::parsing("not json", "<html>")) }
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Parsing { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(resilience.circuit_breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_recovery_after_retry_records_success() {
        let resilience = Resilience::new(fast_retry(), breaker_config(5));
        resilience.circuit_breaker().record_failure();
        let attempts = AtomicUsize::new(0);

        let result = resilience
            .execute(|| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ServiceError::server(503, "overloaded"))
                    } else {
                        Ok("copy")
                    }
                }
            })
            .await;

        assert_eq!(assert_ok!(result), "copy");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(resilience.circuit_breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_open_breaker_short_circuits() {
        let resilience = Resilience::new(fast_retry(), breaker_config(2));
        for _ in 0..2 {
            let _: Result<()> = resilience
                .execute(|| async { Err(ServiceError::rate_limit("429")) })
                .await;
        }
        assert_eq!(resilience.breaker_state(), BreakerState::Open);

        let attempts = AtomicUsize::new(0);
        let result: Result<()> = resilience
            .execute(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(result.unwrap_err().is_unavailable());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_half_open_probe_cycle() {
        let clock = ManualClock::new();
        let breaker = Arc::new(CircuitBreaker::with_clock(breaker_config(1), clock.clone()));
        let resilience = Resilience::with_breaker(fast_retry(), Arc::clone(&breaker));

        let _: Result<()> = resilience
            .execute(|| async { Err(ServiceError::authentication("bad key")) })
            .await;
        assert_eq!(breaker.state(), BreakerState::Open);

        clock.advance(Duration::from_secs(60));

        // First probe fails and reopens the circuit
        let _: Result<()> = resilience
            .execute(|| async { Err(ServiceError::authentication("still bad")) })
            .await;
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(breaker.metrics().times_opened, 2);

        clock.advance(Duration::from_secs(60));
        assert_ok!(resilience.execute(|| async { Ok::<_, ServiceError>(()) }).await);
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert_ok!(resilience.execute(|| async { Ok::<_, ServiceError>(()) }).await);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_cancellation_leaves_breaker_untouched() {
        let resilience = Resilience::new(fast_retry(), breaker_config(1));
        let (handle, token) = cancel_pair();
        handle.cancel();

        let result: Result<()> = resilience
            .execute_with_cancel(|| async { Err(ServiceError::network("never runs")) }, &token)
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(resilience.circuit_breaker().failure_count(), 0);
        assert_eq!(resilience.breaker_state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_breaker() {
        let resilience = Resilience::new(
            RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
            breaker_config(5),
        );

        let calls = (0..50).map(|_| {
            resilience.execute(|| async { Err::<(), _>(ServiceError::server(500, "boom")) })
        });
        let results = join_all(calls).await;

        let unavailable = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_unavailable()))
            .count();
        let failed = results.len() - unavailable;

        assert_eq!(resilience.breaker_state(), BreakerState::Open);
        assert!(failed >= 5);
        assert_eq!(
            resilience.circuit_breaker().metrics().total_failures,
            failed as u64
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_breaker_counts_under_parallel_load() {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1000,
            ..CircuitBreakerConfig::default()
        }));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let breaker = Arc::clone(&breaker);
                tokio::spawn(async move {
                    for _ in 0..125 {
                        if breaker.can_proceed() {
                            breaker.record_failure();
                        }
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(breaker.metrics().total_failures, 1000);
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
