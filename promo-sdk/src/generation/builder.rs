//! Generation client builder
//!
//! Collects the backend, resilience settings and model parameters, then
//! validates them once in `build`.

use std::sync::Arc;
use std::time::Duration;

use super::GenerationClient;
use crate::config::{ensure_deadline_covers_retries, GenerationConfig, DEFAULT_PUBLICATION};
use crate::core::ChatBackend;
use crate::error::{Result, ServiceError};
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig, Resilience, RetryConfig};

/// Builder for `GenerationClient`
pub struct GenerationClientBuilder {
    backend: Option<Arc<dyn ChatBackend>>,
    retry_config: RetryConfig,
    circuit_breaker_config: CircuitBreakerConfig,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    temperature: f32,
    max_tokens_per_variation: u32,
    publication: String,
    request_deadline: Option<Duration>,
    attempt_timeout: Option<Duration>,
}

impl Default for GenerationClientBuilder {
    fn default() -> Self {
        let defaults = GenerationConfig::default();
        Self {
            backend: None,
            retry_config: defaults.retry,
            circuit_breaker_config: defaults.breaker,
            circuit_breaker: None,
            temperature: defaults.temperature,
            max_tokens_per_variation: defaults.max_tokens_per_variation,
            publication: DEFAULT_PUBLICATION.to_string(),
            request_deadline: defaults.request_deadline,
            attempt_timeout: None,
        }
    }
}

impl GenerationClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Take model, resilience and deadline settings from `config`
    pub fn config(mut self, config: &GenerationConfig) -> Self {
        self.retry_config = config.retry.clone();
        self.circuit_breaker_config = config.breaker.clone();
        self.temperature = config.temperature;
        self.max_tokens_per_variation = config.max_tokens_per_variation;
        self.publication = config.publication.clone();
        self.request_deadline = config.request_deadline;
        self.attempt_timeout = Some(config.timeout());
        self
    }

    /// Set the chat backend
    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Configure circuit breaker
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker_config = config;
        self
    }

    /// Use an existing breaker instead of building one
    pub fn shared_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Set sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token budget per requested variation
    pub fn max_tokens_per_variation(mut self, tokens: u32) -> Self {
        self.max_tokens_per_variation = tokens;
        self
    }

    /// Set the publication name used in prompts
    pub fn publication(mut self, publication: impl Into<String>) -> Self {
        self.publication = publication.into();
        self
    }

    /// Set or clear the overall deadline per generate call
    pub fn request_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.request_deadline = deadline;
        self
    }

    /// Longest a single backend call may take
    ///
    /// When known, `build` checks that the deadline leaves room for every
    /// retry attempt.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Build a resilience facade with the configured settings
    pub fn build_resilience(&self) -> Resilience {
        match &self.circuit_breaker {
            Some(breaker) => Resilience::with_breaker(self.retry_config.clone(), Arc::clone(breaker)),
            None => Resilience::new(
                self.retry_config.clone(),
                self.circuit_breaker_config.clone(),
            ),
        }
    }

    /// Build the client
    pub fn build(self) -> Result<GenerationClient> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ServiceError::configuration(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.max_tokens_per_variation == 0 {
            return Err(ServiceError::configuration("Max tokens must be at least 1"));
        }

        if self.retry_config.max_attempts == 0 {
            return Err(ServiceError::configuration("Retry attempts must be at least 1"));
        }

        if let (Some(deadline), Some(attempt_timeout)) = (self.request_deadline, self.attempt_timeout) {
            ensure_deadline_covers_retries(deadline, &self.retry_config, attempt_timeout)?;
        }

        let resilience = self.build_resilience();
        let backend = self
            .backend
            .ok_or_else(|| ServiceError::configuration("A chat backend is required"))?;

        Ok(GenerationClient {
            backend,
            resilience,
            temperature: self.temperature,
            max_tokens_per_variation: self.max_tokens_per_variation,
            publication: self.publication,
            request_deadline: self.request_deadline,
        })
    }
}
