//! Promotional copy generation
//!
//! `GenerationClient` validates a request locally, passes the breaker gate,
//! runs one chat call plus response validation under the retry loop, and
//! reports a single outcome back to the breaker.

mod builder;
pub mod prompt;
pub mod request;
pub mod validator;

pub use builder::GenerationClientBuilder;
pub use request::{
    ContentItem, GenerationRequest, GenerationResult, LengthCategory, OfferType, Tone,
    MAX_VARIATIONS,
};
pub use validator::{ResponseValidator, DEFAULT_CTA};

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, info_span, warn, Instrument};

use crate::config::GenerationConfig;
use crate::core::{ChatBackend, ChatCall};
use crate::error::{Result, ServiceError};
use crate::resilience::{BreakerState, CancelToken, CircuitBreakerMetrics, Resilience};
use crate::services::OllamaClient;
use crate::util::generate_request_id;

/// Generates promotional copy through a chat backend
pub struct GenerationClient {
    backend: Arc<dyn ChatBackend>,
    resilience: Resilience,
    temperature: f32,
    max_tokens_per_variation: u32,
    publication: String,
    request_deadline: Option<Duration>,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("resilience", &self.resilience)
            .field("temperature", &self.temperature)
            .field("max_tokens_per_variation", &self.max_tokens_per_variation)
            .field("publication", &self.publication)
            .field("request_deadline", &self.request_deadline)
            .finish()
    }
}

impl GenerationClient {
    /// Create a new builder for the generation client
    pub fn builder() -> GenerationClientBuilder {
        GenerationClientBuilder::new()
    }

    /// Build a client backed by Ollama from `config`
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let backend = OllamaClient::from_config(config)?;
        Self::builder()
            .config(config)
            .backend(Arc::new(backend))
            .build()
    }

    /// Generate copy variations for `request`
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.generate_with_cancel(request, &CancelToken::never())
            .await
    }

    /// Generate copy, giving up when `cancel` fires or the deadline passes
    ///
    /// Cancellation and deadline expiry surface as `Cancelled` and leave
    /// the breaker untouched.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancelToken,
    ) -> Result<GenerationResult> {
        let request_id = generate_request_id();
        let span = info_span!(
            "generate",
            request_id = %request_id,
            category = %request.category,
            tone = %request.tone,
            length = %request.length,
            requested = request.variation_count,
        );

        let work = self.run(request, request_id, cancel);
        let outcome = match self.request_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, work).instrument(span.clone()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ServiceError::cancelled(format!(
                    "Generation deadline of {:?} elapsed",
                    deadline
                ))),
            },
            None => work.instrument(span.clone()).await,
        };

        if let Err(ref err) = outcome {
            span.in_scope(|| warn!(error = %err, "Generation failed"));
        }
        outcome
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        request_id: String,
        cancel: &CancelToken,
    ) -> Result<GenerationResult> {
        request.validate()?;

        let count = request.variation_count;
        let call = ChatCall {
            system_prompt: prompt::system_prompt(request, &self.publication),
            user_prompt: prompt::USER_PROMPT.to_string(),
            temperature: self.temperature,
            max_tokens: self
                .max_tokens_per_variation
                .saturating_mul(count as u32),
        };
        let validator = ResponseValidator::for_category(request.category);

        let backend = &self.backend;
        let call = &call;
        let validator = &validator;
        let items = self
            .resilience
            .execute_with_cancel(
                || async move {
                    let raw = backend.chat(call.clone()).await?;
                    validator.parse(&raw, count)
                },
                cancel,
            )
            .await?;

        info!(generated = items.len(), "Generated text variations");
        Ok(GenerationResult {
            request_id,
            items,
            requested: count,
        })
    }

    /// Current breaker state, for health endpoints
    pub fn breaker_state(&self) -> BreakerState {
        self.resilience.breaker_state()
    }

    /// Snapshot of breaker counters
    pub fn breaker_metrics(&self) -> CircuitBreakerMetrics {
        self.resilience.circuit_breaker().metrics()
    }

    /// Force the breaker back to closed
    pub fn reset_breaker(&self) {
        self.resilience.reset_circuit_breaker();
    }
}
