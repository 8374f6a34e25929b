//! # Promo SDK
//!
//! Resilient promotional copy generation and weighted content selection for
//! newsletter sponsorship slots.
//!
//! This crate provides:
//!
//! - A generation client that asks a chat model for copy variations and
//!   validates the answer into structured items
//! - Resilience patterns (circuit breaker, bounded retry, cancellation)
//!   guarding the model call
//! - Weighted offer selection with uniform variant rotation and tracking links
//! - Configuration management and a status-aware error taxonomy
//!
//! ## Architecture
//!
//! - `ChatBackend`: the single network seam; `OllamaClient` implements it over HTTP
//! - `GenerationClient`: validate, gate, retry, parse, report one outcome
//! - `Resilience`: breaker gate plus retry loop around one logical call
//! - `WeightedSelector`: offer and variant draws over an injectable `RandomSource`
//! - `ServiceError`: error taxonomy with an exhaustive retryable/terminal split

// Re-export core modules
pub mod core;
pub use core::{ChatBackend, ChatCall, ServiceClient};

// Re-export service-specific modules
pub mod services;
pub use services::OllamaClient;

// Re-export error handling
pub mod error;
pub use error::{ErrorContext, Result, RetryClass, ServiceError};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{
    cancel_pair, BreakerState, CancelHandle, CancelToken, CircuitBreaker, CircuitBreakerConfig,
    Resilience, RetryConfig, RetryExecutor,
};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, GenerationConfig, ServiceConfig};

pub mod generation;
pub use generation::{
    ContentItem, GenerationClient, GenerationRequest, GenerationResult, LengthCategory, OfferType,
    ResponseValidator, Tone,
};

pub mod selection;
pub use selection::{Offer, PromoSelection, RandomSource, Variant, WeightedSelector};

// Utility module for common functionality
pub mod util;

#[cfg(test)]
mod tests;

/// Build a generation client from process environment variables
pub fn generation_client_from_env() -> Result<GenerationClient> {
    GenerationClient::from_config(&GenerationConfig::from_env()?)
}
