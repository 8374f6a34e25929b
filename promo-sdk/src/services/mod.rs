//! Service-specific client implementations
//!
//! This module contains client implementations for specific external services.

pub mod common;
pub mod ollama;

pub use common::{ClientMetrics, UserAgent};
pub use ollama::OllamaClient;
