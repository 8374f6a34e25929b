//! Core abstractions for the promo SDK
//!
//! This module provides the trait seams between the generation logic and
//! the network:
//!
//! - `ChatBackend`: sends one prompt pair to a chat model and returns its raw text
//! - `ServiceClient`: identity and health of a remote service client

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// One chat completion request as the generation layer sees it
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    /// Instructions for the model
    pub system_prompt: String,

    /// The user turn
    pub user_prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Token budget for the whole answer
    pub max_tokens: u32,
}

/// The single network operation the generation client depends on
///
/// Implementations return the raw message content and map transport or
/// status failures into the error taxonomy. They never retry on their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one chat call and return the raw model text
    async fn chat(&self, call: ChatCall) -> Result<String>;
}

/// Base trait for service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;

    /// Returns the client's metrics if available
    fn metrics(&self) -> Option<HashMap<String, String>>;
}
