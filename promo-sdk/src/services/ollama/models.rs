//! Ollama chat API data models
//!
//! This module contains type definitions for the `/api/chat` and
//! `/api/tags` endpoints.

use serde::{Deserialize, Serialize};

/// A chat message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// The role of the message author
    pub role: String,

    /// The content of the message
    pub content: String,
}

impl ChatMessage {
    /// A system instruction message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Maximum number of tokens to generate
    pub num_predict: u32,
}

/// Chat request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,

    /// Conversation so far
    pub messages: Vec<ChatMessage>,

    /// Always false; the client reads one complete answer
    pub stream: bool,

    /// Output format constraint, "json" forces a JSON answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Sampling options
    pub options: ChatOptions,
}

/// Chat response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that answered
    #[serde(default)]
    pub model: Option<String>,

    /// The answer
    pub message: ChatMessage,

    /// Whether generation finished
    #[serde(default)]
    pub done: bool,

    /// Why generation stopped
    #[serde(default)]
    pub done_reason: Option<String>,

    /// Tokens generated
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// One installed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTag {
    /// Model name
    pub name: String,
}

/// Response of `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsResponse {
    /// Installed models
    #[serde(default)]
    pub models: Vec<ModelTag>,
}
