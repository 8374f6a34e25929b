//! Ollama API client implementation
//!
//! This module provides the HTTP binding behind `ChatBackend`: one
//! non-streaming `/api/chat` call per invocation with JSON output forced.
//! Retry and circuit breaking live a layer above, in the generation client.

mod models;
pub use models::*;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use crate::config::GenerationConfig;
use crate::core::{ChatBackend, ChatCall, ServiceClient};
use crate::error::{Result, ServiceError};
use crate::services::common::{
    build_http_client, create_error_context, parse_error_response, ClientMetrics, UserAgent,
};

/// Ollama API client
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    model: String,
    metrics: ClientMetrics,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OllamaClient {
    /// Create a client for `base_url` talking to `model`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = build_http_client(
            Some(UserAgent {
                extra: Some("ollama".to_string()),
                ..UserAgent::default()
            }),
            Some(timeout),
        )?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            metrics: ClientMetrics::default(),
        })
    }

    /// Create a client from generation settings
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.timeout(),
        )
    }

    /// The chat model this client asks for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat request and return the full response
    pub async fn chat_request(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let endpoint = "/api/chat";
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(
            "Sending request to Ollama: POST {} (model={}, num_predict={})",
            url, request.model, request.options.num_predict
        );

        let start_time = Instant::now();
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                self.metrics.record(start_time, false, None);
                ServiceError::from(e).with_context_value("endpoint", endpoint)
            })?;

        let status = response.status();
        if !status.is_success() {
            self.metrics.record(start_time, false, None);
            let error = parse_error_response(endpoint, response).await;
            warn!("Ollama chat call failed: {}", error);
            return Err(error);
        }

        let body = response.text().await.map_err(|e| {
            self.metrics.record(start_time, false, None);
            ServiceError::from(e)
        })?;
        self.metrics
            .record(start_time, true, Some(body.len() as u64));

        serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
            ServiceError::parsing(format!("Failed to parse Ollama response: {}", e), &body)
                .with_context(create_error_context("ollama", endpoint))
        })
    }

    /// List installed model names
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let endpoint = "/api/tags";
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Sending request to Ollama: GET {}", url);

        let start_time = Instant::now();
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            self.metrics.record(start_time, false, None);
            return Err(parse_error_response(endpoint, response).await);
        }

        let tags = response.json::<TagsResponse>().await?;
        self.metrics.record(start_time, true, None);
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, call: ChatCall) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(call.system_prompt),
                ChatMessage::user(call.user_prompt),
            ],
            stream: false,
            format: Some("json".to_string()),
            options: ChatOptions {
                temperature: call.temperature,
                num_predict: call.max_tokens,
            },
        };

        let response = self.chat_request(&request).await?;
        let content = response.message.content;

        if content.trim().is_empty() {
            return Err(ServiceError::parsing("Ollama returned an empty message", ""));
        }

        debug!(
            "Ollama answered with {} chars (eval_count={:?})",
            content.len(),
            response.eval_count
        );
        Ok(content)
    }
}

#[async_trait]
impl ServiceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(models) => {
                let available = models.iter().any(|m| m == &self.model);
                if !available {
                    debug!("Model {} not listed by Ollama, endpoint is reachable", self.model);
                }
                Ok(true)
            }
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn metrics(&self) -> Option<HashMap<String, String>> {
        Some(self.metrics.as_map())
    }
}
