//! Common utilities for service clients
//!
//! This module provides shared functionality for all service clients.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::{header, Client};

use crate::error::{ErrorContext, Result, ServiceError};
use crate::util::sanitize_for_logging;

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "promo-sdk".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: None,
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Per-client request counters
#[derive(Debug, Default)]
pub struct ClientMetrics {
    request_count: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    bytes_received: AtomicU64,
    last_latency_us: AtomicU64,
}

impl ClientMetrics {
    /// Record the outcome of one HTTP exchange
    pub fn record(&self, start_time: Instant, is_success: bool, bytes_received: Option<u64>) {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        if is_success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(bytes) = bytes_received {
            self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        }

        let latency = start_time.elapsed().as_micros().min(u64::MAX as u128) as u64;
        self.last_latency_us.store(latency, Ordering::Relaxed);
    }

    /// Total requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get all metrics as a map
    pub fn as_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("request_count".to_string(), self.request_count().to_string());
        map.insert(
            "success_count".to_string(),
            self.success_count.load(Ordering::Relaxed).to_string(),
        );
        map.insert(
            "error_count".to_string(),
            self.error_count.load(Ordering::Relaxed).to_string(),
        );
        map.insert(
            "bytes_received".to_string(),
            self.bytes_received.load(Ordering::Relaxed).to_string(),
        );
        map.insert(
            "last_latency".to_string(),
            format!(
                "{:.2}ms",
                self.last_latency_us.load(Ordering::Relaxed) as f64 / 1000.0
            ),
        );

        map
    }
}

/// Build a standard HTTP client with default settings
pub fn build_http_client(user_agent: Option<UserAgent>, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    let ua = user_agent.unwrap_or_default().to_string();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&ua)
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout.unwrap_or_else(|| Duration::from_secs(60)))
        .gzip(true)
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Create error context for HTTP requests
pub fn create_error_context(service_name: &str, endpoint: &str) -> ErrorContext {
    ErrorContext::for_service(service_name).endpoint(endpoint)
}

/// Turn a non-success response into a classified error
pub async fn parse_error_response(endpoint: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let mut context = create_error_context("ollama", endpoint);

    if let Some(retry_after) = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
    {
        context.add("retry_after", retry_after);
    }

    // Error bodies can echo request headers back
    let body = match response.text().await {
        Ok(body) => sanitize_for_logging(&body),
        Err(e) => format!("Failed to read error response: {}", e),
    };

    crate::error::mapping::map_ollama_error(status, &body, &mut context).with_context(context)
}
