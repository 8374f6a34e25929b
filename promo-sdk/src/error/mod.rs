//! Error handling for the promo SDK
//!
//! This module provides the error taxonomy shared by every layer:
//! - Categorizes failures by class (validation, unavailable, rate limit, etc.)
//! - Classifies each class as retryable or terminal with an exhaustive match
//! - Adds rich context to errors for better debugging
//! - Provides convenient Result type alias

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod mapping;

/// Result type for promo SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Upper bound on how much raw model output a parse error keeps
pub const RAW_PREFIX_LIMIT: usize = 500;

/// Main error type for the promo SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Request shape rejected locally, no network involved
    #[error("Validation error: {0}")]
    Validation(String),

    /// Circuit breaker is open and the call was not attempted
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Explicit rate-limit signal from the dependency
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// The dependency did not answer in time
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Transient network or connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// 5xx-class answer from the dependency
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Structurally invalid model output
    #[error("Parsing error: {message}")]
    Parsing { message: String, raw_prefix: String },

    /// Empty candidate list handed to the selector
    #[error("Selection error: {0}")]
    Selection(String),

    /// Caller cancelled the work or its deadline elapsed
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Credentials rejected by the dependency
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Any other non-success status from the dependency
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// Unknown errors
    #[error("Unknown error: {0}")]
    Unknown(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

/// Whether retrying the same call can change the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Transient; another attempt may succeed
    Retryable,

    /// Retrying cannot help; propagate as is
    Terminal,
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        ServiceError::Unavailable(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create a server error for a 5xx status
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a parsing error, keeping a bounded prefix of the raw text
    pub fn parsing(message: impl Into<String>, raw: &str) -> Self {
        ServiceError::Parsing {
            message: message.into(),
            raw_prefix: bounded_prefix(raw, RAW_PREFIX_LIMIT).to_string(),
        }
    }

    /// Create a selection error
    pub fn selection(message: impl Into<String>) -> Self {
        ServiceError::Selection(message.into())
    }

    /// Create a cancellation error
    pub fn cancelled(message: impl Into<String>) -> Self {
        ServiceError::Cancelled(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create an upstream error for a non-success, non-5xx status
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        ServiceError::Unknown(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        match self {
            ServiceError::WithContext { inner, mut context } => {
                context.add(key, value);
                ServiceError::WithContext { inner, context }
            }
            other => {
                let mut context = ErrorContext::new();
                context.add(key, value);
                other.with_context(context)
            }
        }
    }

    /// The error underneath any context wrappers
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the context attached to this error, if any
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ServiceError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::Server { status, .. } | ServiceError::Upstream { status, .. } => {
                Some(*status)
            }
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Bounded prefix of the raw model output for parse errors
    pub fn raw_prefix(&self) -> Option<&str> {
        match self.root() {
            ServiceError::Parsing { raw_prefix, .. } => Some(raw_prefix),
            _ => None,
        }
    }

    /// Classify this error for the retry loop
    pub fn retry_class(&self) -> RetryClass {
        match self {
            ServiceError::Timeout(_)
            | ServiceError::Network(_)
            | ServiceError::Server { .. }
            | ServiceError::Upstream { .. }
            | ServiceError::Unknown(_) => RetryClass::Retryable,
            ServiceError::Validation(_)
            | ServiceError::Unavailable(_)
            | ServiceError::RateLimit(_)
            | ServiceError::Parsing { .. }
            | ServiceError::Selection(_)
            | ServiceError::Cancelled(_)
            | ServiceError::Authentication(_)
            | ServiceError::Configuration(_) => RetryClass::Terminal,
            ServiceError::WithContext { inner, .. } => inner.retry_class(),
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }

    /// Whether the caller cancelled or the deadline elapsed
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ServiceError::Cancelled(_))
    }

    /// Whether the breaker refused the call
    pub fn is_unavailable(&self) -> bool {
        matches!(self.root(), ServiceError::Unavailable(_))
    }

    /// Outcomes callers should answer with "try again later"
    pub fn is_try_again_later(&self) -> bool {
        self.is_unavailable() || self.is_retryable()
    }
}

/// Cut `s` to at most `limit` bytes without splitting a character
pub(crate) fn bounded_prefix(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// Request timestamp
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Request ID for tracing
    pub request_id: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            request_id: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add a request ID
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        if let Some(status) = err.status() {
            let mut context = context.status_code(status.as_u16());
            return mapping::map_http_status(status, &err.to_string(), &mut context)
                .with_context(context);
        }

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_request() || err.is_body() {
            ServiceError::network(format!("Request failed in transit: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err), "")
        } else if err.is_builder() {
            ServiceError::configuration(format!("Invalid request: {}", err))
        } else {
            ServiceError::unknown(format!("HTTP client error: {}", err))
        };

        service_error.with_context(context)
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err), "")
            .with_context(ErrorContext::for_service("json"))
    }
}
