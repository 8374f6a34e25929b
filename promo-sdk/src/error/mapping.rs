//! Error mapping for the chat backend API
//!
//! This module converts HTTP error responses into the normalized
//! ServiceError type using the status code, never the message text.

use reqwest::StatusCode;
use serde_json::Value;

use super::{bounded_prefix, ErrorContext, ServiceError};

/// Longest error body excerpt kept in a mapped error message
const BODY_EXCERPT_LIMIT: usize = 200;

/// Map a status code and message to the error taxonomy
pub fn map_http_status(
    status: StatusCode,
    message: &str,
    context: &mut ErrorContext,
) -> ServiceError {
    context.status_code = Some(status.as_u16());
    context.add("category", classify_http_error(status));

    match status.as_u16() {
        408 => ServiceError::timeout(message),
        429 => ServiceError::rate_limit(message),
        401 | 403 => ServiceError::authentication(message),
        500..=599 => ServiceError::server(status.as_u16(), message),
        code => ServiceError::upstream(code, message),
    }
}

/// Map an Ollama error body to a ServiceError
///
/// Ollama answers errors as `{"error": "..."}`; anything else falls back to
/// a bounded excerpt of the body.
pub fn map_ollama_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    context.service = "ollama".to_string();

    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| describe_body(status, body)),
        Err(_) => describe_body(status, body),
    };

    if let Some(retry_after) = context.data.get("retry_after").cloned() {
        return map_http_status(status, &format!("{} (retry after {}s)", message, retry_after), context);
    }

    map_http_status(status, &message, context)
}

fn describe_body(status: StatusCode, body: &str) -> String {
    if body.is_empty() {
        status.to_string()
    } else if body.len() > BODY_EXCERPT_LIMIT {
        format!("{}: {}...", status, bounded_prefix(body, BODY_EXCERPT_LIMIT))
    } else {
        format!("{}: {}", status, body)
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

/// Determine if an HTTP status code maps to a retryable error
pub fn is_retryable_status(status: StatusCode) -> bool {
    let mut context = ErrorContext::new();
    map_http_status(status, "", &mut context).is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetryClass;

    #[test]
    fn test_status_mapping_is_code_based() {
        let mut context = ErrorContext::new();

        let err = map_http_status(StatusCode::TOO_MANY_REQUESTS, "slow down", &mut context);
        assert!(matches!(err, ServiceError::RateLimit(_)));
        assert_eq!(err.retry_class(), RetryClass::Terminal);

        let err = map_http_status(StatusCode::BAD_GATEWAY, "upstream died", &mut context);
        assert!(matches!(err, ServiceError::Server { status: 502, .. }));
        assert_eq!(err.retry_class(), RetryClass::Retryable);

        // A "5" in the message of a client error must not make it a server error
        let err = map_http_status(StatusCode::NOT_FOUND, "model gpt-5 not found", &mut context);
        assert!(matches!(err, ServiceError::Upstream { status: 404, .. }));
    }

    #[test]
    fn test_ollama_error_body() {
        let mut context = ErrorContext::new();
        let err = map_ollama_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"unauthorized"}"#,
            &mut context,
        );

        assert!(matches!(err, ServiceError::Authentication(ref m) if m == "unauthorized"));
        assert_eq!(context.service, "ollama");
        assert_eq!(context.status_code, Some(401));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }
}
