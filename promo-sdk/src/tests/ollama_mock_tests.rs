//! Tests for the Ollama client using a mock HTTP server
//!
//! These tests verify the request shape sent to `/api/chat` and the mapping
//! of HTTP failures into the error taxonomy.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{ChatBackend, ChatCall, ServiceClient};
    use crate::error::ServiceError;
    use crate::generation::{GenerationClient, GenerationRequest, OfferType};
    use crate::resilience::{BreakerState, RetryConfig};
    use crate::services::OllamaClient;

    const MODEL: &str = "llama3.2:3b";

    fn chat_body(content: &str) -> serde_json::Value {
        json!({
            "model": MODEL,
            "message": {"role": "assistant", "content": content},
            "done": true,
            "done_reason": "stop",
            "eval_count": 42
        })
    }

    fn ollama(server: &MockServer) -> OllamaClient {
        OllamaClient::new(server.uri(), "test-key", MODEL, Duration::from_secs(5)).unwrap()
    }

    fn call() -> ChatCall {
        ChatCall {
            system_prompt: "You write copy.".to_string(),
            user_prompt: "Generate now.".to_string(),
            temperature: 0.5,
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn test_chat_request_shape() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": MODEL,
                "stream": false,
                "format": "json",
                "messages": [
                    {"role": "system", "content": "You write copy."},
                    {"role": "user", "content": "Generate now."}
                ],
                "options": {"temperature": 0.5, "num_predict": 1000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(r#"[{"text":"A"}]"#)))
            .expect(1)
            .mount(&server)
            .await;

        let content = ollama(&server).chat(call()).await.unwrap();
        assert_eq!(content, r#"[{"text":"A"}]"#);
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .set_body_json(json!({"error": "too many requests"})),
            )
            .mount(&server)
            .await;

        let err = ollama(&server).chat(call()).await.unwrap_err();

        assert!(matches!(err.root(), ServiceError::RateLimit(_)));
        assert!(err.is_permanent());
        assert_eq!(err.status_code(), Some(429));
        let context = err.context().unwrap();
        assert_eq!(context.data.get("retry_after").map(String::as_str), Some("30"));
        assert!(err.to_string().contains("too many requests"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (503, "server"),
            (500, "server"),
            (401, "authentication"),
            (404, "upstream"),
            (408, "timeout"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/chat"))
                .respond_with(
                    ResponseTemplate::new(status).set_body_json(json!({"error": "nope"})),
                )
                .mount(&server)
                .await;

            let err = ollama(&server).chat(call()).await.unwrap_err();
            let kind = match err.root() {
                ServiceError::Server { .. } => "server",
                ServiceError::Authentication(_) => "authentication",
                ServiceError::Upstream { .. } => "upstream",
                ServiceError::Timeout(_) => "timeout",
                other => panic!("unexpected error for {}: {:?}", status, other),
            };
            assert_eq!(kind, expected, "status {}", status);
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parsing_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = ollama(&server).chat(call()).await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::Parsing { .. }));
        assert_eq!(err.raw_prefix(), Some("<html>gateway</html>"));
    }

    #[tokio::test]
    async fn test_empty_message_is_parsing_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("   ")))
            .mount(&server)
            .await;

        let err = ollama(&server).chat(call()).await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::Parsing { .. }));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": MODEL}, {"name": "mistral:7b"}]
            })))
            .mount(&server)
            .await;

        let client = ollama(&server);
        assert_eq!(client.list_models().await.unwrap(), vec![MODEL, "mistral:7b"]);
        assert!(client.health_check().await.unwrap());
        assert_eq!(client.name(), "ollama");

        let metrics = client.metrics().unwrap();
        assert_eq!(metrics.get("request_count").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_health_check_reports_down() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        assert!(!ollama(&server).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_generation_recovers_from_unavailable_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"error": "model is loading"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let answer = r#"{"variations": [
            {"headline": "Deploy in one click", "text": "Acme ships your app.", "cta": "Try Acme"},
            {"headline": "Fewer pages at 3am", "text": "Rollbacks that just work.", "cta": "See how"}
        ]}"#;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(answer)))
            .mount(&server)
            .await;

        let client = GenerationClient::builder()
            .backend(Arc::new(ollama(&server)))
            .retry_config(RetryConfig {
                base_delay: Duration::from_millis(10),
                ..RetryConfig::default()
            })
            .build()
            .unwrap();

        let request = GenerationRequest::new(
            "Acme Deploy",
            "One-click deploys",
            "https://acme.example",
            OfferType::Affiliate,
        )
        .variations(2);
        let result = client.generate(&request).await.unwrap();

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].cta, "Try Acme");
        assert_eq!(client.breaker_state(), BreakerState::Closed);

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 2);
    }
}
