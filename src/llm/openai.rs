//! OpenAI-compatible chat completions client.

use super::request::ChatRequest;
use super::routing::RetryPolicy;
use super::traits::CompletionClient;
use crate::config::LlmConfig;
use crate::error::{ConfigError, LlmError};

use reqwest::StatusCode;

/// Calls `POST {base_url}/v1/chat/completions` with bearer auth.
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ConfigError::Invalid(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    /// Direct call to the provider (no retry logic).
    async fn attempt_completion(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|error| LlmError::Network(error.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|error| LlmError::Network(format!("failed to read response body: {error}")))?;

        if !status.is_success() {
            return Err(status_error(status, &response_text));
        }

        let body: serde_json::Value = serde_json::from_str(&response_text).map_err(|error| {
            LlmError::MalformedResponse(format!(
                "response ({status}) is not valid JSON: {error}\nBody: {}",
                truncate_body(&response_text)
            ))
        })?;

        parse_chat_response(&body)
    }
}

impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        tracing::debug!(
            model = %request.model(),
            messages = request.messages().len(),
            "sending completion request"
        );
        let reply = self
            .retry
            .run(request.model(), || self.attempt_completion(request))
            .await?;
        tracing::debug!(model = %request.model(), reply_len = reply.len(), "completion received");
        Ok(reply)
    }
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| truncate_body(body).to_owned());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(message),
        _ => LlmError::Provider {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull `choices[0].message.content` out of a chat completions body.
fn parse_chat_response(body: &serde_json::Value) -> Result<String, LlmError> {
    let choice = body["choices"]
        .get(0)
        .ok_or_else(|| LlmError::MalformedResponse("missing choices array".into()))?;

    match choice["message"]["content"].as_str() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(LlmError::EmptyResponse),
        None if choice["message"].is_object() => Err(LlmError::EmptyResponse),
        None => Err(LlmError::MalformedResponse("missing message content".into())),
    }
}

/// Truncate a response body for error messages to avoid dumping megabytes of HTML.
fn truncate_body(body: &str) -> &str {
    let limit = 500;
    if body.len() <= limit {
        return body;
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::request::{self, ModelConfig};
    use crate::persona::SystemPersona;

    use axum::Json;
    use axum::Router;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct MockProvider {
        calls: AtomicU32,
        failures_before_success: u32,
        failure_status: u16,
    }

    async fn chat_completions(
        State(provider): State<Arc<MockProvider>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let call = provider.calls.fetch_add(1, Ordering::SeqCst);
        if call < provider.failures_before_success {
            let status = StatusCode::from_u16(provider.failure_status).unwrap();
            return (
                status,
                Json(serde_json::json!({"error": {"message": "upstream trouble"}})),
            );
        }

        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer test-key");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": {"message": "bad key"}})),
            );
        }

        let last = body["messages"]
            .as_array()
            .and_then(|messages| messages.last())
            .and_then(|message| message["content"].as_str())
            .unwrap_or_default()
            .to_string();
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": format!("echo: {last}")}}],
                "model": body["model"],
            })),
        )
    }

    async fn spawn_provider(provider: MockProvider) -> (String, Arc<MockProvider>) {
        let provider = Arc::new(provider);
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(provider.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{address}"), provider)
    }

    fn config(base_url: String, api_key: &str, max_retries: u32) -> LlmConfig {
        LlmConfig {
            api_key: api_key.into(),
            base_url,
            model: ModelConfig {
                model: "o4-mini".into(),
                temperature: 1.0,
            },
            timeout_secs: 5,
            retry: RetryPolicy {
                max_retries,
                base_delay_ms: 1,
            },
        }
    }

    fn request(message: &str) -> ChatRequest {
        request::build(
            &SystemPersona::default(),
            &[],
            message,
            &ModelConfig {
                model: "o4-mini".into(),
                temperature: 1.0,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let (base_url, _) = spawn_provider(MockProvider::default()).await;
        let client = OpenAiClient::new(&config(base_url, "test-key", 0)).unwrap();

        let reply = client.complete(&request("I have a headache")).await.unwrap();
        assert_eq!(reply, "echo: I have a headache");
    }

    #[tokio::test]
    async fn bad_key_maps_to_auth_error_without_retry() {
        let (base_url, provider) = spawn_provider(MockProvider::default()).await;
        let client = OpenAiClient::new(&config(base_url, "wrong", 3)).unwrap();

        let error = client.complete(&request("hi")).await.unwrap_err();
        assert_eq!(error, LlmError::Auth { status: 401 });
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (base_url, provider) = spawn_provider(MockProvider {
            failures_before_success: 2,
            failure_status: 503,
            ..Default::default()
        })
        .await;
        let client = OpenAiClient::new(&config(base_url, "test-key", 2)).unwrap();

        let reply = client.complete(&request("hi")).await.unwrap();
        assert_eq!(reply, "echo: hi");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_after_budget() {
        let (base_url, provider) = spawn_provider(MockProvider {
            failures_before_success: 10,
            failure_status: 429,
            ..Default::default()
        })
        .await;
        let client = OpenAiClient::new(&config(base_url, "test-key", 1)).unwrap();

        let error = client.complete(&request("hi")).await.unwrap_err();
        assert_eq!(error, LlmError::RateLimited("upstream trouble".into()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client =
            OpenAiClient::new(&config(format!("http://{address}"), "test-key", 0)).unwrap();
        let error = client.complete(&request("hi")).await.unwrap_err();
        assert!(matches!(error, LlmError::Network(_)));
    }

    #[test]
    fn parses_content_and_flags_empty_or_malformed_bodies() {
        let ok = serde_json::json!({"choices": [{"message": {"content": "Take rest."}}]});
        assert_eq!(parse_chat_response(&ok).unwrap(), "Take rest.");

        let empty = serde_json::json!({"choices": [{"message": {"content": ""}}]});
        assert_eq!(parse_chat_response(&empty), Err(LlmError::EmptyResponse));

        let refusal = serde_json::json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(parse_chat_response(&refusal), Err(LlmError::EmptyResponse));

        let missing = serde_json::json!({"object": "error"});
        assert!(matches!(
            parse_chat_response(&missing),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = truncate_body(&body);
        assert!(truncated.len() <= 500);
        assert!(body.starts_with(truncated));
    }
}
