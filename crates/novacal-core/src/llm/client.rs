//! LLM API HTTP Client
//!
//! Supports the Claude Messages API and OpenAI-compatible chat completions
//! (Gemini, OpenAI, etc.)

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::*;

/// LLM API client
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
    temperature: f32,
    max_tokens: u64,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("api_key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            provider: config.provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Send a request to the configured backend
    pub async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        match self.provider {
            LlmProvider::Claude => self.send_claude_request(request).await,
            LlmProvider::Gemini | LlmProvider::OpenAi => self.send_openai_request(request).await,
        }
    }

    async fn send_claude_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!("Sending request to Claude API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::LlmApi {
                status: Some(status.as_u16()),
                message: api_error_message(&body),
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Failed to parse response: {}", e)))?;

        info!(
            "Claude API response: stop_reason={}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    async fn send_openai_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to OpenAI-compatible API: {}", url);

        let openai_request = ChatCompletionRequest::from_claude_request(&request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("OpenAI-compatible API error: {} - {}", status, body);
            return Err(Error::LlmApi {
                status: Some(status.as_u16()),
                message: api_error_message(&body),
            });
        }

        let openai_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("Failed to parse response: {}", e)))?;

        let parsed = openai_response.to_claude_response()?;

        info!(
            "OpenAI-compatible API response: stop_reason={}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    /// Create a request builder preloaded with model, limits and temperature
    pub fn request_builder(&self) -> MessagesRequestBuilder {
        MessagesRequestBuilder::new(self.model.clone())
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }
}

/// Pull the human-readable message out of an error body.
///
/// Both Gemini and Claude wrap errors as `{"error": {"message": ...}}`;
/// Gemini sometimes returns a one-element array of that shape.
fn api_error_message(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return body.to_string(),
    };
    let object = match &value {
        serde_json::Value::Array(items) => items.first().cloned().unwrap_or_default(),
        other => other.clone(),
    };
    object
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            api_key: "test-key".to_string(),
            provider,
            base_url: Some(server.uri()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let config = LlmConfig::default();
        assert!(matches!(LlmClient::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_api_error_message_extraction() {
        let body = r#"[{"error": {"code": 400, "message": "API key not valid."}}]"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_openai_compatible_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "1",
                "model": "gemini-2.5-flash",
                "choices": [{
                    "index": 0,
                    "finish_reason": "stop",
                    "message": {"role": "assistant", "content": "Done."}
                }]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, LlmProvider::Gemini)).unwrap();
        let request = client
            .request_builder()
            .messages(vec![Message::user("hi")])
            .build();
        assert_eq!(request.temperature, Some(0.3));

        let response = client.messages(request).await.unwrap();
        assert_eq!(response.stop_reason, "end_turn");
        assert_eq!(response.content.len(), 1);
    }

    #[tokio::test]
    async fn test_quota_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Resource has been exhausted"}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, LlmProvider::Gemini)).unwrap();
        let err = client
            .messages(client.request_builder().messages(vec![Message::user("hi")]).build())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("Resource has been exhausted"));
    }

    #[tokio::test]
    async fn test_claude_provider_uses_messages_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "model": "claude",
                "stop_reason": "end_turn",
                "content": [{"type": "text", "text": "ok"}],
                "usage": {"input_tokens": 3, "output_tokens": 1}
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, LlmProvider::Claude)).unwrap();
        let response = client
            .messages(client.request_builder().messages(vec![Message::user("hi")]).build())
            .await
            .unwrap();
        assert_eq!(response.content[0], MessageContent::Text { text: "ok".to_string() });
    }

    #[tokio::test]
    async fn test_unparseable_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = LlmClient::new(&config_for(&server, LlmProvider::OpenAi)).unwrap();
        let err = client
            .messages(client.request_builder().messages(vec![Message::user("hi")]).build())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
