//! Anthropic Claude provider implementation with retry logic
//!
//! Also serves Anthropic-compatible gateways through a base URL override.

use super::errors::{LLMError, LLMResult};
use super::payload::append_json_instruction;
use super::traits::LLMProvider;
use super::types::{Message, Role, TextRequest, REFINEMENT_MAX_TOKENS};
use super::DEFAULT_PROVIDER_TIMEOUT_SECS;
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const PROVIDER_NAME: &str = "Anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Claude provider for Anthropic's models
pub struct AnthropicProvider {
    client: Client,
    settings: ProviderSettings,
    max_retries: u32,
    initial_retry_delay: Duration,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| LLMError::config(e.to_string()))?;

        Ok(Self { client, settings, max_retries: 3, initial_retry_delay: Duration::from_millis(1000) })
    }

    /// Override the retry policy
    pub fn with_retries(mut self, max_retries: u32, initial_retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.initial_retry_delay = initial_retry_delay;
        self
    }

    /// Create a message with retry logic
    async fn create_message_with_retry(&self, request: &MessageRequest) -> LLMResult<String> {
        let mut attempt = 0;
        let mut backoff = self.initial_retry_delay;

        loop {
            match self.create_message_internal(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }
                    warn!("Temporary Anthropic error, retrying in {:?}: {}", backoff, e.sanitized());
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Internal message creation without retry logic
    async fn create_message_internal(&self, request: &MessageRequest) -> LLMResult<String> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        let result: MessageResponse = serde_json::from_str(&text)
            .map_err(|_| LLMError::provider(PROVIDER_NAME, "Invalid JSON response from Anthropic"))?;

        result
            .content
            .into_iter()
            .find_map(|c| match c {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| LLMError::provider(PROVIDER_NAME, "Anthropic API returned no content"))
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate_text(&self, request: TextRequest) -> LLMResult<String> {
        // No native JSON mode; ask for it in the prompt
        let prompt = if request.json_mode {
            append_json_instruction(&request.prompt)
        } else {
            request.prompt
        };

        let body = MessageRequest {
            model: self.settings.model.clone(),
            messages: vec![Message { role: Role::User, content: prompt }],
            max_tokens: request.max_tokens.unwrap_or(REFINEMENT_MAX_TOKENS),
            system: (!request.system_instruction.is_empty()).then_some(request.system_instruction),
        };

        debug!("Calling Anthropic model {}", self.settings.model);
        self.create_message_with_retry(&body).await
    }

    async fn available_models(&self) -> LLMResult<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.settings.base_url))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        let list: ModelList = serde_json::from_str(&text)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

// API Types

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String) -> AnthropicProvider {
        let settings = ProviderSettings {
            provider: "anthropic".to_string(),
            display_name: "Anthropic Claude".to_string(),
            api_key: "sk-ant-test".to_string(),
            base_url,
            model: "claude-3-5-sonnet-20241022".to_string(),
            models: vec![],
            fallback_model: None,
        };
        AnthropicProvider::new(settings).unwrap().with_retries(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_generate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"system": "be precise", "max_tokens": 2000})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Tweaked prompt"}]
            })))
            .mount(&server)
            .await;

        let request = TextRequest::new("p", "be precise").with_max_tokens(2000);
        let text = provider(server.uri()).generate_text(request).await.unwrap();
        assert_eq!(text, "Tweaked prompt");
    }

    #[tokio::test]
    async fn test_overloaded_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let err = provider(server.uri()).generate_text(TextRequest::new("p", "s")).await.unwrap_err();
        assert!(matches!(err, LLMError::ApiError { status: 529, .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(server.uri()).generate_text(TextRequest::new("p", "s")).await.unwrap_err();
        assert!(matches!(err, LLMError::ApiError { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(3)
            .mount(&server)
            .await;

        let err = provider(server.uri()).generate_text(TextRequest::new("p", "s")).await.unwrap_err();
        assert_eq!(err.to_string(), "API call failed: Status 503: unavailable");
    }

    #[tokio::test]
    async fn test_json_mode_appends_instruction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "```json\n{\"task_type\": \"generation\"}\n```"}]
            })))
            .mount(&server)
            .await;

        let provider = provider(server.uri());
        let payload = provider.generate_questions("Write a poem", "classify").await.unwrap();
        assert!(payload.questions.is_empty());

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("Respond ONLY with a valid JSON object"));
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = provider(server.uri()).generate_text(TextRequest::new("p", "s")).await.unwrap_err();
        assert_eq!(err.to_string(), "Anthropic API returned no content");
    }
}
