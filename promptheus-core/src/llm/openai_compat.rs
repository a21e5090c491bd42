//! OpenAI-compatible provider for OpenAI, Groq, Qwen, GLM and OpenRouter
//!
//! All of these expose `/chat/completions` with bearer authentication and
//! differ only in base URL, JSON-mode support and model listing.

use super::errors::{LLMError, LLMResult};
use super::payload::{append_json_instruction, build_chat_messages};
use super::traits::LLMProvider;
use super::types::{Message, TextRequest};
use super::DEFAULT_PROVIDER_TIMEOUT_SECS;
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const OPENROUTER_NO_PROVIDERS: &str = "No allowed providers";

/// Per-service behaviour of an OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Catalog id, e.g. "groq"
    pub provider: String,
    /// Name used in error messages
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Whether `response_format: json_object` is accepted
    pub supports_json_mode: bool,
    /// Static model list instead of querying `/models`
    pub curated_models: Option<Vec<String>>,
    /// Retried once when OpenRouter reports no allowed providers
    pub fallback_model: Option<String>,
}

impl OpenAICompatConfig {
    pub fn from_settings(settings: ProviderSettings) -> Self {
        let (name, supports_json_mode) = match settings.provider.as_str() {
            "openai" => ("OpenAI", true),
            "groq" => ("Groq", true),
            "qwen" => ("Qwen", true),
            "glm" => ("GLM", true),
            "openrouter" => ("OpenRouter", false),
            _ => (settings.display_name.as_str(), false),
        };
        let name = name.to_string();
        let is_openrouter = settings.provider == "openrouter";

        Self {
            name,
            supports_json_mode,
            curated_models: is_openrouter.then(|| vec!["openrouter/auto".to_string()]),
            fallback_model: if is_openrouter { settings.fallback_model } else { None },
            provider: settings.provider,
            base_url: settings.base_url,
            api_key: settings.api_key,
            model: settings.model,
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible provider that can work with multiple services
pub struct OpenAICompatProvider {
    client: Client,
    config: OpenAICompatConfig,
}

impl OpenAICompatProvider {
    pub fn new(config: OpenAICompatConfig) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::config(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_settings(settings: ProviderSettings) -> LLMResult<Self> {
        Self::new(OpenAICompatConfig::from_settings(settings))
    }

    async fn chat_completion(&self, model: &str, request: &TextRequest) -> LLMResult<String> {
        let use_json_format = request.json_mode && self.config.supports_json_mode;
        let prompt = if request.json_mode && !use_json_format {
            append_json_instruction(&request.prompt)
        } else {
            request.prompt.clone()
        };

        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: build_chat_messages(&request.system_instruction, &prompt),
            max_tokens: request.max_tokens,
            response_format: use_json_format.then(|| ResponseFormat { kind: "json_object".to_string() }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        self.parse_completion(&text)
    }

    fn parse_completion(&self, text: &str) -> LLMResult<String> {
        let name = &self.config.name;
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|_| LLMError::provider(name, format!("Invalid JSON response from {name}")))?;

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(LLMError::provider(name, format!("API call failed: {message}")));
        }

        let completion: ChatCompletionResponse = serde_json::from_value(value)
            .map_err(|_| LLMError::provider(name, format!("Invalid JSON response from {name}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::provider(name, format!("{name} response missing choices")))?;

        choice
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LLMError::provider(name, format!("{name} response missing text output")))
    }

    fn should_use_fallback(&self, error: &LLMError) -> Option<&str> {
        let fallback = self.config.fallback_model.as_deref()?;
        match error {
            LLMError::ApiError { status: 404, message }
                if message.contains(OPENROUTER_NO_PROVIDERS) && fallback != self.config.model =>
            {
                Some(fallback)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate_text(&self, request: TextRequest) -> LLMResult<String> {
        debug!("Calling {} model {}", self.config.name, self.config.model);
        match self.chat_completion(&self.config.model, &request).await {
            Ok(text) => Ok(text),
            Err(e) => match self.should_use_fallback(&e) {
                Some(fallback) => {
                    info!("{} has no provider for {}, retrying with {}", self.config.name, self.config.model, fallback);
                    self.chat_completion(fallback, &request).await
                }
                None => Err(e),
            },
        }
    }

    async fn available_models(&self) -> LLMResult<Vec<String>> {
        if let Some(models) = &self.config.curated_models {
            return Ok(models.clone());
        }

        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        let list: ModelList = serde_json::from_str(&text)?;
        let mut models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
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
