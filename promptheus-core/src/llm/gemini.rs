//! Google Gemini provider over the public REST API
//!
//! Tries the configured model first and then the remaining catalog models,
//! stopping early on errors that another model cannot fix.

use super::errors::{LLMError, LLMResult};
use super::traits::LLMProvider;
use super::types::TextRequest;
use super::DEFAULT_PROVIDER_TIMEOUT_SECS;
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER_NAME: &str = "Gemini";

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    settings: ProviderSettings,
}

impl GeminiProvider {
    pub fn new(settings: ProviderSettings) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| LLMError::config(e.to_string()))?;

        Ok(Self { client, settings })
    }

    /// Configured model followed by the other catalog models
    fn models_to_try(&self) -> Vec<String> {
        let mut models = vec![self.settings.model.clone()];
        models.extend(self.settings.models.iter().filter(|m| **m != self.settings.model).cloned());
        models
    }

    async fn generate_with_model(&self, model: &str, request: &TextRequest) -> LLMResult<String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: request.prompt.clone() }],
            }],
            system_instruction: (!request.system_instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part { text: request.system_instruction.clone() }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: request.json_mode.then(|| "application/json".to_string()),
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.settings.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|_| LLMError::provider(PROVIDER_NAME, "Invalid JSON response from Gemini"))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LLMError::provider(PROVIDER_NAME, "Gemini response did not include text content"))
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate_text(&self, request: TextRequest) -> LLMResult<String> {
        let mut last_error = None;

        for model in self.models_to_try() {
            debug!("Calling Gemini model {}", model);
            match self.generate_with_model(&model, &request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Gemini model {} failed: {}", model, e.sanitized());
                    let fatal = e.is_fatal();
                    last_error = Some(e);
                    if fatal {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::provider(PROVIDER_NAME, "Gemini API call failed: unknown error")))
    }

    async fn available_models(&self) -> LLMResult<Vec<String>> {
        let url = format!("{}/models", self.settings.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.settings.api_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::api(status.as_u16(), text));
        }

        let parsed: ModelList = serde_json::from_str(&text)?;
        Ok(parsed
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods.is_empty()
                    || m.supported_generation_methods.iter().any(|g| g == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}
