//! LLM provider integration
//!
//! A single async `LLMProvider` interface over Gemini, Anthropic and the
//! OpenAI-compatible services, plus the payload helpers they share.

pub mod claude;
pub mod errors;
pub mod gemini;
pub mod openai_compat;
pub mod payload;
pub mod prompts;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use claude::AnthropicProvider;
pub use errors::{LLMError, LLMResult};
pub use gemini::GeminiProvider;
pub use openai_compat::{OpenAICompatConfig, OpenAICompatProvider};
pub use traits::LLMProvider;
pub use types::{Message, Role, TextRequest};

use crate::config::{self, Config, ConfigError};
use tracing::debug;

/// Request timeout applied to every provider client
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;

/// Build the provider registered under `name`.
///
/// `model` overrides the configured model. Aliases such as `google` and
/// `zai` resolve to their catalog entry.
pub fn create_provider(
    name: &str,
    config: &Config,
    model: Option<&str>,
) -> LLMResult<Box<dyn LLMProvider>> {
    let catalog = config::catalog().map_err(|e| LLMError::config(e.to_string()))?;
    let info = catalog.get(name).ok_or_else(|| LLMError::invalid_provider(name))?;

    let model = match model {
        Some(model) => Some(model.to_string()),
        None if config.provider() == info.id => config.model(),
        None => None,
    };

    let settings = config.settings_for(&info.id, model.as_deref()).map_err(|e| match e {
        ConfigError::UnknownProvider(name) => LLMError::invalid_provider(name),
        other => LLMError::config(other.to_string()),
    })?;

    debug!("Creating {} provider with model {}", settings.provider, settings.model);
    let provider: Box<dyn LLMProvider> = match settings.provider.as_str() {
        "gemini" => Box::new(GeminiProvider::new(settings)?),
        "anthropic" => Box::new(AnthropicProvider::new(settings)?),
        "openai" | "groq" | "qwen" | "glm" | "openrouter" => {
            Box::new(OpenAICompatProvider::from_settings(settings)?)
        }
        other => return Err(LLMError::invalid_provider(other)),
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    fn config(vars: &[(&str, &str)]) -> Config {
        Config::with_env(FileConfig::default(), vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_create_provider_by_name_and_alias() {
        let config = config(&[("GEMINI_API_KEY", "AIza-x"), ("ZAI_API_KEY", "z")]);

        let gemini = create_provider("google", &config, None).unwrap();
        assert_eq!(gemini.name(), "Gemini");
        assert_eq!(gemini.model(), "gemini-2.0-flash");

        let glm = create_provider("zai", &config, Some("glm-4-plus")).unwrap();
        assert_eq!(glm.name(), "GLM");
        assert_eq!(glm.model(), "glm-4-plus");
    }

    #[test]
    fn test_create_provider_uses_configured_model() {
        let mut config = config(&[("OPENAI_API_KEY", "sk-x")]);
        config.set_model("gpt-4o");
        let provider = create_provider("openai", &config, None).unwrap();
        assert_eq!(provider.model(), "gpt-4o");
    }

    #[test]
    fn test_create_provider_errors() {
        let config = config(&[]);
        assert!(matches!(
            create_provider("mistral", &config, None),
            Err(LLMError::InvalidProvider { .. })
        ));
        assert!(matches!(
            create_provider("anthropic", &config, None),
            Err(LLMError::ConfigurationError { .. })
        ));
    }
}
