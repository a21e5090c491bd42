//! Errors returned by the library API

use crate::llm::LLMError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptheusError {
    #[error("Configuration error: {}", .0.join("; "))]
    Configuration(Vec<String>),

    /// Carries an already sanitized provider message
    #[error("Provider error: {0}")]
    ProviderApi(String),

    #[error("Unknown provider: {0}")]
    InvalidProvider(String),
}

impl From<LLMError> for PromptheusError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::InvalidProvider { name } => PromptheusError::InvalidProvider(name),
            LLMError::ConfigurationError { .. } => PromptheusError::Configuration(vec![err.sanitized()]),
            other => PromptheusError::ProviderApi(other.sanitized()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptheusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_mapping() {
        assert!(matches!(
            PromptheusError::from(LLMError::invalid_provider("mistral")),
            PromptheusError::InvalidProvider(name) if name == "mistral"
        ));
        assert!(matches!(
            PromptheusError::from(LLMError::config("missing key")),
            PromptheusError::Configuration(_)
        ));

        let err = PromptheusError::from(LLMError::network("token abcdefghijklmnopq leaked"));
        assert_eq!(err.to_string(), "Provider error: Network error: token *** leaked");
    }

    #[test]
    fn test_configuration_display_lists_messages() {
        let err = PromptheusError::Configuration(vec!["one".into(), "two".into()]);
        assert_eq!(err.to_string(), "Configuration error: one; two");
    }
}
