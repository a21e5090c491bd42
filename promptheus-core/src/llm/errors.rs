//! Error types for LLM operations
//!
//! Strongly-typed errors for provider calls, using thiserror for the
//! error trait implementations.

use regex_utils::secrets;
use std::time::Duration;
use thiserror::Error;

/// Main error type for LLM operations
#[derive(Debug, Error)]
pub enum LLMError {
    /// Request timed out
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Network error occurred
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// API returned an error
    #[error("API call failed: Status {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Feature not supported by provider
    #[error("Feature '{feature}' is not supported by provider '{provider}'")]
    NotSupported { feature: String, provider: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Unknown provider name
    #[error("Unknown provider: {name}")]
    InvalidProvider { name: String },

    /// Parsing or serialization error
    #[error("Parsing error: {message}")]
    ParseError { message: String },

    /// Provider-specific error
    #[error("{message}")]
    ProviderError { provider: String, message: String },
}

impl LLMError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Create an API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError { status, message: message.into() }
    }

    /// Create a not supported error
    pub fn not_supported(feature: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::NotSupported { feature: feature.into(), provider: provider.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// Create an unknown provider error
    pub fn invalid_provider(name: impl Into<String>) -> Self {
        Self::InvalidProvider { name: name.into() }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderError { provider: provider.into(), message: message.into() }
    }

    /// Errors that will not go away by trying another model:
    /// rejected credentials, malformed requests and rate limits
    pub fn is_fatal(&self) -> bool {
        match self {
            LLMError::ConfigurationError { .. } => true,
            LLMError::ApiError { status, .. } => matches!(status, 400 | 401 | 403 | 429),
            _ => false,
        }
    }

    /// Errors worth retrying against the same endpoint: 429, any 5xx,
    /// timeouts and transport failures
    pub fn is_retryable(&self) -> bool {
        match self {
            LLMError::Timeout { .. } | LLMError::NetworkError { .. } => true,
            LLMError::ApiError { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Display form with secrets masked, suitable for users and logs
    pub fn sanitized(&self) -> String {
        secrets::sanitize(&self.to_string())
    }
}

/// Result type for LLM operations
pub type LLMResult<T> = Result<T, LLMError>;

/// Convert from JSON errors
impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError { message: err.to_string() }
    }
}

/// Convert from transport errors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { duration: Duration::from_secs(crate::llm::DEFAULT_PROVIDER_TIMEOUT_SECS) }
        } else if let Some(status) = err.status() {
            Self::ApiError { status: status.as_u16(), message: err.to_string() }
        } else {
            Self::NetworkError { message: err.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LLMError::api(500, "Internal server error");
        assert_eq!(err.to_string(), "API call failed: Status 500: Internal server error");

        let err = LLMError::provider("Groq", "Groq response missing choices");
        assert_eq!(err.to_string(), "Groq response missing choices");

        let err = LLMError::invalid_provider("mistral");
        assert_eq!(err.to_string(), "Unknown provider: mistral");
    }

    #[test]
    fn test_retry_and_fatal_classification() {
        assert!(LLMError::api(502, "bad gateway").is_retryable());
        assert!(!LLMError::api(404, "missing").is_retryable());
        assert!(LLMError::api(429, "slow down").is_retryable());
        assert!(LLMError::api(529, "overloaded").is_retryable());
        assert!(LLMError::api(599, "edge").is_retryable());
        assert!(!LLMError::api(600, "out of range").is_retryable());
        assert!(!LLMError::api(401, "unauthorized").is_retryable());
        assert!(LLMError::config("no key").is_fatal());
        assert!(LLMError::api(403, "forbidden").is_fatal());
        assert!(LLMError::api(401, "unauthorized").is_fatal());
        assert!(!LLMError::api(500, "oops").is_fatal());
        assert!(!LLMError::network("reset").is_fatal());
    }

    #[test]
    fn test_sanitized_masks_keys() {
        let err = LLMError::network("key AIzaSyD-abcdefghijklmnop rejected");
        assert_eq!(err.sanitized(), "Network error: key *** rejected");
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LLMError = json_err.into();
        assert!(matches!(llm_err, LLMError::ParseError { .. }));
    }
}
