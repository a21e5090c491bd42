//! Regex utilities for promptheus
//! Extracted to a separate crate for compilation optimization

use once_cell::sync::Lazy;
use regex::Regex;

/// Masking of secrets that leak into provider error messages
pub mod secrets {
    use super::*;

    /// Anything that looks like an API key or bearer token
    pub static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"[A-Za-z0-9_\-]{12,}").expect("Invalid regex pattern")
    });

    pub const DEFAULT_MAX_LENGTH: usize = 160;

    /// Mask token-like substrings, collapse whitespace and truncate.
    pub fn sanitize_error_message(message: &str, max_length: usize) -> String {
        if message.is_empty() {
            return String::new();
        }

        let masked = TOKEN_PATTERN.replace_all(message, "***");
        let collapsed = masked.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.chars().count() > max_length {
            let keep = max_length.saturating_sub(3);
            let mut truncated: String = collapsed.chars().take(keep).collect();
            truncated.push_str("...");
            truncated
        } else {
            collapsed
        }
    }

    /// Sanitize with the default length cap
    pub fn sanitize(message: &str) -> String {
        sanitize_error_message(message, DEFAULT_MAX_LENGTH)
    }
}

/// Extraction of JSON payloads that models wrap in markdown fences
pub mod json_block {
    use super::*;

    pub static JSON_FENCE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?s)```json(.*?)(?:```|\z)").expect("Invalid regex pattern")
    });

    pub static ANY_FENCE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?s)```(.*?)(?:```|\z)").expect("Invalid regex pattern")
    });

    /// Return the body of a ```json fence, else of the first ``` fence,
    /// else the trimmed input.
    pub fn extract(text: &str) -> &str {
        if let Some(body) = JSON_FENCE.captures(text).and_then(|caps| caps.get(1)) {
            return body.as_str().trim();
        }

        if let Some(body) = ANY_FENCE.captures(text).and_then(|caps| caps.get(1)) {
            return body.as_str().trim();
        }

        text.trim()
    }
}

/// Detection of models that cannot be used for text generation
pub mod model_filter {
    use super::*;

    pub static NON_TEXT_MODEL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)embed|image|vision|audio|speech|video|sound|draw|paint|whisper")
            .expect("Invalid regex pattern")
    });

    pub fn is_text_model(model: &str) -> bool {
        !NON_TEXT_MODEL.is_match(model)
    }

    /// Keep only text-capable model ids, preserving order
    pub fn text_models(models: &[String]) -> Vec<&String> {
        models.iter().filter(|m| is_text_model(m)).collect()
    }
}
