//! Common types for LLM providers
//!
//! Messages and text requests shared by every provider implementation.

use serde::{Deserialize, Serialize};

/// Token budget for question generation
pub const CLARIFICATION_MAX_TOKENS: u32 = 2048;
/// Token budget for answer-based and light refinement
pub const REFINEMENT_MAX_TOKENS: u32 = 4000;
/// Token budget for tweaks
pub const TWEAK_MAX_TOKENS: u32 = 2000;

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single-turn generation request
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub system_instruction: String,
    /// Ask the provider for a JSON object
    pub json_mode: bool,
    pub max_tokens: Option<u32>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>, system_instruction: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: system_instruction.into(),
            json_mode: false,
            max_tokens: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
