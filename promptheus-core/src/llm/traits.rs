//! Traits for LLM provider implementations
//!
//! Every provider implements `generate_text`; question generation and the
//! refinement stages are built on top of it.

use super::errors::{LLMError, LLMResult};
use super::payload::{self, parse_question_payload};
use super::types::*;
use crate::questions::{Answer, QuestionMapping, QuestionPayload};
use async_trait::async_trait;
use regex_utils::secrets;
use tracing::{debug, warn};

/// Core trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Get the model ID being used
    fn model(&self) -> &str;

    /// Execute a single request and return the raw text output
    async fn generate_text(&self, request: TextRequest) -> LLMResult<String>;

    /// List the models this provider can serve
    async fn available_models(&self) -> LLMResult<Vec<String>> {
        Err(LLMError::not_supported("model listing", self.name()))
    }

    /// Ask for clarifying questions. Any failure yields `None`.
    async fn generate_questions(
        &self,
        initial_prompt: &str,
        system_instruction: &str,
    ) -> Option<QuestionPayload> {
        let request = TextRequest::new(initial_prompt, system_instruction)
            .json()
            .with_max_tokens(CLARIFICATION_MAX_TOKENS);

        let text = match self.generate_text(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} question generation failed: {}", self.name(), e.sanitized());
                return None;
            }
        };

        debug!("{} question response: {}", self.name(), secrets::sanitize(&text));
        parse_question_payload(self.name(), &text)
    }

    /// Merge answers into a refined prompt
    async fn refine_from_answers(
        &self,
        initial_prompt: &str,
        answers: &[(String, Answer)],
        mapping: &QuestionMapping,
        system_instruction: &str,
    ) -> LLMResult<String> {
        let body = payload::format_refinement_payload(initial_prompt, answers, mapping);
        self.generate_text(
            TextRequest::new(body, system_instruction).with_max_tokens(REFINEMENT_MAX_TOKENS),
        )
        .await
    }

    /// Apply a targeted modification to a prompt
    async fn tweak_prompt(
        &self,
        current_prompt: &str,
        tweak_instruction: &str,
        system_instruction: &str,
    ) -> LLMResult<String> {
        let body = payload::format_tweak_payload(current_prompt, tweak_instruction);
        self.generate_text(TextRequest::new(body, system_instruction).with_max_tokens(TWEAK_MAX_TOKENS))
            .await
    }

    /// Refine a prompt without asking questions
    async fn light_refine(&self, prompt: &str, system_instruction: &str) -> LLMResult<String> {
        self.generate_text(
            TextRequest::new(prompt, system_instruction).with_max_tokens(REFINEMENT_MAX_TOKENS),
        )
        .await
    }
}
