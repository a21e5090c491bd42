//! Mock LLM provider for testing
//!
//! Scripted responses and a call log, available to unit tests only.

#![cfg(test)]

use super::errors::{LLMError, LLMResult};
use super::traits::LLMProvider;
use super::types::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock LLM provider for testing
#[derive(Clone)]
pub struct MockLLMProvider {
    name: String,
    model: String,
    responses: Arc<Mutex<VecDeque<LLMResult<String>>>>,
    call_history: Arc<Mutex<Vec<TextRequest>>>,
}

impl MockLLMProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::with_model("mock", "mock-model")
    }

    /// Create a mock provider with a specific name and model
    pub fn with_model(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response to return
    pub fn add_response(&self, response: impl Into<String>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response.into()));
        self
    }

    /// Queue an error to return
    pub fn add_error(&self, error: LLMError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<TextRequest> {
        self.call_history.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_history.lock().unwrap().len()
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_text(&self, request: TextRequest) -> LLMResult<String> {
        self.call_history.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::provider(&self.name, "mock has no scripted response")))
    }

    async fn available_models(&self) -> LLMResult<Vec<String>> {
        Ok(vec![self.model.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questions::{Answer, QuestionMapping, TaskType};

    #[tokio::test]
    async fn test_mock_returns_scripted_responses() {
        let mock = MockLLMProvider::new();
        mock.add_response("first").add_error(LLMError::network("down"));

        let first = mock.generate_text(TextRequest::new("a", "s")).await.unwrap();
        assert_eq!(first, "first");
        assert!(mock.generate_text(TextRequest::new("b", "s")).await.is_err());
        assert!(mock.generate_text(TextRequest::new("c", "s")).await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[1].prompt, "b");
    }

    #[tokio::test]
    async fn test_default_question_generation() {
        let mock = MockLLMProvider::new();
        mock.add_response(r#"{"task_type": "analysis", "questions": []}"#);

        let payload = mock.generate_questions("Explain TCP", "classify").await.unwrap();
        assert_eq!(payload.task_type, TaskType::Analysis);

        let call = &mock.calls()[0];
        assert!(call.json_mode);
        assert_eq!(call.max_tokens, Some(CLARIFICATION_MAX_TOKENS));
    }

    #[tokio::test]
    async fn test_question_generation_failure_is_none() {
        let mock = MockLLMProvider::new();
        mock.add_error(LLMError::api(401, "nope"));
        assert!(mock.generate_questions("p", "s").await.is_none());

        mock.add_response("not json at all");
        assert!(mock.generate_questions("p", "s").await.is_none());
    }

    #[tokio::test]
    async fn test_refine_and_tweak_payloads() {
        let mock = MockLLMProvider::new();
        mock.add_response("refined").add_response("tweaked");

        let answers = vec![("goal".to_string(), Answer::from("teach"))];
        let mapping: QuestionMapping =
            [("goal".to_string(), "What is the goal?".to_string())].into_iter().collect();
        assert_eq!(mock.refine_from_answers("p", &answers, &mapping, "gen").await.unwrap(), "refined");
        assert_eq!(mock.tweak_prompt("refined", "shorter", "tweak").await.unwrap(), "tweaked");

        let calls = mock.calls();
        assert!(calls[0].prompt.contains("- What is the goal?: teach"));
        assert_eq!(calls[0].max_tokens, Some(REFINEMENT_MAX_TOKENS));
        assert!(calls[1].prompt.starts_with("Current Prompt:\nrefined"));
        assert_eq!(calls[1].max_tokens, Some(TWEAK_MAX_TOKENS));
    }
}
