//! Clarifying question model
//!
//! The raw shape the LLM returns, the definitions the pipeline asks, and the
//! answers that flow back into refinement.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Question key to the question text shown to the LLM during refinement
pub type QuestionMapping = HashMap<String, String>;

/// Answers in the order they were given
pub type Answers = Vec<(String, Answer)>;

/// How a question is asked
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Radio,
    Checkbox,
    Confirm,
    #[default]
    #[serde(other)]
    Text,
}

/// Whether the prompt asks to analyze something or to produce something
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Analysis,
    #[default]
    #[serde(other)]
    Generation,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Analysis => "analysis",
            TaskType::Generation => "generation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question as returned by the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawQuestion {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

fn default_required() -> bool {
    true
}

/// The parsed question-generation response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPayload {
    pub task_type: TaskType,
    #[serde(default)]
    pub questions: Vec<RawQuestion>,
}

/// A question ready to be asked
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDefinition {
    pub key: String,
    /// Display text, suffixed with " (optional)" when not required
    pub message: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub required: bool,
    pub default: Option<String>,
}

impl QuestionDefinition {
    fn new(key: impl Into<String>, text: &str, kind: QuestionKind, required: bool) -> Self {
        Self {
            key: key.into(),
            message: display_message(text, required),
            kind,
            options: Vec::new(),
            required,
            default: None,
        }
    }
}

fn display_message(text: &str, required: bool) -> String {
    if required {
        text.to_string()
    } else {
        format!("{text} (optional)")
    }
}

/// A user's answer to one question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Choices(Vec<String>),
    Text(String),
}

impl Answer {
    /// Render the answer the way refinement payloads expect
    pub fn render(&self) -> String {
        match self {
            Answer::Text(text) if text.is_empty() => "None provided".to_string(),
            Answer::Text(text) => text.clone(),
            Answer::Choices(choices) if choices.is_empty() => "None selected".to_string(),
            Answer::Choices(choices) => choices.join(", "),
            Answer::Bool(true) => "Yes".to_string(),
            Answer::Bool(false) => "No".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Text(text) => text.is_empty(),
            Answer::Choices(choices) => choices.is_empty(),
            Answer::Bool(_) => false,
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Answer::Text(value)
    }
}

impl From<Vec<String>> for Answer {
    fn from(value: Vec<String>) -> Self {
        Answer::Choices(value)
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        Answer::Bool(value)
    }
}

/// The fallback questions used when the LLM is bypassed or fails
pub fn static_questions() -> (Vec<QuestionDefinition>, QuestionMapping) {
    let spec = [
        ("goal", "What is the goal of this prompt?", true),
        ("audience", "Who is the target audience?", true),
        ("tone", "What tone should it have? (e.g., formal, casual)", false),
        ("format", "What is the desired output format? (e.g., list, paragraph, JSON)", false),
    ];

    let mut questions = Vec::with_capacity(spec.len());
    let mut mapping = QuestionMapping::new();
    for (key, text, required) in spec {
        questions.push(QuestionDefinition::new(key, text, QuestionKind::Text, required));
        mapping.insert(key.to_string(), text.to_string());
    }

    (questions, mapping)
}

/// Turn LLM questions into definitions keyed `q0..qN`
pub fn convert_json_to_question_definitions(
    raw: &[RawQuestion],
) -> (Vec<QuestionDefinition>, QuestionMapping) {
    let mut questions = Vec::with_capacity(raw.len());
    let mut mapping = QuestionMapping::new();

    for (idx, item) in raw.iter().enumerate() {
        let key = format!("q{idx}");
        let text = item
            .question
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Question {}", idx + 1));

        let mut definition = QuestionDefinition::new(key.clone(), &text, item.kind, item.required);
        definition.options = item.options.clone().unwrap_or_default();
        definition.default = item.default.as_ref().map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        mapping.insert(key, text);
        questions.push(definition);
    }

    (questions, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_questions() {
        let (questions, mapping) = static_questions();
        assert_eq!(questions.len(), 4);
        assert_eq!(questions[0].key, "goal");
        assert!(questions[0].required);
        assert_eq!(questions[2].message, "What tone should it have? (e.g., formal, casual) (optional)");
        assert_eq!(mapping["audience"], "Who is the target audience?");
    }

    #[test]
    fn test_convert_assigns_sequential_keys() {
        let raw: Vec<RawQuestion> = serde_json::from_str(
            r#"[
                {"question": "Who reads it?", "type": "text"},
                {"type": "radio", "options": ["short", "long"], "required": false},
                {"question": "Pick topics", "type": "checkbox", "options": ["a", "b"]}
            ]"#,
        )
        .unwrap();

        let (questions, mapping) = convert_json_to_question_definitions(&raw);
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[1].key, "q1");
        assert_eq!(questions[1].message, "Question 2 (optional)");
        assert_eq!(questions[1].kind, QuestionKind::Radio);
        assert_eq!(questions[1].options, vec!["short", "long"]);
        assert_eq!(mapping["q1"], "Question 2");
        assert_eq!(mapping["q0"], "Who reads it?");
        assert_eq!(questions[2].kind, QuestionKind::Checkbox);
    }

    #[test]
    fn test_unknown_kinds_fall_back() {
        let raw: RawQuestion = serde_json::from_str(r#"{"question": "x", "type": "slider"}"#).unwrap();
        assert_eq!(raw.kind, QuestionKind::Text);
        assert!(raw.required);

        let payload: QuestionPayload =
            serde_json::from_str(r#"{"task_type": "research"}"#).unwrap();
        assert_eq!(payload.task_type, TaskType::Generation);
        assert!(payload.questions.is_empty());
    }

    #[test]
    fn test_answer_rendering() {
        assert_eq!(Answer::from("").render(), "None provided");
        assert_eq!(Answer::Choices(vec![]).render(), "None selected");
        assert_eq!(Answer::Choices(vec!["a".into(), "b".into()]).render(), "a, b");
        assert_eq!(Answer::Bool(true).render(), "Yes");
    }

    #[test]
    fn test_answer_untagged_serde() {
        let answers: Vec<Answer> = serde_json::from_str(r#"["text", ["x", "y"], false]"#).unwrap();
        assert_eq!(answers[0], Answer::Text("text".into()));
        assert_eq!(answers[1], Answer::Choices(vec!["x".into(), "y".into()]));
        assert_eq!(answers[2], Answer::Bool(false));
    }
}
