//! Request payload formatting and response parsing shared by providers

use super::types::Message;
use crate::questions::{Answer, QuestionMapping, QuestionPayload};
use regex_utils::{json_block, secrets};
use tracing::warn;

const JSON_ONLY_SUFFIX: &str = "Respond ONLY with a valid JSON object using double-quoted keys. \
Include the fields specified in the instructions (for example, task_type and questions). \
Do not wrap the JSON in markdown code fences or add commentary.";

/// Build the user message for answer-based refinement
pub fn format_refinement_payload(
    initial_prompt: &str,
    answers: &[(String, Answer)],
    mapping: &QuestionMapping,
) -> String {
    let mut lines = vec![
        format!("Initial Prompt: {initial_prompt}"),
        String::new(),
        "User's Answers to Clarifying Questions:".to_string(),
    ];

    for (key, answer) in answers {
        let question = mapping.get(key).map(String::as_str).unwrap_or(key);
        lines.push(format!("- {question}: {}", answer.render()));
    }

    lines.push(String::new());
    lines.push("Please generate a refined, optimized prompt based on this information.".to_string());
    lines.join("\n")
}

/// Build the user message for a tweak request
pub fn format_tweak_payload(current_prompt: &str, tweak_instruction: &str) -> String {
    [
        "Current Prompt:",
        current_prompt,
        "",
        "User's Modification Request:",
        tweak_instruction,
        "",
        "Return the tweaked prompt:",
    ]
    .join("\n")
}

pub fn extract_json_block(text: &str) -> &str {
    json_block::extract(text)
}

/// Parse a question-generation response.
///
/// Returns `None` when the text is not a JSON object carrying `task_type`.
pub fn parse_question_payload(provider: &str, text: &str) -> Option<QuestionPayload> {
    let cleaned = extract_json_block(text);

    let value: serde_json::Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!("{} returned invalid JSON: {}", provider, secrets::sanitize(&e.to_string()));
            return None;
        }
    };

    let Some(object) = value.as_object() else {
        warn!("{} question payload is not an object; falling back to static questions", provider);
        return None;
    };

    if !object.contains_key("task_type") {
        warn!("{} question payload missing task_type; falling back to static questions", provider);
        return None;
    }

    match serde_json::from_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!("{} question payload malformed: {}", provider, secrets::sanitize(&e.to_string()));
            None
        }
    }
}

/// Append the JSON-only instruction once
pub fn append_json_instruction(prompt: &str) -> String {
    if prompt.contains(JSON_ONLY_SUFFIX) {
        return prompt.to_string();
    }
    if prompt.is_empty() {
        return JSON_ONLY_SUFFIX.to_string();
    }
    format!("{}\n\n{}", prompt.trim_end(), JSON_ONLY_SUFFIX)
}

/// Chat messages for a single-turn request
pub fn build_chat_messages(system_instruction: &str, prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if !system_instruction.is_empty() {
        messages.push(Message::system(system_instruction));
    }
    messages.push(Message::user(prompt));
    messages
}
