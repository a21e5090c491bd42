//! Terminal front-end for the refinement pipeline
//!
//! Notices go to stderr. The prompt itself goes to stdout so it can be piped.

use dialoguer::{Confirm, Input, MultiSelect, Select};
use promptheus_core::pipeline::Interaction;
use promptheus_core::questions::{Answer, QuestionDefinition, QuestionKind};
use std::io::IsTerminal;
use tracing::debug;

pub fn stdin_is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Answers pipeline questions through dialoguer prompts
pub struct TerminalInteraction {
    interactive: bool,
}

impl TerminalInteraction {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }

    fn ask_text(&self, question: &QuestionDefinition) -> dialoguer::Result<String> {
        let mut input = Input::<String>::new().with_prompt(&question.message).allow_empty(true);
        if let Some(default) = &question.default {
            input = input.default(default.clone());
        }
        input.interact_text()
    }

    fn ask_select(&self, question: &QuestionDefinition) -> dialoguer::Result<Option<Answer>> {
        let default = question
            .default
            .as_ref()
            .and_then(|d| question.options.iter().position(|o| o == d))
            .unwrap_or(0);
        let choice = Select::new()
            .with_prompt(&question.message)
            .items(question.options.as_slice())
            .default(default)
            .interact_opt()?;
        Ok(choice.map(|idx| Answer::Text(question.options[idx].clone())))
    }

    fn ask_multi(&self, question: &QuestionDefinition) -> dialoguer::Result<Option<Answer>> {
        let picked = MultiSelect::new()
            .with_prompt(&question.message)
            .items(question.options.as_slice())
            .interact_opt()?;
        Ok(picked.map(|indices| {
            Answer::Choices(indices.into_iter().map(|idx| question.options[idx].clone()).collect())
        }))
    }

    fn ask_confirm(&self, question: &QuestionDefinition) -> dialoguer::Result<Option<Answer>> {
        let default = question
            .default
            .as_deref()
            .map(|d| matches!(d.to_lowercase().as_str(), "true" | "yes" | "y"))
            .unwrap_or(false);
        let answer = Confirm::new().with_prompt(&question.message).default(default).interact_opt()?;
        Ok(answer.map(Answer::Bool))
    }
}

impl Interaction for TerminalInteraction {
    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm(&mut self, message: &str, default: bool) -> Option<bool> {
        if !self.interactive {
            return Some(false);
        }
        match Confirm::new().with_prompt(message).default(default).interact_opt() {
            Ok(answer) => answer,
            Err(e) => {
                debug!("Confirm prompt failed: {}", e);
                None
            }
        }
    }

    fn ask(&mut self, question: &QuestionDefinition) -> Option<Answer> {
        if !self.interactive {
            return None;
        }

        let result = match question.kind {
            QuestionKind::Radio if !question.options.is_empty() => self.ask_select(question),
            QuestionKind::Checkbox if !question.options.is_empty() => self.ask_multi(question),
            QuestionKind::Confirm => self.ask_confirm(question),
            _ => self.ask_text(question).map(|text| Some(Answer::Text(text))),
        };

        match result {
            Ok(answer) => answer,
            Err(e) => {
                debug!("Question prompt failed: {}", e);
                None
            }
        }
    }

    fn tweak_instruction(&mut self) -> Option<String> {
        if !self.interactive {
            return None;
        }
        Input::<String>::new()
            .with_prompt("Tweak? (Enter to accept, or describe your change)")
            .allow_empty(true)
            .interact_text()
            .ok()
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn display(&mut self, prompt: &str, is_refined: bool) {
        let title = if is_refined { "Refined Prompt" } else { "Your Prompt" };
        eprintln!("\n--- {title} ---");
        println!("{prompt}");
        eprintln!("{}\n", "-".repeat(title.len() + 8));
    }
}
