//! Interactive loop

use super::commands::history::render_history;
use super::commands::refine::RefineSession;
use anyhow::Result;
use promptheus_core::pipeline::Interaction;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use tracing::{debug, warn};

const RECENT_LIMIT: usize = 20;

/// What a line typed at the REPL asks for
#[derive(Debug, PartialEq)]
pub enum ReplInput {
    Exit,
    Empty,
    History,
    Load(usize),
    BadIndex,
    ClearHistory,
    Unknown(String),
    Prompt(String),
}

pub fn parse_input(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    if matches!(line.to_lowercase().as_str(), "exit" | "quit" | "q") {
        return ReplInput::Exit;
    }
    if !line.starts_with(':') {
        return ReplInput::Prompt(line.to_string());
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match command.as_str() {
        ":history" => ReplInput::History,
        ":clear-history" => ReplInput::ClearHistory,
        ":load" if !arg.is_empty() => match arg.parse() {
            Ok(index) => ReplInput::Load(index),
            Err(_) => ReplInput::BadIndex,
        },
        _ => ReplInput::Unknown(command),
    }
}

/// Read prompts until the user exits or input ends
pub async fn interactive_mode(session: &RefineSession, io: &mut dyn Interaction) -> Result<()> {
    io.notify("Welcome to Promptheus Interactive Mode!");
    io.notify(&format!("Using provider: {} | Model: {}", session.provider.name(), session.provider.model()));
    io.notify("Type 'exit' or 'quit' to exit, ':history' to view history\n");

    let mut editor = Editor::<()>::new()?;
    let history_file = session.history.prompt_history_file();
    if history_file.exists() {
        if let Err(e) = editor.load_history(&history_file) {
            warn!("Failed to load prompt history: {}", e);
        }
    }

    let mut prompt_count = 1;
    loop {
        let line = match editor.readline(&format!("promptheus [{prompt_count}]> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                io.notify("\nExiting...");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let prompt = match parse_input(&line) {
            ReplInput::Exit => {
                io.notify("Goodbye!");
                break;
            }
            ReplInput::Empty => continue,
            ReplInput::History => {
                let entries = session.history.get_recent(RECENT_LIMIT);
                if entries.is_empty() {
                    io.notify("No history entries found.");
                } else {
                    io.notify(&render_history(&entries));
                    io.notify("Use ':load <number>' to load a prompt from history");
                }
                continue;
            }
            ReplInput::Load(index) => match session.history.get_by_index(index) {
                Some(entry) => {
                    io.notify(&format!("✓ Loaded prompt #{index} from history"));
                    entry.original_prompt
                }
                None => {
                    io.notify(&format!("No history entry found at index {index}"));
                    continue;
                }
            },
            ReplInput::BadIndex => {
                io.notify("Invalid history index. Use ':load <number>'");
                continue;
            }
            ReplInput::ClearHistory => {
                if io.confirm("Are you sure you want to clear all history?", false) == Some(true) {
                    match session.history.clear() {
                        Ok(()) => io.notify("✓ History cleared"),
                        Err(e) => io.notify(&format!("Failed to clear history: {e}")),
                    }
                }
                continue;
            }
            ReplInput::Unknown(command) => {
                io.notify(&format!("Unknown command: {command}"));
                io.notify("Available commands: :history, :load <number>, :clear-history");
                continue;
            }
            ReplInput::Prompt(prompt) => prompt,
        };

        editor.add_history_entry(prompt.as_str());
        io.notify("");
        if session.run(&prompt, io).await.is_some() {
            prompt_count += 1;
        } else {
            debug!("Prompt run produced no result");
        }
        io.notify("");
    }

    Ok(())
}
