//! Prompt refinement: single-shot and interactive

use crate::cli::app::RefineArgs;
use crate::cli::repl;
use crate::cli::terminal::{stdin_is_interactive, TerminalInteraction};
use anyhow::{bail, Context, Result};
use promptheus_core::llm::{create_provider, LLMProvider};
use promptheus_core::pipeline::{process_single_prompt, Interaction, PromptOutcome, RunOptions};
use promptheus_core::telemetry::{PromptRun, TelemetryRecorder};
use promptheus_core::PromptHistory;
use regex_utils::secrets;
use std::io::{Read, Write};
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the prompt came from
#[derive(Debug, Clone, PartialEq)]
pub enum PromptSource {
    File(String),
    Stdin,
    Argument,
}

fn read_prompt_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Couldn't read prompt file {}", path.display()))?;
    Ok(content.trim().to_string())
}

/// Pick the prompt from `-f`, an `@file` argument, piped stdin, or the
/// positional argument, in that order.
pub fn resolve_prompt(
    args: &RefineArgs,
    stdin_piped: bool,
    read_stdin: impl FnOnce() -> std::io::Result<String>,
) -> Result<Option<(String, PromptSource)>> {
    if let Some(path) = &args.file {
        let prompt = read_prompt_file(path)?;
        return Ok(Some((prompt, PromptSource::File(path.display().to_string()))));
    }

    if let Some(filename) = args.prompt.as_deref().and_then(|p| p.strip_prefix('@')) {
        let prompt = read_prompt_file(Path::new(filename))?;
        return Ok(Some((prompt, PromptSource::File(filename.to_string()))));
    }

    if stdin_piped {
        let prompt = read_stdin().context("Failed to read prompt from stdin")?;
        let prompt = prompt.trim();
        if !prompt.is_empty() {
            return Ok(Some((prompt.to_string(), PromptSource::Stdin)));
        }
    }

    Ok(args
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| (p.to_string(), PromptSource::Argument)))
}

/// Everything needed to run prompts through the pipeline
pub struct RefineSession {
    pub provider: Box<dyn LLMProvider>,
    pub options: RunOptions,
    pub history: PromptHistory,
    pub telemetry: TelemetryRecorder,
    pub copy: bool,
    pub edit: bool,
}

impl RefineSession {
    /// Run one prompt, then save history, record telemetry and hand the
    /// result to the clipboard or editor when asked.
    pub async fn run(&self, prompt: &str, io: &mut dyn Interaction) -> Option<PromptOutcome> {
        let started = Instant::now();
        let outcome = process_single_prompt(self.provider.as_ref(), prompt, &self.options, io).await;
        self.record(prompt, started, outcome.as_ref());

        let outcome = outcome?;
        match self.history.save_entry(prompt, &outcome.final_prompt, Some(outcome.task_type)) {
            Ok(_) => debug!("Saved prompt to history"),
            Err(e) => warn!("Failed to save prompt to history: {}", secrets::sanitize(&e.to_string())),
        }

        if self.copy {
            copy_to_clipboard(&outcome.final_prompt, io);
        }
        if self.edit {
            open_in_editor(&outcome.final_prompt, io);
        }
        Some(outcome)
    }

    fn record(&self, prompt: &str, started: Instant, outcome: Option<&PromptOutcome>) {
        self.telemetry.record_prompt_run(PromptRun {
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            task_type: outcome.map(|o| o.task_type),
            processing_latency: started.elapsed(),
            llm_latency: outcome.map(|o| o.llm_latency),
            input_chars: prompt.chars().count(),
            output_chars: outcome.map(|o| o.final_prompt.chars().count()).unwrap_or(0),
            questions_count: outcome.map(|o| o.questions_asked).unwrap_or(0),
            skip_questions: outcome.map(|o| o.skip_questions).unwrap_or(false),
            refine_mode: self.options.refine,
            success: outcome.is_some(),
        });
    }
}

fn copy_to_clipboard(text: &str, io: &mut dyn Interaction) {
    let result = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text));
    match result {
        Ok(()) => io.notify("Copied to clipboard!"),
        Err(e) => {
            let sanitized = secrets::sanitize(&e.to_string());
            warn!("Clipboard copy failed: {}", sanitized);
            io.notify(&format!("Warning: Failed to copy to clipboard: {sanitized}"));
        }
    }
}

fn open_in_editor(text: &str, io: &mut dyn Interaction) {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
    if let Err(e) = edit_with(&editor, text) {
        let sanitized = secrets::sanitize(&e.to_string());
        warn!("Opening editor failed: {}", sanitized);
        io.notify(&format!("Warning: Failed to open editor: {sanitized}"));
        return;
    }
    io.notify(&format!("Opened in {editor}"));
}

fn edit_with(editor: &str, text: &str) -> Result<()> {
    let mut file = tempfile::Builder::new().prefix("promptheus-").suffix(".txt").tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("EDITOR is empty");
    };
    let status = Command::new(program).args(parts).arg(file.path()).status()?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

pub async fn execute(args: RefineArgs, verbose: u8, config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    let mut io = TerminalInteraction::new(stdin_is_interactive());

    if let Some(provider) = &args.provider {
        config.set_provider(provider)?;
    }
    if let Some(model) = &args.model {
        config.set_model(model);
    }

    let valid = config.validate();
    for message in config.consume_status_messages() {
        io.notify(&format!("● {message}"));
    }
    if !valid {
        for message in config.consume_error_messages() {
            io.notify(&format!("✗ {message}"));
        }
        bail!("Configuration invalid");
    }

    let prompt = resolve_prompt(&args, !stdin_is_interactive(), || {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    })?;

    let provider = create_provider(&config.provider(), &config, None)
        .map_err(|e| anyhow::anyhow!("Couldn't connect to AI provider: {}", e.sanitized()))?;
    info!("Using provider {} with model {}", provider.name(), provider.model());

    let session = RefineSession {
        provider,
        options: RunOptions {
            static_questions: args.static_questions,
            quick: args.quick,
            refine: args.refine,
            debug: verbose > 0 || config.debug_enabled(),
        },
        history: PromptHistory::new(config.history_dir()),
        telemetry: TelemetryRecorder::from_config(&config, "cli"),
        copy: args.copy,
        edit: args.edit,
    };

    match prompt {
        Some((prompt, source)) => {
            match source {
                PromptSource::File(name) => io.notify(&format!("✓ Loaded prompt from {name}")),
                PromptSource::Stdin => io.notify("✓ Got prompt from stdin"),
                PromptSource::Argument => {}
            }
            io.notify(&format!(
                "Using provider: {} | Model: {}\n",
                session.provider.name(),
                session.provider.model()
            ));
            session.run(&prompt, &mut io).await;
            Ok(())
        }
        None => repl::interactive_mode(&session, &mut io).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(prompt: Option<&str>, file: Option<PathBuf>) -> RefineArgs {
        RefineArgs { prompt: prompt.map(String::from), file, ..Default::default() }
    }

    fn no_stdin() -> std::io::Result<String> {
        panic!("stdin should not be read")
    }

    #[test]
    fn test_file_flag_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "  from file \n").unwrap();

        let (prompt, source) = resolve_prompt(&args(Some("positional"), Some(path)), true, no_stdin)
            .unwrap()
            .unwrap();
        assert_eq!(prompt, "from file");
        assert!(matches!(source, PromptSource::File(_)));
    }

    #[test]
    fn test_at_file_argument() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.txt");
        std::fs::write(&path, "at file").unwrap();

        let arg = format!("@{}", path.display());
        let (prompt, _) = resolve_prompt(&args(Some(&arg), None), false, no_stdin).unwrap().unwrap();
        assert_eq!(prompt, "at file");

        assert!(resolve_prompt(&args(Some("@/definitely/missing.txt"), None), false, no_stdin).is_err());
    }

    #[test]
    fn test_stdin_then_positional() {
        let (prompt, source) =
            resolve_prompt(&args(Some("positional"), None), true, || Ok("piped\n".to_string())).unwrap().unwrap();
        assert_eq!((prompt.as_str(), source), ("piped", PromptSource::Stdin));

        let (prompt, source) =
            resolve_prompt(&args(Some("positional"), None), true, || Ok("   ".to_string())).unwrap().unwrap();
        assert_eq!((prompt.as_str(), source), ("positional", PromptSource::Argument));

        assert!(resolve_prompt(&args(None, None), false, no_stdin).unwrap().is_none());
    }
}
