//! Telemetry inspection command

use anyhow::Result;
use clap::{Args, Subcommand};
use promptheus_core::telemetry::{aggregate_metrics, read_telemetry_events};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct TelemetryCommand {
    #[command(subcommand)]
    pub subcommand: TelemetrySubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TelemetrySubcommand {
    /// Summarize recorded runs and provider errors
    Summary {
        /// Telemetry file (default: PROMPTHEUS_TELEMETRY_FILE or <history dir>/telemetry.jsonl)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// The report for `path`, or a notice when nothing was recorded
pub fn summary_text(path: &Path) -> String {
    let events = read_telemetry_events(path);
    let summary = aggregate_metrics(&events);
    if summary.is_empty() {
        return format!("No telemetry data found at {}", path.display());
    }
    summary.render()
}

pub fn execute(command: TelemetryCommand, config_path: Option<&Path>) -> Result<()> {
    match command.subcommand {
        TelemetrySubcommand::Summary { file } => {
            let path = match file {
                Some(path) => path,
                None => super::load_config(config_path)?.telemetry_path(),
            };
            println!("{}", summary_text(&path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptheus_core::telemetry::{PromptRun, TelemetryRecorder};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let text = summary_text(&dir.path().join("none.jsonl"));
        assert!(text.starts_with("No telemetry data found"));
    }

    #[test]
    fn test_summary_of_recorded_runs() {
        let dir = TempDir::new().unwrap();
        let recorder = TelemetryRecorder::new(dir.path().join("telemetry.jsonl"), true, "cli");
        recorder.record_prompt_run(PromptRun {
            provider: "Groq".into(),
            model: "llama-3.1-8b-instant".into(),
            success: true,
            ..Default::default()
        });

        let text = summary_text(recorder.path());
        assert!(text.contains("Total Runs:         1"));
        assert!(text.contains("Groq / llama-3.1-8b-instant"));
    }
}
