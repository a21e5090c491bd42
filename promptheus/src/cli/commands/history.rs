//! History command

use crate::cli::app::HistoryArgs;
use anyhow::{Context, Result};
use chrono::DateTime;
use dialoguer::Confirm;
use promptheus_core::{HistoryEntry, PromptHistory};
use std::fmt::Write;
use std::path::Path;

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

fn short_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.format("%m-%d %H:%M").to_string(),
        Err(_) => timestamp.chars().skip(5).take(11).collect(),
    }
}

/// Numbered listing, newest first, as `:load` expects
pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut out = String::from("Prompt History\n");
    for (idx, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {}  {:<10}  {}\n                          -> {}",
            idx + 1,
            short_timestamp(&entry.timestamp),
            entry.task_type.as_deref().unwrap_or("unknown"),
            preview(&entry.original_prompt),
            preview(&entry.refined_prompt)
        );
    }
    out
}

pub fn execute(args: HistoryArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let history = PromptHistory::new(config.history_dir());

    if args.clear {
        let confirmed = Confirm::new()
            .with_prompt("Are you sure you want to clear all history?")
            .default(false)
            .interact_opt()
            .context("Failed to read confirmation")?;
        if confirmed == Some(true) {
            history.clear()?;
            eprintln!("✓ History cleared");
        } else {
            eprintln!("Cancelled");
        }
        return Ok(());
    }

    let entries = history.get_recent(args.limit);
    if entries.is_empty() {
        eprintln!("No history entries found.");
        return Ok(());
    }

    println!("{}", render_history(&entries));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(original: &str, task_type: Option<&str>) -> HistoryEntry {
        HistoryEntry {
            timestamp: "2025-03-04T10:15:00+01:00".to_string(),
            original_prompt: original.to_string(),
            refined_prompt: "refined".to_string(),
            task_type: task_type.map(String::from),
        }
    }

    #[test]
    fn test_render_history() {
        let long = "x".repeat(80);
        let rendered = render_history(&[entry("first\nline", Some("analysis")), entry(&long, None)]);

        assert!(rendered.starts_with("Prompt History\n"));
        assert!(rendered.contains("  1  03-04 10:15  analysis    first line"));
        assert!(rendered.contains("  2  03-04 10:15  unknown"));
        assert!(rendered.contains(&format!("{}...", "x".repeat(60))));
        assert!(rendered.contains("-> refined"));
    }

    #[test]
    fn test_short_timestamp_fallback() {
        assert_eq!(short_timestamp("2025-03-04 10:15:00"), "03-04 10:15");
    }
}
