//! Prompt history storage
//!
//! Entries live in `history.json` as a pretty-printed array, oldest first.
//! Original prompts are also appended to `prompt_history.txt`, one per line,
//! for line-editor recall.

use crate::questions::TaskType;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

const HISTORY_FILE: &str = "history.json";
const PROMPT_HISTORY_FILE: &str = "prompt_history.txt";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single refinement run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// RFC 3339 local time
    pub timestamp: String,
    pub original_prompt: String,
    pub refined_prompt: String,
    #[serde(default)]
    pub task_type: Option<String>,
}

/// Manages prompt history storage and retrieval
#[derive(Debug, Clone)]
pub struct PromptHistory {
    history_dir: PathBuf,
}

impl PromptHistory {
    pub fn new(history_dir: impl Into<PathBuf>) -> Self {
        Self { history_dir: history_dir.into() }
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    fn history_file(&self) -> PathBuf {
        self.history_dir.join(HISTORY_FILE)
    }

    /// File holding one escaped original prompt per line
    pub fn prompt_history_file(&self) -> PathBuf {
        self.history_dir.join(PROMPT_HISTORY_FILE)
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> HistoryError + '_ {
        move |source| HistoryError::Io { path: path.to_path_buf(), source }
    }

    pub fn save_entry(
        &self,
        original_prompt: &str,
        refined_prompt: &str,
        task_type: Option<TaskType>,
    ) -> Result<HistoryEntry, HistoryError> {
        fs::create_dir_all(&self.history_dir).map_err(Self::io_error(&self.history_dir))?;

        let entry = HistoryEntry {
            timestamp: Local::now().to_rfc3339(),
            original_prompt: original_prompt.to_string(),
            refined_prompt: refined_prompt.to_string(),
            task_type: task_type.map(|t| t.to_string()),
        };

        let mut entries = self.load();
        entries.push(entry.clone());

        let path = self.history_file();
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(&path, json).map_err(Self::io_error(&path))?;

        self.append_prompt_line(original_prompt)?;
        debug!("Saved history entry: {}", entry.timestamp);
        Ok(entry)
    }

    fn append_prompt_line(&self, prompt: &str) -> Result<(), HistoryError> {
        let path = self.prompt_history_file();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(Self::io_error(&path))?;
        writeln!(file, "{}", prompt.replace('\n', "\\n")).map_err(Self::io_error(&path))
    }

    /// All entries, oldest first. Unreadable files load as empty.
    fn load(&self) -> Vec<HistoryEntry> {
        let path = self.history_file();
        if !path.exists() {
            return Vec::new();
        }

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));

        match parsed {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load history from {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Most recent `limit` entries, newest first; 0 means all of them
    pub fn get_recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.load();
        let skip = if limit == 0 { 0 } else { entries.len().saturating_sub(limit) };
        entries.into_iter().skip(skip).rev().collect()
    }

    /// Every entry, newest first
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        self.load().into_iter().rev().collect()
    }

    /// 1-based index where 1 is the newest entry
    pub fn get_by_index(&self, index: usize) -> Option<HistoryEntry> {
        if index == 0 {
            return None;
        }
        self.get_all().into_iter().nth(index - 1)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        for path in [self.history_file(), self.prompt_history_file()] {
            if path.exists() {
                fs::remove_file(&path).map_err(Self::io_error(&path))?;
            }
        }
        info!("History cleared");
        Ok(())
    }
}
