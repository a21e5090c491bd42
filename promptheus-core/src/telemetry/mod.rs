//! Local usage telemetry
//!
//! Each refinement run appends one JSON line to `telemetry.jsonl` next to the
//! history files. Nothing leaves the machine, and a failed write never
//! interrupts the caller.

pub mod summary;

pub use summary::{aggregate_metrics, read_telemetry_events, QuestionMetrics, RunMetrics, TelemetrySummary};

use crate::config::Config;
use crate::questions::TaskType;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_utils::secrets;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

pub const SCHEMA_VERSION: u32 = 1;

/// One id per process so runs from the same session can be grouped
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

pub fn session_id() -> &'static str {
    &SESSION_ID
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PromptRun,
    ProviderError,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single telemetry record.
///
/// Every field is optional on read so older or hand-edited files still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryEvent {
    pub timestamp: Option<String>,
    pub event_type: EventType,
    pub schema_version: Option<u32>,
    pub session_id: Option<String>,
    pub run_id: Option<String>,
    pub interface: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub task_type: Option<String>,
    pub processing_latency_sec: Option<f64>,
    pub llm_latency_sec: Option<f64>,
    pub input_chars: Option<u64>,
    pub output_chars: Option<u64>,
    pub clarifying_questions_count: Option<u64>,
    pub skip_questions: Option<bool>,
    pub refine_mode: Option<bool>,
    pub success: Option<bool>,
    pub sanitized_error: Option<String>,
}

impl TelemetryEvent {
    fn new(event_type: EventType, interface: &str) -> Self {
        Self {
            timestamp: Some(Utc::now().to_rfc3339()),
            event_type,
            schema_version: Some(SCHEMA_VERSION),
            session_id: Some(session_id().to_string()),
            run_id: Some(Uuid::new_v4().to_string()),
            interface: Some(interface.to_string()),
            ..Default::default()
        }
    }
}

/// Measurements from one completed run
#[derive(Debug, Clone, Default)]
pub struct PromptRun {
    pub provider: String,
    pub model: String,
    pub task_type: Option<TaskType>,
    pub processing_latency: Duration,
    pub llm_latency: Option<Duration>,
    pub input_chars: usize,
    pub output_chars: usize,
    pub questions_count: usize,
    pub skip_questions: bool,
    pub refine_mode: bool,
    pub success: bool,
}

/// Appends events to the telemetry file
#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    path: PathBuf,
    enabled: bool,
    interface: String,
}

impl TelemetryRecorder {
    pub fn new(path: impl Into<PathBuf>, enabled: bool, interface: impl Into<String>) -> Self {
        Self { path: path.into(), enabled, interface: interface.into() }
    }

    pub fn from_config(config: &Config, interface: impl Into<String>) -> Self {
        Self::new(config.telemetry_path(), config.telemetry_enabled(), interface)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_prompt_run(&self, run: PromptRun) {
        let mut event = TelemetryEvent::new(EventType::PromptRun, &self.interface);
        event.provider = Some(run.provider);
        event.model = Some(run.model);
        event.task_type = run.task_type.map(|t| t.to_string());
        event.processing_latency_sec = Some(run.processing_latency.as_secs_f64());
        event.llm_latency_sec = run.llm_latency.map(|d| d.as_secs_f64());
        event.input_chars = Some(run.input_chars as u64);
        event.output_chars = Some(run.output_chars as u64);
        event.clarifying_questions_count = Some(run.questions_count as u64);
        event.skip_questions = Some(run.skip_questions);
        event.refine_mode = Some(run.refine_mode);
        event.success = Some(run.success);
        self.record(&event);
    }

    /// Record a provider failure. The message is sanitized before it is written.
    pub fn record_provider_error(&self, provider: &str, model: &str, message: &str) {
        let mut event = TelemetryEvent::new(EventType::ProviderError, &self.interface);
        event.provider = Some(provider.to_string());
        event.model = Some(model.to_string());
        event.success = Some(false);
        event.sanitized_error = Some(secrets::sanitize(message));
        self.record(&event);
    }

    pub fn record(&self, event: &TelemetryEvent) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.append(event) {
            debug!("Failed to write telemetry event: {}", secrets::sanitize(&e.to_string()));
        }
    }

    fn append(&self, event: &TelemetryEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(event)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }
}
