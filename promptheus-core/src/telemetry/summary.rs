//! Aggregation of recorded telemetry

use super::{EventType, TelemetryEvent};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::debug;

const UNKNOWN: &str = "unknown";

/// Load every parseable event. Blank and malformed lines are skipped.
pub fn read_telemetry_events(path: &Path) -> Vec<TelemetryEvent> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Telemetry file {} not readable: {}", path.display(), e);
            return Vec::new();
        }
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!("Skipping malformed telemetry line: {}", e);
                None
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Run counts and the samples behind the averages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetrics {
    pub total_runs: usize,
    pub successful_runs: usize,
    pub total_latencies: Vec<f64>,
    pub llm_latencies: Vec<f64>,
    pub input_chars: Vec<f64>,
    pub output_chars: Vec<f64>,
}

impl RunMetrics {
    fn add(&mut self, event: &TelemetryEvent) {
        self.total_runs += 1;
        if event.success == Some(true) {
            self.successful_runs += 1;
        }
        self.total_latencies.extend(event.processing_latency_sec);
        self.llm_latencies.extend(event.llm_latency_sec);
        self.input_chars.extend(event.input_chars.map(|c| c as f64));
        self.output_chars.extend(event.output_chars.map(|c| c as f64));
    }

    /// Percentage of runs that succeeded
    pub fn success_rate(&self) -> f64 {
        percent(self.successful_runs, self.total_runs)
    }

    pub fn avg_total_latency(&self) -> Option<f64> {
        mean(&self.total_latencies)
    }

    pub fn median_total_latency(&self) -> Option<f64> {
        median(&self.total_latencies)
    }

    pub fn avg_llm_latency(&self) -> Option<f64> {
        mean(&self.llm_latencies)
    }

    pub fn median_llm_latency(&self) -> Option<f64> {
        median(&self.llm_latencies)
    }

    pub fn avg_input_chars(&self) -> Option<f64> {
        mean(&self.input_chars)
    }

    pub fn avg_output_chars(&self) -> Option<f64> {
        mean(&self.output_chars)
    }
}

/// How often clarifying questions were asked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionMetrics {
    pub total_runs: usize,
    pub runs_with_questions: usize,
    /// Counts for runs that asked at least one question
    pub question_counts: Vec<u64>,
}

impl QuestionMetrics {
    fn add(&mut self, count: u64) {
        self.total_runs += 1;
        if count > 0 {
            self.runs_with_questions += 1;
            self.question_counts.push(count);
        }
    }

    pub fn percentage_with_questions(&self) -> f64 {
        percent(self.runs_with_questions, self.total_runs)
    }

    pub fn avg_questions_when_present(&self) -> Option<f64> {
        let counts: Vec<f64> = self.question_counts.iter().map(|&c| c as f64).collect();
        mean(&counts)
    }

    /// Runs bucketed by question count: `0`, `1-3`, `4-7`, `8+`
    pub fn distribution(&self) -> [(&'static str, usize); 4] {
        let bucket = |lo: u64, hi: u64| self.question_counts.iter().filter(|&&c| c >= lo && c <= hi).count();
        [
            ("0", self.total_runs.saturating_sub(self.runs_with_questions)),
            ("1-3", bucket(1, 3)),
            ("4-7", bucket(4, 7)),
            ("8+", bucket(8, u64::MAX)),
        ]
    }
}

/// Everything the summary command reports
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySummary {
    pub overall: RunMetrics,
    pub by_interface: BTreeMap<String, RunMetrics>,
    pub questions: QuestionMetrics,
    pub by_provider: BTreeMap<(String, String), RunMetrics>,
    pub error_messages: BTreeMap<String, usize>,
    pub error_by_provider: BTreeMap<(String, String), usize>,
}

fn provider_key(event: &TelemetryEvent) -> (String, String) {
    (
        event.provider.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        event.model.clone().unwrap_or_else(|| UNKNOWN.to_string()),
    )
}

pub fn aggregate_metrics(events: &[TelemetryEvent]) -> TelemetrySummary {
    let mut summary = TelemetrySummary::default();

    for event in events {
        match event.event_type {
            EventType::PromptRun => {
                summary.overall.add(event);
                let interface = event.interface.clone().unwrap_or_else(|| UNKNOWN.to_string());
                summary.by_interface.entry(interface).or_default().add(event);
                summary.by_provider.entry(provider_key(event)).or_default().add(event);
                if let Some(count) = event.clarifying_questions_count {
                    summary.questions.add(count);
                }
            }
            EventType::ProviderError => {
                let message = event.sanitized_error.clone().unwrap_or_else(|| "unknown error".to_string());
                *summary.error_messages.entry(message).or_default() += 1;
                *summary.error_by_provider.entry(provider_key(event)).or_default() += 1;
            }
            EventType::Unknown => {}
        }
    }

    summary
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    value.map(|v| format!("{v:.2}{suffix}")).unwrap_or_else(|| "-".to_string())
}

impl TelemetrySummary {
    pub fn is_empty(&self) -> bool {
        self.overall.total_runs == 0 && self.error_messages.is_empty()
    }

    pub fn total_errors(&self) -> usize {
        self.error_messages.values().sum()
    }

    /// Plain-text report for the terminal
    pub fn render(&self) -> String {
        let mut out = String::new();
        let overall = &self.overall;

        let _ = writeln!(out, "Telemetry Summary\n");
        let _ = writeln!(out, "Overview");
        let _ = writeln!(out, "  Total Runs:         {}", overall.total_runs);
        let _ = writeln!(out, "  Success Rate:       {:.1}%", overall.success_rate());
        let _ = writeln!(out, "  Avg Latency:        {}", fmt_opt(overall.avg_total_latency(), "s"));
        let _ = writeln!(out, "  Median Latency:     {}", fmt_opt(overall.median_total_latency(), "s"));
        let _ = writeln!(out, "  Avg LLM Latency:    {}", fmt_opt(overall.avg_llm_latency(), "s"));
        let _ = writeln!(out, "  Avg Input Chars:    {}", fmt_opt(overall.avg_input_chars(), ""));
        let _ = writeln!(out, "  Avg Output Chars:   {}", fmt_opt(overall.avg_output_chars(), ""));

        if !self.by_interface.is_empty() {
            let _ = writeln!(out, "\nBy Interface");
            for (interface, metrics) in &self.by_interface {
                let _ = writeln!(
                    out,
                    "  {:<12} runs={:<5} success={:.1}% avg_latency={}",
                    interface,
                    metrics.total_runs,
                    metrics.success_rate(),
                    fmt_opt(metrics.avg_total_latency(), "s")
                );
            }
        }

        let questions = &self.questions;
        let _ = writeln!(out, "\nClarifying Questions");
        let _ = writeln!(
            out,
            "  Runs with questions: {} of {} ({:.1}%)",
            questions.runs_with_questions,
            questions.total_runs,
            questions.percentage_with_questions()
        );
        let _ = writeln!(out, "  Avg when asked:      {}", fmt_opt(questions.avg_questions_when_present(), ""));
        for (bucket, count) in questions.distribution() {
            let _ = writeln!(out, "  {bucket:<4} {count}");
        }

        if !self.by_provider.is_empty() {
            let _ = writeln!(out, "\nProviders / Models");
            for ((provider, model), metrics) in &self.by_provider {
                let _ = writeln!(
                    out,
                    "  {provider} / {model}: runs={} success={:.1}% avg_latency={}",
                    metrics.total_runs,
                    metrics.success_rate(),
                    fmt_opt(metrics.avg_total_latency(), "s")
                );
            }
        }

        if !self.error_messages.is_empty() {
            let _ = writeln!(out, "\nProvider Errors");
            let _ = writeln!(out, "  Total Errors: {}", self.total_errors());
            for ((provider, model), count) in &self.error_by_provider {
                let _ = writeln!(out, "  {provider} / {model}: {count}");
            }
            let mut messages: Vec<_> = self.error_messages.iter().collect();
            messages.sort_by(|a, b| b.1.cmp(a.1));
            for (message, count) in messages {
                let _ = writeln!(out, "  {count}x {message}");
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(interface: Option<&str>, provider: Option<(&str, &str)>, success: Option<bool>) -> TelemetryEvent {
        TelemetryEvent {
            event_type: EventType::PromptRun,
            interface: interface.map(String::from),
            provider: provider.map(|p| p.0.to_string()),
            model: provider.map(|p| p.1.to_string()),
            success,
            ..Default::default()
        }
    }

    fn error(provider: &str, model: &str, message: &str) -> TelemetryEvent {
        TelemetryEvent {
            event_type: EventType::ProviderError,
            provider: Some(provider.into()),
            model: Some(model.into()),
            sanitized_error: Some(message.into()),
            success: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_aggregation() {
        let mut first = run(Some("cli"), Some(("anthropic", "claude-3-haiku")), Some(true));
        first.processing_latency_sec = Some(2.5);
        first.llm_latency_sec = Some(2.0);
        first.input_chars = Some(100);
        first.output_chars = Some(500);
        first.clarifying_questions_count = Some(0);
        let mut second = first.clone();
        second.processing_latency_sec = Some(3.0);
        second.llm_latency_sec = Some(2.5);
        second.input_chars = Some(150);
        second.output_chars = Some(600);
        second.clarifying_questions_count = Some(2);

        let summary = aggregate_metrics(&[first, second]);
        assert_eq!(summary.overall.total_runs, 2);
        assert_eq!(summary.overall.success_rate(), 100.0);
        assert_eq!(summary.overall.avg_total_latency(), Some(2.75));
        assert_eq!(summary.overall.avg_llm_latency(), Some(2.25));
        assert_eq!(summary.overall.avg_input_chars(), Some(125.0));
        assert_eq!(summary.overall.avg_output_chars(), Some(550.0));
        assert_eq!(summary.by_interface["cli"].total_runs, 2);
        assert_eq!(summary.questions.runs_with_questions, 1);
        assert_eq!(summary.questions.percentage_with_questions(), 50.0);
        assert_eq!(summary.questions.avg_questions_when_present(), Some(2.0));
        let key = ("anthropic".to_string(), "claude-3-haiku".to_string());
        assert_eq!(summary.by_provider[&key].total_runs, 2);
    }

    #[test]
    fn test_missing_fields_fall_back_to_unknown() {
        let summary = aggregate_metrics(&[run(None, None, None), run(None, None, Some(true))]);
        assert_eq!(summary.overall.total_runs, 2);
        assert_eq!(summary.overall.successful_runs, 1);
        assert!(summary.overall.avg_total_latency().is_none());
        assert!(summary.overall.avg_input_chars().is_none());
        assert!(summary.by_interface.contains_key("unknown"));
        assert!(summary.by_provider.contains_key(&("unknown".to_string(), "unknown".to_string())));
        assert_eq!(summary.questions.total_runs, 0);
    }

    #[test]
    fn test_question_distribution() {
        let events: Vec<_> = [0, 0, 2, 5, 10]
            .into_iter()
            .map(|count| TelemetryEvent {
                event_type: EventType::PromptRun,
                clarifying_questions_count: Some(count),
                ..Default::default()
            })
            .collect();

        let summary = aggregate_metrics(&events);
        assert_eq!(summary.questions.distribution(), [("0", 2), ("1-3", 1), ("4-7", 1), ("8+", 1)]);
    }

    #[test]
    fn test_provider_errors() {
        let events = [
            error("anthropic", "claude-3", "API key invalid"),
            error("anthropic", "claude-3", "API key invalid"),
            error("google", "gemini", "Rate limit exceeded"),
        ];
        let summary = aggregate_metrics(&events);
        assert_eq!(summary.overall.total_runs, 0);
        assert_eq!(summary.error_messages["API key invalid"], 2);
        assert_eq!(summary.error_messages["Rate limit exceeded"], 1);
        assert_eq!(summary.error_by_provider[&("anthropic".to_string(), "claude-3".to_string())], 2);
        assert_eq!(summary.total_errors(), 3);
    }

    #[test]
    fn test_metric_helpers() {
        let metrics = RunMetrics {
            total_runs: 3,
            successful_runs: 2,
            total_latencies: vec![1.0, 2.0, 3.0, 4.0],
            llm_latencies: vec![0.8, 1.8, 2.8],
            ..Default::default()
        };
        assert!((metrics.success_rate() - 66.666).abs() < 0.01);
        assert_eq!(metrics.median_total_latency(), Some(2.5));
        assert_eq!(metrics.median_llm_latency(), Some(1.8));
        assert_eq!(RunMetrics::default().success_rate(), 0.0);
        assert!(RunMetrics::default().median_total_latency().is_none());

        let questions = QuestionMetrics { total_runs: 10, runs_with_questions: 6, question_counts: vec![1, 2, 3, 5, 6, 10] };
        assert_eq!(questions.distribution(), [("0", 4), ("1-3", 3), ("4-7", 2), ("8+", 1)]);
        assert!(QuestionMetrics::default().avg_questions_when_present().is_none());
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        fs::write(
            &path,
            "{\"event_type\": \"prompt_run\", \"session_id\": \"s1\"}\nthis is not json\n\
             {\"event_type\": \"prompt_run\", \"session_id\": \"s2\"}\n\n\
             {\"event_type\": \"prompt_run\", \"session_id\": \"s3\"}\n",
        )
        .unwrap();

        let events = read_telemetry_events(&path);
        let ids: Vec<_> = events.iter().filter_map(|e| e.session_id.as_deref()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);

        assert!(read_telemetry_events(&dir.path().join("missing.jsonl")).is_empty());
    }

    #[test]
    fn test_render_sections() {
        let mut cli = run(Some("cli"), Some(("anthropic", "claude-3-haiku")), Some(true));
        cli.clarifying_questions_count = Some(0);
        let web = run(Some("web"), Some(("google", "gemini-2.5-flash")), Some(true));
        let summary = aggregate_metrics(&[cli, web, error("openai", "gpt-4", "API key invalid")]);

        let text = summary.render();
        for needle in [
            "Telemetry Summary",
            "Overview",
            "Total Runs:         2",
            "Success Rate:       100.0%",
            "By Interface",
            "Clarifying Questions",
            "Providers / Models",
            "gemini-2.5-flash",
            "Provider Errors",
            "Total Errors: 1",
            "API key invalid",
        ] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
        assert!(!summary.is_empty());
        assert!(TelemetrySummary::default().is_empty());
    }
}
