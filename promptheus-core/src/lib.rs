//! Core functionality for promptheus
//!
//! Provider configuration, the LLM clients, the clarifying-question
//! pipeline, history and telemetry storage, and the library API used by
//! the command-line front-end.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod questions;
pub mod telemetry;

pub use api::{
    generate_questions, list_available_models, list_available_providers, refine_prompt,
    refine_with_answers, tweak_prompt, GeneratedQuestions, RefineOptions, RefinedPrompt, Refinement,
};
pub use config::{Config, ConfigError};
pub use error::PromptheusError;
pub use history::{HistoryEntry, PromptHistory};
pub use llm::{create_provider, LLMError, LLMProvider};
pub use pipeline::{process_single_prompt, Interaction, PromptOutcome, RunOptions};
pub use questions::{Answer, Answers, QuestionDefinition, QuestionMapping, TaskType};
pub use telemetry::{PromptRun, TelemetryRecorder};
