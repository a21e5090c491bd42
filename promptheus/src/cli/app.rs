use super::commands::telemetry::TelemetryCommand;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "promptheus",
    version,
    about = "Promptheus - AI-powered prompt refinement",
    long_about = "Promptheus refines rough prompts into precise ones. It asks clarifying questions when a task needs them, merges your answers, and lets you tweak the result.",
    after_help = "Examples:
  promptheus \"Write a blog post\"          Refine once and exit
  promptheus                               Interactive mode
  promptheus -q \"Analyze data.csv\"        Skip all questions
  promptheus -r \"Explore this codebase\"   Force questions for analysis tasks
  promptheus @prompt.txt                   Read the prompt from a file
  cat prompt.txt | promptheus              Read the prompt from stdin
  promptheus history --limit 5             Show recent history"
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub refine: RefineArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags for refining a prompt
#[derive(Args, Debug, Clone, Default)]
pub struct RefineArgs {
    /// Prompt to refine. Use @FILE to read it from a file.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// LLM provider to use (overrides config)
    #[arg(long)]
    pub provider: Option<String>,

    /// Specific model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Use static questions instead of generated ones
    #[arg(long = "static", visible_alias = "mvp")]
    pub static_questions: bool,

    /// Skip all questions and return the prompt as-is
    #[arg(short, long)]
    pub quick: bool,

    /// Force clarifying questions even for analysis tasks
    #[arg(short, long)]
    pub refine: bool,

    /// Copy the refined prompt to the clipboard
    #[arg(short, long)]
    pub copy: bool,

    /// Open the refined prompt in $EDITOR
    #[arg(short, long)]
    pub edit: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// View and manage prompt history
    History(HistoryArgs),

    /// List models available from each provider
    #[command(name = "list-models")]
    ListModels(ListModelsArgs),

    /// Check API keys and optionally test connections
    Validate(ValidateArgs),

    /// Print a .env template for one or more providers
    Template(TemplateArgs),

    /// Inspect local usage telemetry
    Telemetry(TelemetryCommand),
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Clear all history
    #[arg(long)]
    pub clear: bool,

    /// Number of entries to display (0 for all)
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct ListModelsArgs {
    /// Comma-separated providers to query (default: all)
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,

    /// Models shown per provider, 0 for all
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Include embedding, image and audio models
    #[arg(long)]
    pub include_nontext: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Make a small API call to each configured provider
    #[arg(long)]
    pub test_connection: bool,

    /// Comma-separated providers to check (default: all)
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Comma-separated provider names
    pub providers: String,
}
