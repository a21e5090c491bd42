// Command implementations

pub mod history;
pub mod list_models;
pub mod refine;
pub mod telemetry;
pub mod template;
pub mod validate;

use anyhow::{Context, Result};
use promptheus_core::Config;
use std::path::Path;

/// Load configuration from `path`, or from the default location and the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}
