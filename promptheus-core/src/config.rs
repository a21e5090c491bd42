//! Configuration for provider selection and local storage
//!
//! Combines the embedded provider catalog, an optional TOML config file and
//! the process environment. Resolution problems are collected as messages
//! so front-ends can decide how to display them.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const CATALOG_TOML: &str = include_str!("providers.toml");

pub const PROVIDER_ENV: &str = "PROMPTHEUS_PROVIDER";
pub const MODEL_ENV: &str = "PROMPTHEUS_MODEL";
pub const HISTORY_DIR_ENV: &str = "PROMPTHEUS_HISTORY_DIR";
pub const DEBUG_ENV: &str = "PROMPTHEUS_DEBUG";
pub const TELEMETRY_ENABLED_ENV: &str = "PROMPTHEUS_TELEMETRY_ENABLED";
pub const TELEMETRY_FILE_ENV: &str = "PROMPTHEUS_TELEMETRY_FILE";
pub const OPENROUTER_FALLBACK_ENV: &str = "OPENROUTER_FALLBACK_MODEL";

static CATALOG: Lazy<Result<ProviderCatalog, String>> =
    Lazy::new(|| toml::from_str(CATALOG_TOML).map_err(|e| e.to_string()));

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Missing API key for {display_name}. Set {}", env_vars.join(" or "))]
    MissingApiKey { display_name: String, env_vars: Vec<String> },

    #[error("Provider catalog is invalid: {0}")]
    Catalog(String),

    #[error("Failed to read config file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// The embedded provider catalog
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCatalog {
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    pub providers: Vec<ProviderInfo>,
}

/// Static metadata for one provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub display_name: String,
    pub api_key_env: Vec<String>,
    #[serde(default)]
    pub api_key_prefixes: Vec<String>,
    pub base_url: String,
    #[serde(default)]
    pub base_url_env: Option<String>,
    #[serde(default)]
    pub model_env: Option<String>,
    pub default_model: String,
    pub models: Vec<String>,
    #[serde(default)]
    pub example_models: Vec<String>,
    #[serde(default)]
    pub optional_env: Vec<String>,
}

impl ProviderCatalog {
    pub fn get(&self, name: &str) -> Option<&ProviderInfo> {
        let id = self.normalize(name);
        self.providers.iter().find(|p| p.id == id)
    }

    /// Resolve aliases and case
    pub fn normalize(&self, name: &str) -> String {
        let lower = name.trim().to_lowercase();
        self.aliases.get(&lower).cloned().unwrap_or(lower)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Access the parsed provider catalog
pub fn catalog() -> Result<&'static ProviderCatalog, ConfigError> {
    (*CATALOG).as_ref().map_err(|e| ConfigError::Catalog(e.clone()))
}

/// Values read from the optional config file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// `<config dir>/promptheus/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("promptheus").join("config.toml"))
    }
}

/// Everything a provider needs to make calls
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub provider: String,
    pub display_name: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Catalog models, used for fallback ordering
    pub models: Vec<String>,
    pub fallback_model: Option<String>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    provider: Option<String>,
    model: Option<String>,
    file: FileConfig,
    env: HashMap<String, String>,
    status_messages: Vec<String>,
    error_messages: Vec<String>,
}

impl Config {
    /// Load from the process environment and the config file.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_file(path)?,
            None => match FileConfig::default_path() {
                Some(default) if default.exists() => FileConfig::from_file(&default)?,
                _ => FileConfig::default(),
            },
        };
        Ok(Self::with_env(file, std::env::vars()))
    }

    /// Build from an explicit environment snapshot
    pub fn with_env(file: FileConfig, env: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            provider: None,
            model: None,
            file,
            env: env.into_iter().collect(),
            status_messages: Vec::new(),
            error_messages: Vec::new(),
        }
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    /// Explicitly select a provider; takes precedence over every other source
    pub fn set_provider(&mut self, provider: &str) -> Result<(), ConfigError> {
        let catalog = catalog()?;
        let info = catalog
            .get(provider)
            .ok_or_else(|| ConfigError::UnknownProvider(provider.to_string()))?;
        debug!("Provider explicitly set to {}", info.id);
        self.provider = Some(info.id.clone());
        Ok(())
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = Some(model.to_string());
    }

    /// Active provider id: explicit, environment, config file, then auto-detect.
    ///
    /// Falls back to the first catalog provider when nothing is configured.
    pub fn provider(&self) -> String {
        let normalize = |name: &str| match catalog() {
            Ok(catalog) => catalog.normalize(name),
            Err(_) => name.to_lowercase(),
        };

        if let Some(provider) = &self.provider {
            return provider.clone();
        }
        if let Some(provider) = self.env(PROVIDER_ENV) {
            return normalize(provider);
        }
        if let Some(provider) = self.file.provider.as_deref() {
            return normalize(provider);
        }
        if let Some(detected) = self.available_providers().into_iter().next() {
            return detected;
        }

        catalog()
            .ok()
            .and_then(|c| c.providers.first())
            .map(|p| p.id.clone())
            .unwrap_or_else(|| "gemini".to_string())
    }

    /// Active model: explicit, `PROMPTHEUS_MODEL`, provider model var, config file, default
    pub fn model(&self) -> Option<String> {
        if let Some(model) = &self.model {
            return Some(model.clone());
        }
        if let Some(model) = self.env(MODEL_ENV) {
            return Some(model.to_string());
        }

        let info = catalog().ok()?.get(&self.provider())?;
        if let Some(model) = info.model_env.as_deref().and_then(|var| self.env(var)) {
            return Some(model.to_string());
        }
        if let Some(model) = &self.file.model {
            return Some(model.clone());
        }
        Some(info.default_model.clone())
    }

    /// First non-empty API key variable for a provider
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let info = catalog().ok()?.get(provider)?;
        info.api_key_env.iter().find_map(|var| self.env(var)).map(str::to_string)
    }

    pub fn base_url(&self, provider: &str) -> Option<String> {
        let info = catalog().ok()?.get(provider)?;
        let overridden = info.base_url_env.as_deref().and_then(|var| self.env(var));
        Some(overridden.unwrap_or(&info.base_url).trim_end_matches('/').to_string())
    }

    /// Providers whose API key is present, in catalog order
    pub fn available_providers(&self) -> Vec<String> {
        let Ok(catalog) = catalog() else {
            return Vec::new();
        };
        catalog
            .providers
            .iter()
            .filter(|p| p.api_key_env.iter().any(|var| self.env(var).is_some()))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Settings for the active provider
    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        let provider = self.provider();
        let model = self.model();
        self.settings_for(&provider, model.as_deref())
    }

    /// Settings for any catalog provider; `model` overrides its default
    pub fn settings_for(&self, provider: &str, model: Option<&str>) -> Result<ProviderSettings, ConfigError> {
        let info = catalog()?
            .get(provider)
            .ok_or_else(|| ConfigError::UnknownProvider(provider.to_string()))?;

        let api_key = self.api_key(&info.id).ok_or_else(|| ConfigError::MissingApiKey {
            display_name: info.display_name.clone(),
            env_vars: info.api_key_env.clone(),
        })?;

        let model = model
            .map(str::to_string)
            .or_else(|| info.model_env.as_deref().and_then(|var| self.env(var)).map(str::to_string))
            .unwrap_or_else(|| info.default_model.clone());

        Ok(ProviderSettings {
            provider: info.id.clone(),
            display_name: info.display_name.clone(),
            api_key,
            base_url: self.base_url(&info.id).unwrap_or_else(|| info.base_url.clone()),
            model,
            models: info.models.clone(),
            fallback_model: self.env(OPENROUTER_FALLBACK_ENV).map(str::to_string),
        })
    }

    /// Check that the active provider can be used, recording messages.
    pub fn validate(&mut self) -> bool {
        let catalog = match catalog() {
            Ok(catalog) => catalog,
            Err(e) => {
                self.error_messages.push(e.to_string());
                return false;
            }
        };

        let provider = self.provider();
        let Some(info) = catalog.get(&provider) else {
            self.error_messages.push(format!(
                "Unknown provider '{}'. Valid providers: {}",
                provider,
                catalog.ids().join(", ")
            ));
            return false;
        };

        let Some(key) = self.api_key(&info.id) else {
            self.error_messages.push(
                ConfigError::MissingApiKey {
                    display_name: info.display_name.clone(),
                    env_vars: info.api_key_env.clone(),
                }
                .to_string(),
            );
            return false;
        };

        if !info.api_key_prefixes.is_empty()
            && !info.api_key_prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
        {
            self.status_messages.push(format!(
                "Warning: {} API key does not start with the expected prefix ({})",
                info.display_name,
                info.api_key_prefixes.join(" or ")
            ));
        }

        self.status_messages.push(format!("Using provider: {}", info.display_name));
        true
    }

    pub fn consume_status_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.status_messages)
    }

    pub fn consume_error_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.error_messages)
    }

    /// Directory holding history and telemetry files
    pub fn history_dir(&self) -> PathBuf {
        if let Some(dir) = self.env(HISTORY_DIR_ENV) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.file.history_dir {
            return dir.clone();
        }
        default_history_dir()
    }

    pub fn telemetry_enabled(&self) -> bool {
        match self.env(TELEMETRY_ENABLED_ENV) {
            Some(value) => !matches!(value.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
            None => true,
        }
    }

    pub fn telemetry_path(&self) -> PathBuf {
        match self.env(TELEMETRY_FILE_ENV) {
            Some(path) => PathBuf::from(path),
            None => self.history_dir().join("telemetry.jsonl"),
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.env(DEBUG_ENV)
            .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

fn default_history_dir() -> PathBuf {
    if cfg!(windows) {
        if let Some(dir) = dirs::data_dir() {
            return dir.join("promptheus");
        }
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".promptheus")
}
