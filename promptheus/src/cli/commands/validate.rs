//! Environment validation command

use crate::cli::app::ValidateArgs;
use anyhow::Result;
use promptheus_core::config::{self, Config, ProviderInfo};
use promptheus_core::llm::{create_provider, TextRequest};
use tracing::debug;

const PING_MAX_TOKENS: u32 = 8;

/// Model for a connection test: the provider's model env var, then its
/// default, then its first example, then `PROMPTHEUS_MODEL`.
pub fn select_test_model(info: &ProviderInfo, config: &Config) -> Option<String> {
    info.model_env
        .as_deref()
        .and_then(|var| config.env(var))
        .map(String::from)
        .or_else(|| Some(info.default_model.clone()).filter(|m| !m.is_empty()))
        .or_else(|| info.example_models.first().cloned())
        .or_else(|| config.env(config::MODEL_ENV).map(String::from))
}

/// Send a tiny request to check the credentials work
async fn test_connection(info: &ProviderInfo, config: &Config) -> Result<(), String> {
    let model = select_test_model(info, config);
    debug!("Testing connection for {} with model {:?}", info.id, model);

    let provider = create_provider(&info.id, config, model.as_deref()).map_err(|e| e.sanitized())?;
    match provider.generate_text(TextRequest::new("ping", "").with_max_tokens(PING_MAX_TOKENS)).await {
        Ok(_) => Ok(()),
        Err(e) if info.id == "gemini" && e.to_string().contains("did not include text content") => {
            Err("Connection failed. Note: Standard Gemini API keys may have limitations.".to_string())
        }
        Err(e) => Err(e.sanitized()),
    }
}

pub async fn execute(args: ValidateArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let catalog = config::catalog()?;

    println!("Promptheus Environment Validator\n");

    let (selected, unknown): (Vec<&ProviderInfo>, Vec<&String>) = if args.providers.is_empty() {
        (catalog.providers.iter().collect(), Vec::new())
    } else {
        let unknown = args.providers.iter().filter(|p| catalog.get(p).is_none()).collect();
        (args.providers.iter().filter_map(|p| catalog.get(p)).collect(), unknown)
    };

    if !unknown.is_empty() {
        let names: Vec<&str> = unknown.iter().map(|s| s.as_str()).collect();
        println!("Warning: Unknown provider(s) specified: {}", names.join(", "));
    }
    if selected.is_empty() {
        println!("No providers to validate.");
        return Ok(());
    }

    let mut ready = Vec::new();
    for info in selected {
        let key_found = config.api_key(&info.id).is_some();
        let status = if key_found { "✓ Ready" } else { "✗ Not Configured" };
        let key_status = if key_found {
            "Set".to_string()
        } else {
            format!("Missing {}", info.api_key_env.first().map(String::as_str).unwrap_or("N/A"))
        };

        let mut row = format!("{:<18} {:<18} {}", info.display_name, status, key_status);
        let mut usable = key_found;

        if args.test_connection {
            let connection = if !key_found {
                "Skipped".to_string()
            } else {
                match test_connection(info, &config).await {
                    Ok(()) => "✓ Connected".to_string(),
                    Err(error) => {
                        usable = false;
                        format!("✗ Failed: {error}")
                    }
                }
            };
            row.push_str(&format!("  [{connection}]"));
        }

        println!("{row}");
        if usable {
            ready.push(info.id.as_str());
        }
    }

    println!("\nRecommendations:");
    if ready.is_empty() {
        if args.providers.is_empty() {
            println!("No providers configured. Use 'promptheus template <provider>' to get started.");
        } else {
            println!("None of the specified providers are ready.");
        }
    } else {
        println!("✓ Ready to use providers: {}", ready.join(", "));
    }

    Ok(())
}
