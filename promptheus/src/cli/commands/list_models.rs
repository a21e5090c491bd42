//! List models command

use crate::cli::app::ListModelsArgs;
use anyhow::Result;
use promptheus_core::config::{self, Config};
use promptheus_core::llm::{create_provider, LLMError};
use regex_utils::model_filter;
use tracing::debug;

/// Text models to show, plus how many were hidden by the filter and the limit
#[derive(Debug, PartialEq)]
pub struct ModelListing {
    pub shown: Vec<String>,
    pub filtered_out: usize,
    pub truncated: usize,
}

pub fn select_models(models: &[String], include_nontext: bool, limit: usize) -> ModelListing {
    let candidates: Vec<String> = if include_nontext {
        models.to_vec()
    } else {
        model_filter::text_models(models).into_iter().cloned().collect()
    };
    let filtered_out = models.len() - candidates.len();

    let truncated = if limit > 0 { candidates.len().saturating_sub(limit) } else { 0 };
    let shown = candidates.into_iter().take(if limit > 0 { limit } else { usize::MAX }).collect();
    ModelListing { shown, filtered_out, truncated }
}

async fn fetch_models(provider: &str, config: &Config) -> Result<Vec<String>, String> {
    if config.api_key(provider).is_none() {
        return Err("Error: API key not found or invalid".to_string());
    }

    let client = create_provider(provider, config, None).map_err(|e| format!("Error: {}", e.sanitized()))?;
    match client.available_models().await {
        Ok(models) => {
            debug!("Provider {} returned {} models", provider, models.len());
            Ok(models)
        }
        Err(LLMError::NotSupported { .. }) => {
            Err(format!("Note: {} does not support listing models via API.", client.name()))
        }
        Err(e) => Err(format!("Error: {}", e.sanitized())),
    }
}

pub async fn execute(args: ListModelsArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let catalog = config::catalog()?;

    let providers: Vec<String> = if args.providers.is_empty() {
        catalog.ids().into_iter().map(String::from).collect()
    } else {
        args.providers.iter().map(|p| catalog.normalize(p)).collect()
    };
    eprintln!("Querying {} provider(s)...\n", providers.len());

    for provider in &providers {
        let Some(info) = catalog.get(provider) else {
            println!("{provider}\n  - Unknown provider\n");
            continue;
        };
        println!("{} Models", info.display_name);

        match fetch_models(&info.id, &config).await {
            Err(message) => println!("  - {message}"),
            Ok(models) => {
                let listing = select_models(&models, args.include_nontext, args.limit);
                if listing.shown.is_empty() {
                    if models.is_empty() {
                        println!("  - No models returned from API");
                    } else {
                        println!("  - No text-capable models found (use --include-nontext to show all)");
                    }
                }
                for (idx, model) in listing.shown.iter().enumerate() {
                    println!("  {:>3}. {}", idx + 1, model);
                }
                if listing.truncated > 0 {
                    println!("  ... +{} more (use --limit 0 to show all)", listing.truncated);
                }
                if listing.filtered_out > 0 {
                    println!(
                        "  Filtered {} non-text models (use --include-nontext to show all)",
                        listing.filtered_out
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filters_nontext_models() {
        let all = models(&["gpt-4o", "text-embedding-3-small", "whisper-1", "gpt-4o-mini"]);
        let listing = select_models(&all, false, 20);
        assert_eq!(listing.shown, models(&["gpt-4o", "gpt-4o-mini"]));
        assert_eq!(listing.filtered_out, 2);
        assert_eq!(listing.truncated, 0);

        let listing = select_models(&all, true, 20);
        assert_eq!(listing.shown.len(), 4);
        assert_eq!(listing.filtered_out, 0);
    }

    #[test]
    fn test_limit() {
        let all = models(&["a", "b", "c", "d"]);
        let listing = select_models(&all, false, 3);
        assert_eq!(listing.shown, models(&["a", "b", "c"]));
        assert_eq!(listing.truncated, 1);

        assert_eq!(select_models(&all, false, 0).shown.len(), 4);
    }
}
