//! `.env` template generation

use crate::cli::app::TemplateArgs;
use anyhow::{bail, Result};
use promptheus_core::config::{self, ProviderCatalog};

/// Build the template for a comma-separated provider list
pub fn render_template(catalog: &ProviderCatalog, providers_input: &str) -> Result<String> {
    let names: Vec<&str> = providers_input.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();

    let unknown: Vec<&str> = names.iter().copied().filter(|name| catalog.get(name).is_none()).collect();
    if !unknown.is_empty() || names.is_empty() {
        bail!(
            "Unknown provider(s): {}\nValid providers: {}",
            unknown.join(", "),
            catalog.ids().join(", ")
        );
    }

    let mut lines = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        let Some(info) = catalog.get(name) else { continue };
        if idx > 0 {
            lines.push(String::new());
        }
        lines.push(format!("# {} Environment Configuration", info.display_name));
        lines.push(String::new());

        if info.api_key_env.len() > 1 {
            lines.push("# Required Variables (only one is needed)".to_string());
            for (i, key) in info.api_key_env.iter().enumerate() {
                let comment = if i == 0 { "" } else { "# " };
                lines.push(format!("{comment}{key}='YOUR_{}_HERE'", key.to_uppercase()));
            }
        } else {
            lines.push("# Required Variables".to_string());
            for key in &info.api_key_env {
                lines.push(format!("{key}='YOUR_{}_HERE'", key.to_uppercase()));
            }
        }

        let optional: Vec<&String> = info.base_url_env.iter().chain(info.optional_env.iter()).collect();
        if !optional.is_empty() {
            lines.push(String::new());
            lines.push("# Optional Variables".to_string());
            for var in optional {
                lines.push(format!("#{var}="));
            }
        }
    }

    Ok(lines.join("\n"))
}

pub fn execute(args: TemplateArgs) -> Result<()> {
    let catalog = config::catalog()?;
    println!("{}", render_template(catalog, &args.providers)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_key_provider() {
        let template = render_template(config::catalog().unwrap(), "openai").unwrap();
        assert!(template.starts_with("# OpenAI Environment Configuration\n\n# Required Variables\n"));
        assert!(template.contains("OPENAI_API_KEY='YOUR_OPENAI_API_KEY_HERE'"));
        assert!(template.contains("# Optional Variables\n#OPENAI_BASE_URL="));
    }

    #[test]
    fn test_multiple_keys_and_providers() {
        let template = render_template(config::catalog().unwrap(), "gemini, anthropic").unwrap();
        assert!(template.contains("# Required Variables (only one is needed)"));
        assert!(template.contains("\nGEMINI_API_KEY='YOUR_GEMINI_API_KEY_HERE'"));
        assert!(template.contains("\n# GOOGLE_API_KEY='YOUR_GOOGLE_API_KEY_HERE'"));
        assert!(template.contains("\n\n# Anthropic Claude Environment Configuration"));
    }

    #[test]
    fn test_unknown_provider() {
        let err = render_template(config::catalog().unwrap(), "openai,mistral").unwrap_err();
        assert!(err.to_string().contains("Unknown provider(s): mistral"));
    }
}
