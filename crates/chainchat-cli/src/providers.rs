//! `chainchat providers`: show registered providers and their key status.

use anyhow::Result;
use colored::Colorize;

use chainchat_agent::PluginManager;
use chainchat_core::config::{get_config_path, load_config};
use chainchat_providers::registry::{effective_config, find_by_model, ProviderConfig, ProviderSpec};

/// Run the providers command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();
    let specs = PluginManager::with_builtins().providers();

    println!();
    println!(
        "  {:<14} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            "✓".green().to_string()
        } else {
            "(not found)".red().to_string()
        }
    );
    let matched = find_by_model(&specs, &config.chat.model)
        .map(|s| s.display_name)
        .unwrap_or("gateway fallback");
    println!(
        "  {:<14} {} {}",
        "Model:".bold(),
        config.chat.model,
        format!("({matched})").dimmed()
    );

    println!();
    println!("  {}", "Providers:".bold());
    for spec in &specs {
        let provider_config = effective_config(spec, &config.providers);
        println!(
            "    {:<12} {:<14} {}",
            spec.name,
            spec.display_name,
            status(spec, &provider_config)
        );
    }
    println!();

    Ok(())
}

fn status(spec: &ProviderSpec, config: &ProviderConfig) -> String {
    if spec.is_local {
        format!("{} (local, no key needed)", "✓".green())
    } else if config.is_configured() {
        format!("{} (key set)", "✓".green())
    } else {
        format!("{}", format!("· not configured ({})", spec.env_key).dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainchat_providers::registry::{find_by_name, PROVIDERS};

    #[test]
    fn status_reflects_key_and_locality() {
        colored::control::set_override(false);
        let openai = find_by_name(PROVIDERS, "openai").unwrap();
        let ollama = find_by_name(PROVIDERS, "ollama").unwrap();

        let empty = ProviderConfig::default();
        let keyed = ProviderConfig {
            api_key: "sk-test".into(),
            ..Default::default()
        };

        assert_eq!(status(openai, &empty), "· not configured (OPENAI_API_KEY)");
        assert_eq!(status(openai, &keyed), "✓ (key set)");
        assert!(status(ollama, &empty).contains("local"));
    }
}
