//! Provider registry: static specs for the built-in LLM backends.
//!
//! Each `ProviderSpec` describes how to reach one backend: keywords for model
//! matching, the env var holding its API key, and its default API base.
//! Plugins contribute extra specs at startup, so every lookup takes the full
//! list of specs rather than reading [`PROVIDERS`] directly.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};

/// Re-exported from core.
pub use chainchat_core::config::schema::ProviderConfig;

// ─────────────────────────────────────────────
// ProviderSpec: static metadata for one provider
// ─────────────────────────────────────────────

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name (e.g. `"openrouter"`). Also the key under `providers` in config.
    pub name: &'static str,
    /// Human-readable name for logs. E.g. `"OpenRouter"`.
    pub display_name: &'static str,
    /// Keywords to match in model names (lowercase). E.g. `&["claude", "anthropic"]`.
    pub keywords: &'static [&'static str],
    /// Environment variable consulted when the config has no API key.
    pub env_key: &'static str,
    /// Default API base URL (OpenAI-compatible `/chat/completions` lives under it).
    pub default_api_base: Option<&'static str>,
    /// Gateways route any model; used as fallback when no direct match is found.
    pub is_gateway: bool,
    /// Local/self-hosted servers need no API key.
    pub is_local: bool,
}

// ─────────────────────────────────────────────
// Built-in providers (in matching priority order)
// ─────────────────────────────────────────────

/// Built-in provider specifications, in matching priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "openrouter",
        display_name: "OpenRouter",
        keywords: &["openrouter"],
        env_key: "OPENROUTER_API_KEY",
        default_api_base: Some("https://openrouter.ai/api/v1"),
        is_gateway: true,
        is_local: false,
    },
    ProviderSpec {
        name: "anthropic",
        display_name: "Anthropic",
        keywords: &["anthropic", "claude"],
        env_key: "ANTHROPIC_API_KEY",
        default_api_base: Some("https://api.anthropic.com/v1"),
        is_gateway: false,
        is_local: false,
    },
    ProviderSpec {
        name: "openai",
        display_name: "OpenAI",
        keywords: &["openai", "gpt"],
        env_key: "OPENAI_API_KEY",
        default_api_base: Some("https://api.openai.com/v1"),
        is_gateway: false,
        is_local: false,
    },
    ProviderSpec {
        name: "deepseek",
        display_name: "DeepSeek",
        keywords: &["deepseek"],
        env_key: "DEEPSEEK_API_KEY",
        default_api_base: Some("https://api.deepseek.com/v1"),
        is_gateway: false,
        is_local: false,
    },
    ProviderSpec {
        name: "groq",
        display_name: "Groq",
        keywords: &["groq"],
        env_key: "GROQ_API_KEY",
        default_api_base: Some("https://api.groq.com/openai/v1"),
        is_gateway: false,
        is_local: false,
    },
    ProviderSpec {
        name: "gemini",
        display_name: "Gemini",
        keywords: &["gemini"],
        env_key: "GEMINI_API_KEY",
        default_api_base: Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        is_gateway: false,
        is_local: false,
    },
    ProviderSpec {
        name: "ollama",
        display_name: "Ollama",
        keywords: &["ollama"],
        env_key: "OLLAMA_API_KEY",
        default_api_base: Some("http://localhost:11434/v1"),
        is_gateway: false,
        is_local: true,
    },
    ProviderSpec {
        name: "vllm",
        display_name: "vLLM",
        keywords: &["vllm"],
        env_key: "VLLM_API_KEY",
        default_api_base: Some("http://localhost:8000/v1"),
        is_gateway: false,
        is_local: true,
    },
];

// ─────────────────────────────────────────────
// Lookup
// ─────────────────────────────────────────────

/// Find a provider spec by its internal name.
pub fn find_by_name<'a>(specs: &'a [ProviderSpec], name: &str) -> Option<&'a ProviderSpec> {
    specs.iter().find(|s| s.name == name)
}

/// Find the first non-gateway provider whose keywords appear in the model name.
pub fn find_by_model<'a>(specs: &'a [ProviderSpec], model: &str) -> Option<&'a ProviderSpec> {
    let model_lower = model.to_lowercase();
    specs
        .iter()
        .filter(|s| !s.is_gateway)
        .find(|s| s.keywords.iter().any(|kw| model_lower.contains(kw)))
}

/// A provider picked for a model, with its effective configuration.
#[derive(Clone, Debug)]
pub struct ResolvedProvider<'a> {
    pub spec: &'a ProviderSpec,
    /// Config with `api_key` filled from the environment when absent.
    pub config: ProviderConfig,
}

/// Effective config for a provider: the configured entry, with the API key
/// falling back to the spec's env var.
pub fn effective_config(
    spec: &ProviderSpec,
    providers: &BTreeMap<String, ProviderConfig>,
) -> ProviderConfig {
    let mut config = providers.get(spec.name).cloned().unwrap_or_default();
    if config.api_key.is_empty() {
        if let Ok(key) = std::env::var(spec.env_key) {
            config.api_key = key;
        }
    }
    config
}

fn usable(spec: &ProviderSpec, config: &ProviderConfig) -> bool {
    spec.is_local || config.is_configured()
}

/// Pick the provider for a chat session.
///
/// 1. An explicit provider name wins; it must exist and have a key (unless local).
/// 2. Otherwise match the model name by keyword, if that provider is usable.
/// 3. Fall back to the first usable gateway.
pub fn select_provider<'a>(
    specs: &'a [ProviderSpec],
    model: &str,
    explicit: Option<&str>,
    providers: &BTreeMap<String, ProviderConfig>,
) -> Result<ResolvedProvider<'a>> {
    if let Some(name) = explicit {
        let spec = find_by_name(specs, name).ok_or_else(|| {
            let known: Vec<&str> = specs.iter().map(|s| s.name).collect();
            anyhow!("Unknown provider '{}'. Known providers: {}", name, known.join(", "))
        })?;
        let config = effective_config(spec, providers);
        if !usable(spec, &config) {
            bail!(
                "Provider '{}' has no API key. Set {} or providers.{}.apiKey in the config.",
                spec.name,
                spec.env_key,
                spec.name
            );
        }
        return Ok(ResolvedProvider { spec, config });
    }

    if let Some(spec) = find_by_model(specs, model) {
        let config = effective_config(spec, providers);
        if usable(spec, &config) {
            return Ok(ResolvedProvider { spec, config });
        }
    }

    specs
        .iter()
        .filter(|s| s.is_gateway)
        .find_map(|spec| {
            let config = effective_config(spec, providers);
            usable(spec, &config).then_some(ResolvedProvider { spec, config })
        })
        .ok_or_else(|| {
            anyhow!(
                "No configured provider found for model '{}'. \
                 Set the appropriate API key (e.g. OPENAI_API_KEY, OPENROUTER_API_KEY).",
                model
            )
        })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
