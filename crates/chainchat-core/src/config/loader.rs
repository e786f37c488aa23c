//! Config loader: reads `~/.chainchat/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.chainchat/config.json`
//! 3. Environment variables `CHAINCHAT_<SECTION>__<FIELD>` (override JSON)
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the given path (or the default one) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `CHAINCHAT_CHAT__MODEL`, `CHAINCHAT_CHAT__PROVIDER`, `CHAINCHAT_CHAT__SYSTEM_MESSAGE`
/// - `CHAINCHAT_CHAT__MAX_HISTORY_TOKENS`, `CHAINCHAT_CHAT__MAX_TOKENS`, `CHAINCHAT_CHAT__TEMPERATURE`
/// - `CHAINCHAT_CHAT__THREAD_ID`, `CHAINCHAT_CHAT__CHECKPOINT`, `CHAINCHAT_CHAT__MAX_STEPS`
/// - `CHAINCHAT_TOOLS__CACHE_PATH`
/// - `CHAINCHAT_PROVIDERS__<NAME>__API_KEY`, `CHAINCHAT_PROVIDERS__<NAME>__API_BASE`
fn apply_env_overrides(mut config: Config) -> Config {
    let chat = &mut config.chat;
    if let Ok(val) = std::env::var("CHAINCHAT_CHAT__MODEL") {
        chat.model = val;
    }
    if let Ok(val) = std::env::var("CHAINCHAT_CHAT__PROVIDER") {
        chat.provider = Some(val);
    }
    if let Ok(val) = std::env::var("CHAINCHAT_CHAT__SYSTEM_MESSAGE") {
        chat.system_message = Some(val);
    }
    if let Some(n) = env_parse("CHAINCHAT_CHAT__MAX_HISTORY_TOKENS") {
        chat.max_history_tokens = Some(n);
    }
    if let Some(n) = env_parse("CHAINCHAT_CHAT__MAX_TOKENS") {
        chat.max_tokens = n;
    }
    if let Some(t) = env_parse("CHAINCHAT_CHAT__TEMPERATURE") {
        chat.temperature = t;
    }
    if let Ok(val) = std::env::var("CHAINCHAT_CHAT__THREAD_ID") {
        chat.thread_id = val;
    }
    if let Some(kind) = env_parse("CHAINCHAT_CHAT__CHECKPOINT") {
        chat.checkpoint = kind;
    }
    if let Some(n) = env_parse("CHAINCHAT_CHAT__MAX_STEPS") {
        chat.max_steps = n;
    }

    if let Ok(val) = std::env::var("CHAINCHAT_TOOLS__CACHE_PATH") {
        config.tools.cache_path = val;
    }

    for (key, value) in std::env::vars() {
        let Some(rest) = key.strip_prefix("CHAINCHAT_PROVIDERS__") else {
            continue;
        };
        let Some((name, field)) = rest.split_once("__") else {
            continue;
        };
        let provider = config.providers.entry(name.to_lowercase()).or_default();
        match field {
            "API_KEY" => provider.api_key = value,
            "API_BASE" => provider.api_base = Some(value),
            _ => debug!(key = %key, "ignoring unknown provider override"),
        }
    }

    config
}

/// Parse an env var, warning (and ignoring it) when the value is malformed.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %val, "ignoring malformed environment override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CheckpointKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.chat.max_tokens, 4096);
        assert_eq!(config.chat.checkpoint, CheckpointKind::Memory);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "chat": {
                "model": "gpt-4o",
                "maxHistoryTokens": 2000,
                "systemMessage": "Be terse.",
                "checkpoint": "jsonl"
            },
            "tools": { "defaultTools": ["current_time"] }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.max_history_tokens, Some(2000));
        assert_eq!(config.chat.system_message.as_deref(), Some("Be terse."));
        assert_eq!(config.chat.checkpoint, CheckpointKind::Jsonl);
        assert_eq!(config.tools.default_tools, vec!["current_time"]);
        // Default preserved
        assert_eq!(config.chat.temperature, 0.7);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_from_path(file.path());
        assert_eq!(config.chat.max_tokens, 4096);
    }

    #[test]
    fn test_load_providers() {
        let file = write_temp_json(
            r#"{
            "providers": {
                "openai": { "apiKey": "sk-123" },
                "ollama": { "apiBase": "http://localhost:11434/v1" }
            }
        }"#,
        );

        let config = load_config_from_path(file.path());
        assert!(config.providers["openai"].is_configured());
        assert!(!config.providers["ollama"].is_configured());
        assert_eq!(
            config.providers["ollama"].api_base.as_deref(),
            Some("http://localhost:11434/v1")
        );
    }

    #[test]
    fn test_env_override_thread_id() {
        std::env::set_var("CHAINCHAT_CHAT__THREAD_ID", "work");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.chat.thread_id, "work");
        std::env::remove_var("CHAINCHAT_CHAT__THREAD_ID");
    }

    #[test]
    fn test_env_override_provider_key() {
        std::env::set_var("CHAINCHAT_PROVIDERS__GROQ__API_KEY", "gsk-env");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.providers["groq"].api_key, "gsk-env");
        std::env::remove_var("CHAINCHAT_PROVIDERS__GROQ__API_KEY");
    }

    #[test]
    fn test_env_override_malformed_ignored() {
        std::env::set_var("CHAINCHAT_CHAT__MAX_STEPS", "lots");
        let config = apply_env_overrides(Config::default());
        assert_eq!(config.chat.max_steps, 25);
        std::env::remove_var("CHAINCHAT_CHAT__MAX_STEPS");
    }
}
