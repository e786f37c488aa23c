//! Configuration schema.
//!
//! Hierarchy: `Config` → `ChatDefaults`, `providers` map, `ToolsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.chainchat/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub chat: ChatDefaults,
    /// Provider credentials keyed by provider name (e.g. `"openai"`).
    pub providers: BTreeMap<String, ProviderConfig>,
    pub tools: ToolsConfig,
}

// ─────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────

/// Defaults for the `chat` command; every field can be overridden by a CLI flag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatDefaults {
    /// Model identifier.
    pub model: String,
    /// Provider name. When unset the provider is matched from the model name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// System message prepended to every model call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Token budget for the history sent to the model. Unset means no trimming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_history_tokens: Option<usize>,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Conversation thread identifier.
    pub thread_id: String,
    /// Where thread history is checkpointed.
    pub checkpoint: CheckpointKind,
    /// Maximum agent/tools steps per turn.
    pub max_steps: usize,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            provider: None,
            system_message: None,
            max_history_tokens: None,
            max_tokens: 4096,
            temperature: 0.7,
            thread_id: "1".to_string(),
            checkpoint: CheckpointKind::Memory,
            max_steps: 25,
        }
    }
}

/// Checkpoint storage for conversation threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointKind {
    /// Process-lifetime, in memory.
    #[default]
    Memory,
    /// One JSONL file per thread under `~/.chainchat/threads/`.
    Jsonl,
}

impl FromStr for CheckpointKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(CheckpointKind::Memory),
            "jsonl" => Ok(CheckpointKind::Jsonl),
            other => Err(format!("unknown checkpoint kind '{other}' (expected memory or jsonl)")),
        }
    }
}

impl fmt::Display for CheckpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointKind::Memory => f.write_str("memory"),
            CheckpointKind::Jsonl => f.write_str("jsonl"),
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL, headers).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// SQLite file holding the tool index cache.
    pub cache_path: String,
    /// Tools bound when no `--tool` flag is given.
    pub default_tools: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            cache_path: "~/.chainchat/tools.db".to_string(),
            default_tools: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_kind_parse() {
        assert_eq!("memory".parse::<CheckpointKind>(), Ok(CheckpointKind::Memory));
        assert_eq!("JSONL".parse::<CheckpointKind>(), Ok(CheckpointKind::Jsonl));
        assert!("sqlite".parse::<CheckpointKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.chat.thread_id, "1");
        assert_eq!(config.chat.max_steps, 25);
        assert!(config.chat.max_history_tokens.is_none());
        assert!(config.providers.is_empty());
        assert!(config.tools.default_tools.is_empty());
    }
}
