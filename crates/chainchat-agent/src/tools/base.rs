//! Tool trait: the interface every bindable tool implements.

use async_trait::async_trait;
use serde_json::{Map, Value};

use chainchat_core::types::ToolDefinition;

/// Decoded arguments of one tool call (the JSON object the model sent).
pub type ToolArgs = Map<String, Value>;

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// A live, bound tool.
///
/// The engine sends `to_definition()` to the model and dispatches calls by
/// `name()`. Instances come from zero-argument factories registered in the
/// package ecosystem, one per engine.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool (e.g. `"read_file"`).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. The returned string becomes the tool-result message.
    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

// ─────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────

/// Extract a required string argument.
pub fn require_string(args: &ToolArgs, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

pub fn optional_string(args: &ToolArgs, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

pub fn optional_u64(args: &ToolArgs, key: &str) -> Option<u64> {
    args.get(key).and_then(|v| v.as_u64())
}

/// Boolean argument, `false` when absent.
pub fn optional_bool(args: &ToolArgs, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
