//! Bound-tool registry: the tool set one engine instance owns.
//!
//! Keeps tools in binding order so the definitions sent to the model follow
//! the order the user asked for them.

use std::sync::Arc;

use anyhow::Context;
use chainchat_core::types::ToolDefinition;
use tracing::{debug, warn};

use super::base::{Tool, ToolArgs};

/// Tools bound to a conversation, dispatched by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from resolved tools, in order.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Bind a tool. A later tool with the same name replaces the earlier one
    /// in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(tool = tool.name(), "bound tool");
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(slot) => *slot = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names in binding order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute one tool call with its raw JSON argument string.
    ///
    /// An unbound tool name or malformed arguments are the model's mistake and
    /// come back as an error string for it to read. A failure inside the tool
    /// itself is returned as `Err`.
    pub async fn execute(&self, name: &str, raw_args: &str) -> anyhow::Result<String> {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "model called an unbound tool");
            return Ok(format!(
                "Error: Tool '{name}' is not available. Available tools: {}",
                self.tool_names().join(", ")
            ));
        };

        let args = match parse_args(raw_args) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "invalid tool arguments");
                return Ok(format!("Error: Invalid arguments for {name}: {e}"));
            }
        };

        tool.execute(args)
            .await
            .with_context(|| format!("Tool {name} failed"))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Empty input counts as an empty object; anything else must be a JSON object.
fn parse_args(raw: &str) -> Result<ToolArgs, String> {
    if raw.trim().is_empty() {
        return Ok(ToolArgs::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}
