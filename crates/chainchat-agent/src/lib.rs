//! Chainchat agent: tool discovery, the conversation engine, and the shell.
//!
//! This crate contains:
//! - **tools**: Tool trait and the bound-tool registry
//! - **discovery**: package ecosystem, scanner, tool index cache, tool loader
//! - **community**: the built-in `chainchat_community` tool package
//! - **plugins**: provider/tool registration hooks
//! - **trim**, **checkpoint**: history trimming and thread persistence
//! - **engine**: the agent ⇄ tools conversation state machine
//! - **shell**: the interactive prompt loop

pub mod checkpoint;
pub mod community;
pub mod discovery;
pub mod engine;
pub mod plugins;
pub mod shell;
pub mod tools;
pub mod trim;

pub use checkpoint::{open_checkpointer, Checkpointer, JsonlCheckpointer, MemoryCheckpointer};
pub use discovery::{ToolError, ToolIndexCache, ToolLoader};
pub use engine::{Chat, Node, Renderer, ToolObserver, TracingToolObserver, TurnSnapshot};
pub use plugins::{Plugin, PluginManager};
pub use shell::LineSource;
pub use tools::{Tool, ToolRegistry};
pub use trim::{trim_messages, ApproxTokenCounter, TokenCounter};
