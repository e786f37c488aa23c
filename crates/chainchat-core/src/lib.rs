//! Chainchat Core: shared types, attachments, configuration, and utilities.
//!
//! This crate contains:
//! - **types**: messages, tool calls, and the chat-completions wire format
//! - **attachment**: files/blobs converted into multipart prompt content
//! - **config**: JSON config schema + loader with env overrides
//! - **utils**: data-directory paths and string helpers

pub mod attachment;
pub mod config;
pub mod types;
pub mod utils;

pub use attachment::{build_message_with_attachments, Attachment};
pub use config::Config;
pub use types::{LlmResponse, Message, Role, ToolCall, ToolDefinition};
