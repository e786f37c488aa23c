//! Tool trait and the bound-tool registry.

pub mod base;
pub mod registry;

pub use base::{optional_bool, optional_string, optional_u64, require_string, Tool, ToolArgs};
pub use registry::ToolRegistry;
