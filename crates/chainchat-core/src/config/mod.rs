//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use chainchat_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Model: {}", cfg.chat.model);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config};
pub use schema::{ChatDefaults, CheckpointKind, Config, ProviderConfig, ToolsConfig};
