//! LLM provider layer for Chainchat.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: trait that all providers implement
//! - [`registry`]: static specs for the built-in providers + matching logic
//! - [`http_provider::HttpProvider`]: generic OpenAI-compatible HTTP client
//! - [`http_provider::create_provider`]: convenience builder from model name + config

pub mod http_provider;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use http_provider::{create_provider, HttpProvider};
pub use registry::{ProviderConfig, ProviderSpec, PROVIDERS};
pub use traits::{DeltaSink, LlmProvider, LlmRequestConfig};
