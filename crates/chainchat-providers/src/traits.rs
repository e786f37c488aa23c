//! LLM Provider trait: the abstraction every chat backend implements.
//!
//! The `HttpProvider` in `http_provider.rs` covers all OpenAI-compatible APIs;
//! plugins and tests can supply their own implementations.

use async_trait::async_trait;
use chainchat_core::types::{LlmResponse, Message, ToolDefinition};

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Receives streamed content fragments, in order.
pub type DeltaSink<'s> = dyn for<'a> FnMut(&'a str) + Send + 's;

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages`: Conversation history, system message first if any.
    /// * `tools`   : Tool definitions the model may call, if tools are bound.
    /// * `model`   : Model identifier (e.g. `"gpt-4o"`).
    /// * `config`  : Temperature, max_tokens, etc.
    ///
    /// Transport and API errors are returned as `Err` and end the turn.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> anyhow::Result<LlmResponse>;

    /// Like [`chat`](Self::chat), but reports text content as it arrives.
    ///
    /// `on_delta` receives each content fragment in order; the returned
    /// response carries the full accumulated reply. The default
    /// implementation calls `chat` and reports the whole content once.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        on_delta: &mut DeltaSink<'_>,
    ) -> anyhow::Result<LlmResponse> {
        let response = self.chat(messages, tools, model, config).await?;
        if let Some(content) = response.content.as_deref() {
            if !content.is_empty() {
                on_delta(content);
            }
        }
        Ok(response)
    }

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
