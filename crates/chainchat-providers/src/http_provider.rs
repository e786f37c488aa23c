//! Generic HTTP-based LLM provider for OpenAI-compatible APIs.
//!
//! Talks directly to any `/chat/completions` endpoint, either as a single
//! JSON response or as a server-sent event stream (`"stream": true`).

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, error, warn};

use chainchat_core::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message,
    ToolCall, ToolDefinition, UsageInfo,
};

use crate::registry::{select_provider, ProviderConfig, ProviderSpec};
use crate::traits::{DeltaSink, LlmProvider, LlmRequestConfig};

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A generic LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication. Empty for local servers.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
    spec: ProviderSpec,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("provider", &self.spec.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider from a provider config and spec.
    ///
    /// # Arguments
    /// * `config` : User's config (api_key, api_base, extra_headers)
    /// * `spec`   : Provider spec from the registry
    /// * `model`  : The default model to use
    pub fn new(config: &ProviderConfig, spec: &ProviderSpec, model: &str) -> Result<Self> {
        // Resolve API base: config > spec default > standard OpenAI path
        let api_base = config
            .api_base
            .clone()
            .or_else(|| spec.default_api_base.map(String::from))
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            extra_headers,
            spec: spec.clone(),
        })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        stream: bool,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(config.temperature),
            stream,
        }
    }

    /// POST the request and fail on non-2xx statuses with the response body.
    async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(self.completions_url())
            .headers(self.extra_headers.clone())
            .json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
            anyhow::Error::new(e).context(format!("Error calling {}", self.spec.display_name))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            bail!(
                "Error calling {}: {}: {}",
                self.spec.display_name,
                status,
                error_text
            );
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse> {
        debug!(
            provider = self.spec.display_name,
            model = %model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling LLM"
        );

        let body = self.build_request(messages, tools, model, config, false);
        let response = self.send(&body).await?;

        let chat_resp = response
            .json::<ChatCompletionResponse>()
            .await
            .with_context(|| format!("Error parsing {} response", self.spec.display_name))?;
        let llm_resp = LlmResponse::try_from(chat_resp)?;
        debug!(
            provider = self.spec.display_name,
            has_content = llm_resp.content.is_some(),
            tool_calls = llm_resp.tool_calls.len(),
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM response received"
        );
        Ok(llm_resp)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        on_delta: &mut DeltaSink<'_>,
    ) -> Result<LlmResponse> {
        debug!(
            provider = self.spec.display_name,
            model = %model,
            messages = messages.len(),
            "Streaming LLM call"
        );

        let body = self.build_request(messages, tools, model, config, true);
        let response = self.send(&body).await?;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut acc = StreamAccumulator::default();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading response stream")?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = match std::str::from_utf8(&line) {
                    Ok(s) => s.trim(),
                    Err(e) => {
                        warn!("Invalid UTF-8 in stream: {e}");
                        continue;
                    }
                };

                let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
                    continue;
                };
                if data == "[DONE]" {
                    break 'read;
                }

                match serde_json::from_str::<ChatCompletionChunk>(data) {
                    Ok(chunk) => acc.push(chunk, on_delta),
                    Err(e) => warn!(error = %e, data, "Failed to parse stream chunk"),
                }
            }
        }

        let llm_resp = acc.finish();
        debug!(
            provider = self.spec.display_name,
            tool_calls = llm_resp.tool_calls.len(),
            finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
            "LLM stream finished"
        );
        Ok(llm_resp)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

// ─────────────────────────────────────────────
// Stream accumulation
// ─────────────────────────────────────────────

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Largest gap allowed between a streamed tool-call index and the calls seen
/// so far. Indexes past it are dropped.
const MAX_TOOL_CALL_INDEX_GAP: usize = 16;

/// Folds streamed chunks into a complete reply. Tool-call fragments are
/// merged by their `index`.
#[derive(Default)]
struct StreamAccumulator {
    content: String,
    reasoning: String,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<String>,
    usage: Option<UsageInfo>,
}

impl StreamAccumulator {
    fn push(&mut self, chunk: ChatCompletionChunk, on_delta: &mut DeltaSink<'_>) {
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        for choice in chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
            let delta = choice.delta;
            if let Some(text) = delta.content {
                if !text.is_empty() {
                    on_delta(&text);
                    self.content.push_str(&text);
                }
            }
            if let Some(reasoning) = delta.reasoning_content {
                self.reasoning.push_str(&reasoning);
            }
            for call in delta.tool_calls.unwrap_or_default() {
                if call.index > self.tool_calls.len() + MAX_TOOL_CALL_INDEX_GAP {
                    warn!(index = call.index, "Ignoring out-of-range tool call index");
                    continue;
                }
                if self.tool_calls.len() <= call.index {
                    self.tool_calls
                        .resize_with(call.index + 1, PartialToolCall::default);
                }
                let slot = &mut self.tool_calls[call.index];
                if let Some(id) = call.id {
                    slot.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        slot.name.push_str(&name);
                    }
                    if let Some(args) = function.arguments {
                        slot.arguments.push_str(&args);
                    }
                }
            }
        }
    }

    fn finish(self) -> LlmResponse {
        LlmResponse {
            content: (!self.content.is_empty()).then_some(self.content),
            tool_calls: self
                .tool_calls
                .into_iter()
                .filter(|c| !c.name.is_empty())
                .map(|c| ToolCall::new(c.id, c.name, c.arguments))
                .collect(),
            finish_reason: self.finish_reason,
            usage: self.usage,
            reasoning_content: (!self.reasoning.is_empty()).then_some(self.reasoning),
        }
    }
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build an HttpProvider for a model from the known specs and provider configs.
///
/// `explicit` names a provider directly; otherwise the model name decides.
pub fn create_provider(
    specs: &[ProviderSpec],
    model: &str,
    explicit: Option<&str>,
    providers: &BTreeMap<String, ProviderConfig>,
) -> Result<HttpProvider> {
    let resolved = select_provider(specs, model, explicit, providers)?;

    debug!(
        provider = resolved.spec.display_name,
        model = model,
        api_base = resolved.config.api_base.as_deref().unwrap_or("default"),
        "Creating LLM provider"
    );

    HttpProvider::new(&resolved.config, resolved.spec, model)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
