//! Conversation types: messages, tool calls, and the OpenAI-compatible wire format.
//!
//! A conversation is an append-only `Vec<Message>`. Each variant maps to a
//! `role` value on the wire (`system`, `user`, `assistant`, `tool`), so the same
//! types serve the thread history, the JSONL checkpoints, and provider requests.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// One turn in a conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    /// Human-authored message (text or multipart with attachments).
    #[serde(rename = "user")]
    User { content: MessageContent },

    /// Model-authored message, possibly requesting tool calls.
    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        /// Reasoning/thinking content from models like DeepSeek-R1.
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },

    /// Result of a tool call, linked to its request by `tool_call_id`.
    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

/// Author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    Human,
    Ai,
    Tool,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a human message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a human message with multipart content (text + attachments).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Message::User {
            content: MessageContent::Parts(parts),
        }
    }

    /// Create an AI message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: None,
            reasoning_content: None,
        }
    }

    /// Create an AI message that only requests tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: None,
            tool_calls: Some(tool_calls),
            reasoning_content: None,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::Human,
            Message::Assistant { .. } => Role::Ai,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Tool calls requested by an AI message (empty for every other role).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant {
                tool_calls: Some(calls),
                ..
            } => calls,
            _ => &[],
        }
    }

    /// Whether this is an AI message with at least one pending tool call.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// Concatenated text of the message, ignoring non-text parts.
    pub fn text(&self) -> String {
        match self {
            Message::System { content } | Message::Tool { content, .. } => content.clone(),
            Message::User { content } => content.text(),
            Message::Assistant { content, .. } => content.clone().unwrap_or_default(),
        }
    }
}

// ─────────────────────────────────────────────
// Message content (text or multipart)
// ─────────────────────────────────────────────

/// Human message content. Text serializes as a plain string, parts as an array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single part of a multipart message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// Image as a URL or base64 data URI.
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    /// Arbitrary document (e.g. PDF) as a base64 data URI.
    #[serde(rename = "file")]
    File { file: FileData },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub file_data: String,
}

// ─────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────

/// A tool call requested by the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Call id, echoed back in the matching tool result.
    pub id: String,
    /// Always "function".
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, passed through verbatim.
    pub arguments: String,
}

// ─────────────────────────────────────────────
// Tool definitions (sent with requests)
// ─────────────────────────────────────────────

/// Schema of a bound tool, sent to the model so it can request calls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ─────────────────────────────────────────────
// LLM response
// ─────────────────────────────────────────────

/// A completed model reply.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Text content (None if the reply only requests tool calls).
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageInfo>,
    pub reasoning_content: Option<String>,
}

impl LlmResponse {
    /// Reply carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        LlmResponse {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Convert into the AI message appended to the thread.
    pub fn into_message(self) -> Message {
        Message::Assistant {
            content: self.content,
            tool_calls: if self.tool_calls.is_empty() {
                None
            } else {
                Some(self.tool_calls)
            },
            reasoning_content: self.reasoning_content,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Chat completions wire format
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

impl TryFrom<ChatCompletionResponse> for LlmResponse {
    type Error = anyhow::Error;

    fn try_from(resp: ChatCompletionResponse) -> anyhow::Result<Self> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;
        Ok(LlmResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage: resp.usage,
            reasoning_content: choice.message.reasoning_content,
        })
    }
}

/// One `data:` event of a streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of a tool call; fragments sharing an `index` concatenate.
#[derive(Debug, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallDelta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_text_message_serialization() {
        let msg = Message::user("What is 2+2?");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "What is 2+2?");
    }

    #[test]
    fn test_user_parts_serialization() {
        let msg = Message::user_parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".into(),
                    detail: None,
                },
            },
            ContentPart::Text {
                text: "Describe this".into(),
            },
        ]);
        let json = serde_json::to_value(&msg).unwrap();

        let parts = json["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert!(parts[0]["image_url"].get("detail").is_none());
        assert_eq!(parts[1]["type"], "text");
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let msg = Message::assistant_tool_calls(vec![ToolCall::new(
            "call_123",
            "read_file",
            r#"{"path": "notes.txt"}"#,
        )]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json.get("content").is_none());
        let calls = json["tool_calls"].as_array().unwrap();
        assert_eq!(calls[0]["type"], "function");
        assert_eq!(calls[0]["function"]["name"], "read_file");
    }

    #[test]
    fn test_tool_result_serialization() {
        let msg = Message::tool_result("call_123", "file contents");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_123");
    }

    #[test]
    fn test_roles() {
        assert_eq!(Message::system("s").role(), Role::System);
        assert_eq!(Message::user("u").role(), Role::Human);
        assert_eq!(Message::assistant("a").role(), Role::Ai);
        assert_eq!(Message::tool_result("c", "t").role(), Role::Tool);
    }

    #[test]
    fn test_has_tool_calls() {
        assert!(!Message::assistant("plain").has_tool_calls());
        assert!(!Message::user("hi").has_tool_calls());
        let msg = Message::assistant_tool_calls(vec![ToolCall::new("c1", "x", "{}")]);
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls()[0].id, "c1");
    }

    #[test]
    fn test_text_of_multipart_skips_images() {
        let msg = Message::user_parts(vec![
            ContentPart::Text { text: "one".into() },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "http://x/y.png".into(),
                    detail: None,
                },
            },
            ContentPart::Text { text: "two".into() },
        ]);
        assert_eq!(msg.text(), "one\ntwo");
    }

    #[test]
    fn test_assistant_with_tool_calls_deserialization() {
        let json = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": { "name": "terminal", "arguments": "{\"commands\": \"ls\"}" }
            }]
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls()[0].function.name, "terminal");
    }

    #[test]
    fn test_response_into_message() {
        let resp = LlmResponse {
            content: None,
            tool_calls: vec![ToolCall::new("c1", "current_time", "{}")],
            ..Default::default()
        };
        let msg = resp.into_message();
        assert!(msg.has_tool_calls());

        let msg = LlmResponse::text("4").into_message();
        assert_eq!(msg, Message::assistant("4"));
    }

    #[test]
    fn test_chat_completion_response_parsing() {
        let api_json = json!({
            "id": "chatcmpl-abc123",
            "choices": [{
                "message": { "content": "Hello!", "tool_calls": null },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18 }
        });

        let resp: ChatCompletionResponse = serde_json::from_value(api_json).unwrap();
        let llm_resp = LlmResponse::try_from(resp).unwrap();

        assert_eq!(llm_resp.content.as_deref(), Some("Hello!"));
        assert!(!llm_resp.has_tool_calls());
        assert_eq!(llm_resp.usage.unwrap().total_tokens, 18);
    }

    #[test]
    fn test_chat_completion_empty_choices_is_error() {
        let resp: ChatCompletionResponse =
            serde_json::from_value(json!({"id": "x", "choices": [], "usage": null})).unwrap();
        assert!(LlmResponse::try_from(resp).is_err());
    }

    #[test]
    fn test_chat_request_omits_unset_fields() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![Message::user("Hello")],
            tools: None,
            tool_choice: None,
            max_tokens: Some(1024),
            temperature: None,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["max_tokens"], 1024);
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_stream_chunk_parsing() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"terminal","arguments":""}}]},"finish_reason":null}]}"#,
        )
        .unwrap();
        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].index, 0);
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
    }
}
