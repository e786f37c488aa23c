//! Conversation engine: drives one thread through model and tool steps.
//!
//! Each turn is a two-node state machine:
//!
//! - **agent** calls the model on the (trimmed) thread history and appends
//!   its reply;
//! - **tools** runs every tool call of that reply and appends one result per
//!   call, then hands back to **agent**.
//!
//! The turn halts after an agent step whose reply requests no tools. With no
//! tools bound, agent is always terminal.
//!
//! A reply that requests tools is checkpointed together with its results once
//! the tools step succeeds, so a failed turn never leaves a stored tool call
//! without its result. Everything else is checkpointed as soon as it exists.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use chainchat_core::attachment::{build_message_with_attachments, Attachment};
use chainchat_core::types::Message;
use chainchat_providers::traits::{DeltaSink, LlmProvider, LlmRequestConfig};

use crate::checkpoint::{Checkpointer, MemoryCheckpointer};
use crate::tools::{Tool, ToolRegistry};
use crate::trim::{trim_messages, ApproxTokenCounter, TokenCounter};

/// Default cap on agent + tools steps per turn.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Default thread identifier.
pub const DEFAULT_THREAD_ID: &str = "1";

/// A state of the turn machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Agent,
    Tools,
}

/// Final state of a turn.
#[derive(Clone, Debug)]
pub struct TurnSnapshot {
    /// Whole thread history, prior turns included.
    pub messages: Vec<Message>,
    /// Nodes visited this turn, in order.
    pub steps: Vec<Node>,
    turn_start: usize,
}

impl TurnSnapshot {
    /// Messages appended by this turn, starting with its input.
    pub fn turn_messages(&self) -> &[Message] {
        &self.messages[self.turn_start..]
    }

    /// The final AI message.
    pub fn reply(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the final AI message.
    pub fn answer(&self) -> String {
        self.reply().map(Message::text).unwrap_or_default()
    }
}

/// Receives every tool call before it runs.
pub trait ToolObserver: Send + Sync {
    fn on_tool_start(&self, name: &str, input: &str);
}

/// Logs tool calls through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingToolObserver;

impl ToolObserver for TracingToolObserver {
    fn on_tool_start(&self, name: &str, input: &str) {
        info!(tool = name, input = input, "tool call");
    }
}

/// Displays a streamed answer.
pub trait Renderer: Send {
    fn begin(&mut self) {}

    fn chunk(&mut self, text: &str);

    fn end(&mut self) {}
}

// ─────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────

/// One conversation thread bound to a model and a tool set.
pub struct Chat {
    provider: Arc<dyn LlmProvider>,
    model: String,
    tools: Option<ToolRegistry>,
    system_message: Option<String>,
    max_history_tokens: Option<usize>,
    thread_id: String,
    checkpointer: Box<dyn Checkpointer>,
    observer: Box<dyn ToolObserver>,
    token_counter: Box<dyn TokenCounter>,
    max_steps: usize,
    request_config: LlmRequestConfig,
}

impl Chat {
    /// `tools` of `None` or empty binds nothing and disables the tools node.
    ///
    /// Tools are bound by name: when two tools share a name, the later one
    /// replaces the earlier, even though the loader returns duplicates as
    /// requested.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        tools: Option<Vec<Arc<dyn Tool>>>,
    ) -> Self {
        let tools = tools
            .filter(|t| !t.is_empty())
            .map(ToolRegistry::from_tools);
        Self {
            provider,
            model: model.into(),
            tools,
            system_message: None,
            max_history_tokens: None,
            thread_id: DEFAULT_THREAD_ID.to_string(),
            checkpointer: Box::new(MemoryCheckpointer::new()),
            observer: Box::new(TracingToolObserver),
            token_counter: Box::new(ApproxTokenCounter),
            max_steps: DEFAULT_MAX_STEPS,
            request_config: LlmRequestConfig::default(),
        }
    }

    pub fn with_system_message(mut self, system_message: Option<String>) -> Self {
        self.system_message = system_message.filter(|s| !s.is_empty());
        self
    }

    /// Trim history to this many tokens before each model call.
    pub fn with_max_history_tokens(mut self, max: Option<usize>) -> Self {
        self.max_history_tokens = max;
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Box<dyn Checkpointer>) -> Self {
        self.checkpointer = checkpointer;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn ToolObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_token_counter(mut self, counter: Box<dyn TokenCounter>) -> Self {
        self.token_counter = counter;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_request_config(mut self, config: LlmRequestConfig) -> Self {
        self.request_config = config;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Names of the bound tools, in binding order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools
            .as_ref()
            .map(ToolRegistry::tool_names)
            .unwrap_or_default()
    }

    /// Stored history of this thread.
    pub fn history(&self) -> Result<Vec<Message>> {
        self.checkpointer.load(&self.thread_id)
    }

    /// Run a turn to completion.
    pub async fn invoke(&self, messages: Vec<Message>) -> Result<TurnSnapshot> {
        self.run(messages, None).await
    }

    /// Run a turn, passing AI content fragments to `on_chunk` as they arrive.
    /// Tool results are never emitted.
    pub async fn stream(
        &self,
        messages: Vec<Message>,
        on_chunk: &mut DeltaSink<'_>,
    ) -> Result<TurnSnapshot> {
        self.run(messages, Some(on_chunk)).await
    }

    /// Send one human prompt (with attachments) and render the streamed answer.
    pub async fn prompt(
        &self,
        prompt: &str,
        attachments: Option<&[Attachment]>,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnSnapshot> {
        let messages = build_message_with_attachments(prompt, attachments)?;
        renderer.begin();
        let snapshot = self
            .stream(messages, &mut |chunk: &str| renderer.chunk(chunk))
            .await?;
        renderer.end();
        Ok(snapshot)
    }

    async fn run(
        &self,
        input: Vec<Message>,
        mut sink: Option<&mut DeltaSink<'_>>,
    ) -> Result<TurnSnapshot> {
        let mut history = self.checkpointer.load(&self.thread_id)?;
        let turn_start = history.len();
        self.checkpointer.append(&self.thread_id, &input)?;
        history.extend(input);

        let definitions = self.tools.as_ref().map(ToolRegistry::get_definitions);
        let mut steps = Vec::new();
        let mut node = Node::Agent;

        loop {
            if steps.len() >= self.max_steps {
                bail!(
                    "Step limit of {} reached without a final answer",
                    self.max_steps
                );
            }
            steps.push(node);
            debug!(thread = %self.thread_id, step = steps.len(), node = ?node, "step");

            match node {
                Node::Agent => {
                    let prompt = self.prompt_messages(&history);
                    let tools = definitions.as_deref();
                    let response = match sink.as_deref_mut() {
                        Some(on_delta) => {
                            self.provider
                                .chat_stream(&prompt, tools, &self.model, &self.request_config, on_delta)
                                .await?
                        }
                        None => {
                            self.provider
                                .chat(&prompt, tools, &self.model, &self.request_config)
                                .await?
                        }
                    };

                    let reply = response.into_message();
                    let wants_tools = self.tools.is_some() && reply.has_tool_calls();
                    if !wants_tools {
                        self.checkpointer
                            .append(&self.thread_id, std::slice::from_ref(&reply))?;
                        history.push(reply);
                        break;
                    }
                    // Stored with its results by the tools step.
                    history.push(reply);
                    node = Node::Tools;
                }
                Node::Tools => {
                    let request = history.last().cloned();
                    let results = self.run_tools(request.as_ref()).await?;
                    let exchange: Vec<Message> =
                        request.into_iter().chain(results.iter().cloned()).collect();
                    self.checkpointer.append(&self.thread_id, &exchange)?;
                    history.extend(results);
                    node = Node::Agent;
                }
            }
        }

        info!(thread = %self.thread_id, steps = steps.len(), "turn complete");
        Ok(TurnSnapshot {
            messages: history,
            steps,
            turn_start,
        })
    }

    /// The messages sent to the model: system message, then history, trimmed.
    fn prompt_messages(&self, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = &self.system_message {
            messages.push(Message::system(system.clone()));
        }
        messages.extend_from_slice(history);

        match self.max_history_tokens {
            Some(max) => {
                let trimmed = trim_messages(&messages, max, self.token_counter.as_ref());
                debug!(before = messages.len(), after = trimmed.len(), max, "trimmed history");
                trimmed
            }
            None => messages,
        }
    }

    async fn run_tools(&self, reply: Option<&Message>) -> Result<Vec<Message>> {
        let Some(registry) = &self.tools else {
            return Ok(Vec::new());
        };
        let calls = reply.map(Message::tool_calls).unwrap_or_default();

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            self.observer
                .on_tool_start(&call.function.name, &call.function.arguments);
            let output = registry
                .execute(&call.function.name, &call.function.arguments)
                .await?;
            results.push(Message::tool_result(&call.id, output));
        }
        Ok(results)
    }
}
