//! History trimming to a token budget.
//!
//! Keeps the most recent whole messages that fit. A leading system message is
//! always kept and counted against the budget. The kept window starts on a
//! human message and ends on a human or tool message, so an AI tool-call
//! request is never separated from its results.

use chainchat_core::types::{Message, Role};

/// Counts tokens for a run of messages.
pub trait TokenCounter: Send + Sync {
    fn count(&self, messages: &[Message]) -> usize;
}

/// Roughly four characters per token plus a fixed per-message overhead.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApproxTokenCounter;

const CHARS_PER_TOKEN: usize = 4;
const TOKENS_PER_MESSAGE: usize = 3;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| {
                let calls: usize = m
                    .tool_calls()
                    .iter()
                    .map(|c| c.function.name.chars().count() + c.function.arguments.chars().count())
                    .sum();
                (m.text().chars().count() + calls).div_ceil(CHARS_PER_TOKEN) + TOKENS_PER_MESSAGE
            })
            .sum()
    }
}

/// Trim `messages` to at most `max_tokens` as counted by `counter`.
pub fn trim_messages(
    messages: &[Message],
    max_tokens: usize,
    counter: &dyn TokenCounter,
) -> Vec<Message> {
    let (system, mut rest) = match messages.split_first() {
        Some((first, rest)) if first.role() == Role::System => (Some(first), rest),
        _ => (None, messages),
    };

    // End on a human or tool message.
    while let Some((last, init)) = rest.split_last() {
        if matches!(last.role(), Role::Human | Role::Tool) {
            break;
        }
        rest = init;
    }

    let budget = max_tokens.saturating_sub(system.map_or(0, |s| counter.count(std::slice::from_ref(s))));

    // Largest suffix within budget.
    let mut start = rest.len();
    while start > 0 && counter.count(&rest[start - 1..]) <= budget {
        start -= 1;
    }
    let mut window = &rest[start..];

    // Start on a human message.
    while let Some((first, tail)) = window.split_first() {
        if first.role() == Role::Human {
            break;
        }
        window = tail;
    }

    system.into_iter().chain(window).cloned().collect()
}
