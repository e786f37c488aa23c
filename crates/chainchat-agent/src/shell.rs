//! Interactive shell: reads prompts line by line and renders the answers.
//!
//! A line that is exactly [`MULTILINE_START`] opens multi-line mode; every
//! following line (newline-terminated) is collected until a line that is
//! exactly [`MULTILINE_END`]. End of input at the primary prompt ends the
//! session cleanly. End of input inside multi-line mode drops the unfinished
//! prompt and also ends the session.
//!
//! A blank single line is an empty Enter press and is not sent. A completed
//! multi-line block is always sent, even when empty.

use anyhow::Result;
use tracing::debug;

use chainchat_core::attachment::Attachment;

use crate::engine::{Chat, Renderer};

pub const BANNER: &str = "Chat - Ctrl-D to exit";
pub const MULTILINE_HINT: &str = "Enter >>> for multiline mode, then <<< to finish";

pub const MULTILINE_START: &str = ">>>";
pub const MULTILINE_END: &str = "<<<";

pub const PROMPT: &str = "> ";
pub const CONTINUATION_PROMPT: &str = ". ";

/// Where the shell reads its input from.
pub trait LineSource {
    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Remember a submitted prompt for recall.
    fn add_history(&mut self, _entry: &str) {}
}

/// Run the read-prompt-render loop until end of input.
///
/// `attachments` go with the first prompt only. Returns the number of prompts
/// sent. Model and tool failures end the session with an error.
pub async fn run(
    chat: &Chat,
    source: &mut dyn LineSource,
    renderer: &mut dyn Renderer,
    attachments: Option<Vec<Attachment>>,
) -> Result<usize> {
    let mut attachments = attachments.filter(|a| !a.is_empty());
    let mut sent = 0;

    while let Some((prompt, multiline)) = read_prompt(source)? {
        if !multiline && prompt.trim().is_empty() {
            continue;
        }
        source.add_history(&prompt);

        debug!(thread = chat.thread_id(), chars = prompt.len(), "sending prompt");
        let pending = attachments.take();
        chat.prompt(&prompt, pending.as_deref(), renderer).await?;
        sent += 1;
    }

    debug!(prompts = sent, "shell finished");
    Ok(sent)
}

/// Read one complete prompt, flagged when it came from a multi-line block.
fn read_prompt(source: &mut dyn LineSource) -> Result<Option<(String, bool)>> {
    let Some(line) = source.read_line(PROMPT)? else {
        return Ok(None);
    };
    if line != MULTILINE_START {
        return Ok(Some((line, false)));
    }

    let mut prompt = String::new();
    loop {
        match source.read_line(CONTINUATION_PROMPT)? {
            Some(line) if line == MULTILINE_END => return Ok(Some((prompt, true))),
            Some(line) => {
                prompt.push_str(&line);
                prompt.push('\n');
            }
            None => {
                debug!("end of input in multi-line mode, dropping prompt");
                return Ok(None);
            }
        }
    }
}
