//! Interactive shell on a terminal.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use chainchat_agent::shell::{self, LineSource};
use chainchat_agent::Chat;
use chainchat_core::attachment::Attachment;

use crate::helpers;

/// Run the shell until Ctrl-D.
pub async fn run(chat: &Chat, attachments: Option<Vec<Attachment>>) -> Result<()> {
    helpers::print_banner();

    let mut source = RustylineSource::new()?;
    let mut renderer = helpers::TerminalRenderer::default();
    let result = shell::run(chat, &mut source, &mut renderer, attachments).await;
    source.save_history();

    result.map(|sent| debug!(prompts = sent, "shell closed"))
}

/// Line source backed by a rustyline editor.
struct RustylineSource {
    editor: Editor<(), DefaultHistory>,
}

impl RustylineSource {
    fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(1000)?;

        let path = history_path();
        if path.exists() {
            let _ = editor.load_history(&path);
            debug!("loaded shell history from {}", path.display());
        }
        Ok(Self { editor })
    }

    fn save_history(&mut self) {
        let path = history_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(&path) {
            debug!("failed to save history: {e}");
        }
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            // Ctrl-D, and Ctrl-C, end the session.
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn add_history(&mut self, entry: &str) {
        let _ = self.editor.add_history_entry(entry.trim_end());
    }
}

/// Path to the history file.
fn history_path() -> PathBuf {
    chainchat_core::utils::get_data_path()
        .join("history")
        .join("chat_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_path_under_data_dir() {
        let path = history_path();
        assert!(path.to_string_lossy().contains(".chainchat"));
        assert!(path.ends_with("history/chat_history"));
    }
}
