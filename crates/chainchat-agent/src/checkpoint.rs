//! Thread checkpointers: where a conversation's messages live between turns.
//!
//! JSONL file format, one file per thread in `~/.chainchat/threads/{thread}.jsonl`:
//! - Line 1: `{"_type":"metadata","thread_id":"1","created_at":"..."}`
//! - Line 2+: one serialized [`Message`] per line, appended as the turn runs

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chainchat_core::config::CheckpointKind;
use chainchat_core::types::Message;
use chainchat_core::utils;

/// Persists the message history of conversation threads.
pub trait Checkpointer: Send + Sync {
    /// All messages of `thread_id` in order; empty for a new thread.
    fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Message>>;

    /// Append `messages` to the end of `thread_id`.
    fn append(&self, thread_id: &str, messages: &[Message]) -> anyhow::Result<()>;
}

/// Build the checkpointer selected in config.
pub fn open_checkpointer(kind: CheckpointKind) -> anyhow::Result<Box<dyn Checkpointer>> {
    Ok(match kind {
        CheckpointKind::Memory => Box::new(MemoryCheckpointer::new()),
        CheckpointKind::Jsonl => Box::new(JsonlCheckpointer::new(None)?),
    })
}

// ─────────────────────────────────────────────
// MemoryCheckpointer
// ─────────────────────────────────────────────

/// Process-lifetime checkpointer. Threads are lost on exit.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Checkpointer for MemoryCheckpointer {
    fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Message>> {
        let threads = self
            .threads
            .read()
            .map_err(|_| anyhow::anyhow!("checkpoint lock poisoned"))?;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    fn append(&self, thread_id: &str, messages: &[Message]) -> anyhow::Result<()> {
        let mut threads = self
            .threads
            .write()
            .map_err(|_| anyhow::anyhow!("checkpoint lock poisoned"))?;
        threads
            .entry(thread_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}

// ─────────────────────────────────────────────
// JsonlCheckpointer
// ─────────────────────────────────────────────

/// Header written as the first line of each thread file.
#[derive(Debug, Serialize, Deserialize)]
struct ThreadMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    thread_id: String,
    created_at: DateTime<Utc>,
}

/// Append-only JSONL file per thread.
pub struct JsonlCheckpointer {
    threads_dir: PathBuf,
}

impl JsonlCheckpointer {
    /// `threads_dir` defaults to `~/.chainchat/threads/` and is created if missing.
    pub fn new(threads_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let dir = threads_dir.unwrap_or_else(utils::get_threads_path);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { threads_dir: dir })
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.threads_dir
            .join(format!("{}.jsonl", utils::safe_filename(thread_id)))
    }
}

impl Checkpointer for JsonlCheckpointer {
    fn load(&self, thread_id: &str) -> anyhow::Result<Vec<Message>> {
        let path = self.thread_path(thread_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut messages = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            if lineno == 0 && serde_json::from_str::<ThreadMetadata>(&line).is_ok() {
                continue;
            }
            match serde_json::from_str::<Message>(&line) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!(path = %path.display(), line = lineno + 1, error = %e, "skipping bad checkpoint line"),
            }
        }

        debug!(thread = thread_id, messages = messages.len(), "loaded thread");
        Ok(messages)
    }

    fn append(&self, thread_id: &str, messages: &[Message]) -> anyhow::Result<()> {
        let path = self.thread_path(thread_id);
        let is_new = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        if is_new {
            let meta = ThreadMetadata {
                record_type: "metadata".to_string(),
                thread_id: thread_id.to_string(),
                created_at: Utc::now(),
            };
            writeln!(file, "{}", serde_json::to_string(&meta)?)?;
        }
        for msg in messages {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainchat_core::types::ToolCall;
    use tempfile::tempdir;

    fn exchange() -> Vec<Message> {
        vec![
            Message::user("what time is it?"),
            Message::assistant_tool_calls(vec![ToolCall::new("c1", "current_time", "{}")]),
            Message::tool_result("c1", "noon"),
            Message::assistant("It's noon."),
        ]
    }

    #[test]
    fn test_memory_roundtrip() {
        let cp = MemoryCheckpointer::new();
        assert!(cp.load("1").unwrap().is_empty());

        let msgs = exchange();
        cp.append("1", &msgs[..2]).unwrap();
        cp.append("1", &msgs[2..]).unwrap();
        assert_eq!(cp.load("1").unwrap(), msgs);
        assert!(cp.load("2").unwrap().is_empty());
    }

    #[test]
    fn test_jsonl_persists_across_instances() {
        let dir = tempdir().unwrap();
        let msgs = exchange();
        {
            let cp = JsonlCheckpointer::new(Some(dir.path().to_path_buf())).unwrap();
            cp.append("main", &msgs[..1]).unwrap();
            cp.append("main", &msgs[1..]).unwrap();
        }
        let cp = JsonlCheckpointer::new(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(cp.load("main").unwrap(), msgs);
    }

    #[test]
    fn test_jsonl_file_layout() {
        let dir = tempdir().unwrap();
        let cp = JsonlCheckpointer::new(Some(dir.path().to_path_buf())).unwrap();
        cp.append("a/b", &[Message::user("hi")]).unwrap();

        let content = std::fs::read_to_string(dir.path().join("a_b.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"_type\":\"metadata\""));
        assert!(lines[0].contains("\"thread_id\":\"a/b\""));
        assert!(lines[1].contains("\"role\":\"user\""));
    }

    #[test]
    fn test_jsonl_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let cp = JsonlCheckpointer::new(Some(dir.path().to_path_buf())).unwrap();
        cp.append("t", &[Message::user("one")]).unwrap();
        {
            let mut f = OpenOptions::new()
                .append(true)
                .open(dir.path().join("t.jsonl"))
                .unwrap();
            writeln!(f, "not json").unwrap();
        }
        cp.append("t", &[Message::assistant("two")]).unwrap();

        assert_eq!(
            cp.load("t").unwrap(),
            vec![Message::user("one"), Message::assistant("two")]
        );
    }

    #[test]
    fn test_jsonl_missing_thread_is_empty() {
        let dir = tempdir().unwrap();
        let cp = JsonlCheckpointer::new(Some(dir.path().join("threads"))).unwrap();
        assert!(cp.load("nope").unwrap().is_empty());
        assert!(dir.path().join("threads").is_dir());
    }
}
