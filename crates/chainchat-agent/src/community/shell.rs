//! Terminal tool: run shell commands in a subprocess.
//!
//! The class is only registered when the module is imported on a system with
//! `sh` on `PATH`; elsewhere the import fails and the scanner skips it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{info, warn};

use chainchat_core::utils::truncate_string;

use super::tools_module;
use crate::discovery::{ClassSpec, Module};
use crate::tools::{require_string, Tool, ToolArgs};

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 10_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Command patterns that are always refused.
const DENY_PATTERNS: &[&str] = &[
    r"\brm\s+-[rf]{1,2}\b",
    r"\b(mkfs|diskpart)\b",
    r"\bdd\s+if=",
    r">\s*/dev/sd",
    r"\b(shutdown|reboot|poweroff)\b",
    r":\(\)\s*\{.*\};\s*:", // fork bomb
];

const DESCRIPTION: &str = "Run shell commands on this machine.";

const TERMINAL: ClassSpec = ClassSpec::tool("ShellTool", "terminal", DESCRIPTION, new_terminal);

pub(super) fn module() -> Module {
    Module::new(tools_module("shell")).with_import(register)
}

fn register() -> anyhow::Result<Vec<ClassSpec>> {
    if !on_path("sh") {
        anyhow::bail!("No module named 'sh': shell not found on PATH");
    }
    Ok(vec![TERMINAL])
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

fn new_terminal() -> Arc<dyn Tool> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    Arc::new(TerminalTool::new(cwd, DEFAULT_TIMEOUT))
}

pub struct TerminalTool {
    working_dir: PathBuf,
    timeout: Duration,
    deny: Vec<Regex>,
}

impl TerminalTool {
    pub fn new(working_dir: PathBuf, timeout: Duration) -> Self {
        let deny = DENY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            working_dir,
            timeout,
            deny,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn is_denied(&self, command: &str) -> bool {
        let lower = command.to_lowercase();
        self.deny.iter().any(|re| re.is_match(&lower))
    }
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "commands": {
                    "type": "string",
                    "description": "Shell commands to run, separated by newlines or `;`"
                }
            },
            "required": ["commands"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let commands = require_string(&args, "commands")?;

        if self.is_denied(&commands) {
            warn!(commands = %commands, "command refused");
            return Ok("Error: Command refused (dangerous pattern detected)".into());
        }

        info!(commands = %commands, cwd = %self.working_dir.display(), "running shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(&commands)
            .current_dir(&self.working_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| anyhow::anyhow!("Command failed: {e}"))?,
            Err(_) => {
                return Ok(format!(
                    "Error: Command timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);

        let mut parts = Vec::new();
        if !stdout.is_empty() {
            parts.push(stdout.into_owned());
        }
        if !stderr.is_empty() {
            parts.push(format!("STDERR:\n{stderr}"));
        }
        if code != 0 {
            parts.push(format!("Exit code: {code}"));
        }
        if parts.is_empty() {
            return Ok("(no output)".into());
        }
        Ok(truncate_string(&parts.join("\n"), MAX_OUTPUT_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(cmd: &str) -> ToolArgs {
        json!({ "commands": cmd }).as_object().cloned().unwrap()
    }

    fn tool(dir: &Path, secs: u64) -> TerminalTool {
        TerminalTool::new(dir.to_path_buf(), Duration::from_secs(secs))
    }

    #[tokio::test]
    async fn test_echo() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path(), 10).execute(commands("echo hello")).await.unwrap();
        assert_eq!(result.trim(), "hello");
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path(), 10)
            .execute(commands("echo oops >&2; exit 3"))
            .await
            .unwrap();
        assert!(result.contains("STDERR:\noops"));
        assert!(result.contains("Exit code: 3"));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let result = tool(dir.path(), 10).execute(commands("ls")).await.unwrap();
        assert!(result.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let result = tool(dir.path(), 1).execute(commands("sleep 30")).await.unwrap();
        assert!(result.contains("timed out"));
    }

    #[tokio::test]
    async fn test_refuses_dangerous_commands() {
        let dir = tempfile::tempdir().unwrap();
        let t = tool(dir.path(), 10);
        for cmd in ["rm -rf /", "sudo shutdown -h now", ":() { :|:& };:"] {
            let result = t.execute(commands(cmd)).await.unwrap();
            assert!(result.starts_with("Error: Command refused"), "{cmd}");
        }
        assert!(!t.is_denied("ls -la"));
    }

    #[test]
    fn test_registered_when_sh_available() {
        if on_path("sh") {
            let classes = register().unwrap();
            assert_eq!(classes[0].tool_name, Some("terminal"));
        } else {
            assert!(register().is_err());
        }
    }
}
