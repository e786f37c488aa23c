//! File management tools: read, write, and list files.
//!
//! Expected I/O failures (missing file, permission denied) come back as an
//! `Error: ...` result so the model can react; only malformed calls fail.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use chainchat_core::utils::expand_home;

use super::tools_module;
use crate::discovery::{Capability, ClassSpec, Module};
use crate::tools::{optional_bool, optional_string, require_string, Tool, ToolArgs};

const READ_FILE_DESCRIPTION: &str = "Read file from disk";
const WRITE_FILE_DESCRIPTION: &str = "Write file to disk";
const LIST_DIRECTORY_DESCRIPTION: &str = "List files and directories in a specified folder";

/// Shared base of the file tools; abstract, so never listed.
const BASE_FILE_TOOL: ClassSpec = ClassSpec {
    name: "BaseFileTool",
    bases: &[Capability::Tool],
    tool_name: None,
    description: None,
    factory: None,
};

const READ_FILE: ClassSpec =
    ClassSpec::tool("ReadFileTool", "read_file", READ_FILE_DESCRIPTION, new_read_file);
const WRITE_FILE: ClassSpec =
    ClassSpec::tool("WriteFileTool", "write_file", WRITE_FILE_DESCRIPTION, new_write_file);
const LIST_DIRECTORY: ClassSpec = ClassSpec::tool(
    "ListDirectoryTool",
    "list_directory",
    LIST_DIRECTORY_DESCRIPTION,
    new_list_directory,
);

/// Bundles the file tools; a toolkit, not a tool.
const TOOLKIT: ClassSpec = ClassSpec {
    name: "FileManagementToolkit",
    bases: &[Capability::Toolkit],
    tool_name: None,
    description: None,
    factory: None,
};

pub(super) fn module() -> Module {
    Module::new(tools_module("file_management")).with_classes(&[
        BASE_FILE_TOOL,
        READ_FILE,
        WRITE_FILE,
        LIST_DIRECTORY,
        TOOLKIT,
    ])
}

fn new_read_file() -> Arc<dyn Tool> {
    Arc::new(ReadFileTool)
}

fn new_write_file() -> Arc<dyn Tool> {
    Arc::new(WriteFileTool)
}

fn new_list_directory() -> Arc<dyn Tool> {
    Arc::new(ListDirectoryTool)
}

// ─────────────────────────────────────────────
// ReadFileTool
// ─────────────────────────────────────────────

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        READ_FILE_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "name of file"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let path = expand_home(&require_string(&args, "file_path")?);
        debug!(path = %path.display(), "reading file");

        if !path.exists() {
            return Ok(format!("Error: no such file or directory: {}", path.display()));
        }
        if !path.is_file() {
            return Ok(format!("Error: {} is not a file", path.display()));
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}

// ─────────────────────────────────────────────
// WriteFileTool
// ─────────────────────────────────────────────

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        WRITE_FILE_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "name of file"
                },
                "text": {
                    "type": "string",
                    "description": "text to write to file"
                },
                "append": {
                    "type": "boolean",
                    "description": "Whether to append to an existing file.",
                    "default": false
                }
            },
            "required": ["file_path", "text"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let path = expand_home(&require_string(&args, "file_path")?);
        let text = require_string(&args, "text")?;
        let append = optional_bool(&args, "append");
        debug!(path = %path.display(), append, "writing file");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Ok(format!("Error: {e}"));
            }
        }

        let written = if append {
            use std::io::Write;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut f| f.write_all(text.as_bytes()))
        } else {
            std::fs::write(&path, &text)
        };

        match written {
            Ok(()) => Ok(format!("File written successfully to {}.", path.display())),
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}

// ─────────────────────────────────────────────
// ListDirectoryTool
// ─────────────────────────────────────────────

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        LIST_DIRECTORY_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dir_path": {
                    "type": "string",
                    "description": "Subdirectory to list.",
                    "default": "."
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let dir: PathBuf = expand_home(&optional_string(&args, "dir_path").unwrap_or_else(|| ".".into()));

        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) => return Ok(format!("Error: {e}")),
        };

        let mut entries: Vec<String> = read
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    format!("{name}/")
                } else {
                    name
                }
            })
            .collect();
        entries.sort();

        if entries.is_empty() {
            return Ok(format!("No files found in directory {}", dir.display()));
        }
        Ok(entries.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("note.txt");
        let path_str = path.to_string_lossy().to_string();

        let result = WriteFileTool
            .execute(args(json!({"file_path": path_str, "text": "hello"})))
            .await
            .unwrap();
        assert!(result.starts_with("File written successfully"));

        WriteFileTool
            .execute(args(json!({"file_path": path_str, "text": " world", "append": true})))
            .await
            .unwrap();

        let content = ReadFileTool
            .execute(args(json!({"file_path": path_str})))
            .await
            .unwrap();
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn test_read_missing_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let result = ReadFileTool
            .execute(args(json!({"file_path": path.to_string_lossy()})))
            .await
            .unwrap();
        assert!(result.starts_with("Error: no such file"));
    }

    #[tokio::test]
    async fn test_read_requires_path() {
        assert!(ReadFileTool.execute(ToolArgs::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let result = ListDirectoryTool
            .execute(args(json!({"dir_path": dir.path().to_string_lossy()})))
            .await
            .unwrap();
        assert_eq!(result, "a.txt\nb.txt\nnested/");
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = ListDirectoryTool
            .execute(args(json!({"dir_path": dir.path().to_string_lossy()})))
            .await
            .unwrap();
        assert!(result.starts_with("No files found"));
    }

    #[test]
    fn test_module_declares_abstract_and_toolkit() {
        let module = module();
        let named: Vec<_> = module.classes.iter().filter_map(|c| c.tool_name).collect();
        assert_eq!(named, vec!["read_file", "write_file", "list_directory"]);
        assert!(module
            .classes
            .iter()
            .any(|c| c.is_subtype_of(Capability::Toolkit)));
    }
}
