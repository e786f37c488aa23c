//! Current date and time.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Utc};
use serde_json::{json, Value};

use super::tools_module;
use crate::discovery::{ClassSpec, Module};
use crate::tools::{optional_bool, optional_string, Tool, ToolArgs};

const DESCRIPTION: &str = "Get the current date and time. Optionally takes a strftime format \
    string; defaults to RFC 3339.";

const CURRENT_TIME: ClassSpec =
    ClassSpec::tool("CurrentTimeTool", "current_time", DESCRIPTION, new_current_time);

pub(super) fn module() -> Module {
    Module::new(tools_module("clock")).with_classes(&[CURRENT_TIME])
}

fn new_current_time() -> Arc<dyn Tool> {
    Arc::new(CurrentTimeTool)
}

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime format, e.g. \"%Y-%m-%d %H:%M\""
                },
                "utc": {
                    "type": "boolean",
                    "description": "Use UTC instead of local time",
                    "default": false
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let utc = optional_bool(&args, "utc");
        let Some(format) = optional_string(&args, "format") else {
            return Ok(if utc {
                Utc::now().to_rfc3339()
            } else {
                Local::now().to_rfc3339()
            });
        };

        // chrono reports bad specifiers as a fmt::Error at render time.
        let mut out = String::new();
        let rendered = if utc {
            write!(out, "{}", Utc::now().format(&format))
        } else {
            write!(out, "{}", Local::now().format(&format))
        };
        match rendered {
            Ok(()) => Ok(out),
            Err(_) => Ok(format!("Error: invalid format string {format:?}")),
        }
    }
}
