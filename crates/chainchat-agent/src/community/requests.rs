//! HTTP GET tool. Registered by import.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use chainchat_core::utils::truncate_string;

use super::tools_module;
use crate::discovery::{ClassSpec, Module};
use crate::tools::{optional_u64, require_string, Tool, ToolArgs};

const USER_AGENT: &str = concat!("chainchat/", env!("CARGO_PKG_VERSION"));

/// Max chars of response body returned to the model.
const DEFAULT_MAX_CHARS: usize = 50_000;

const DESCRIPTION: &str = "A portal to the internet. Use this when you need to get specific \
    content from a website. Input should be a url (i.e. https://www.google.com). \
    The output will be the text response of the GET request.";

const REQUESTS_GET: ClassSpec =
    ClassSpec::tool("RequestsGetTool", "requests_get", DESCRIPTION, new_requests_get);

pub(super) fn module() -> Module {
    Module::new(tools_module("requests")).with_import(register)
}

fn register() -> anyhow::Result<Vec<ClassSpec>> {
    Ok(vec![REQUESTS_GET])
}

fn new_requests_get() -> Arc<dyn Tool> {
    Arc::new(RequestsGetTool::new())
}

pub struct RequestsGetTool {
    client: Client,
}

impl RequestsGetTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .redirect(reqwest::redirect::Policy::limited(5))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for RequestsGetTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RequestsGetTool {
    fn name(&self) -> &str {
        "requests_get"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "maxChars": {
                    "type": "integer",
                    "description": "Maximum characters to return (default 50000)",
                    "minimum": 100
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let url = require_string(&args, "url")?;
        let max_chars = optional_u64(&args, "maxChars")
            .map(|n| (n as usize).max(100))
            .unwrap_or(DEFAULT_MAX_CHARS);

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Ok(format!("Error: invalid URL {url}: must start with http:// or https://"));
        }

        debug!(url = %url, "GET");
        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => return Ok(format!("Error: request failed: {e}")),
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => return Ok(format!("Error: failed to read response body: {e}")),
        };
        if !status.is_success() {
            return Ok(format!("Error: {status}: {}", truncate_string(&body, max_chars)));
        }
        Ok(truncate_string(&body, max_chars))
    }
}
