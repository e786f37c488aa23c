//! Terminal output: streamed answers, tool call notices, banner, listings.

use std::collections::BTreeMap;
use std::io::{self, Write};

use colored::Colorize;

use chainchat_agent::shell::{BANNER, MULTILINE_HINT};
use chainchat_agent::{Renderer, ToolObserver};

/// Writes answer fragments to stdout as they arrive.
#[derive(Default)]
pub struct TerminalRenderer {
    wrote: bool,
}

impl Renderer for TerminalRenderer {
    fn begin(&mut self) {
        self.wrote = false;
    }

    fn chunk(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
        self.wrote |= !text.is_empty();
    }

    fn end(&mut self) {
        if self.wrote {
            println!();
        } else {
            println!("{}", "(no response)".dimmed());
        }
    }
}

/// Prints `Tool: NAME INPUT` to stderr before each tool runs.
pub struct StderrToolObserver;

impl ToolObserver for StderrToolObserver {
    fn on_tool_start(&self, name: &str, input: &str) {
        eprintln!("{}", tool_notice(name, input).dimmed().italic());
    }
}

fn tool_notice(name: &str, input: &str) -> String {
    format!("Tool: {name} {input}")
}

/// Print the banner shown at shell start.
pub fn print_banner() {
    println!("{}", BANNER.bold());
    println!("{}", MULTILINE_HINT.dimmed());
}

/// Print `name: description` for each tool.
pub fn print_tools(tools: &BTreeMap<&str, Option<&str>>) {
    if tools.is_empty() {
        println!("{}", "No tools found.".dimmed());
        return;
    }
    for (name, description) in tools {
        println!("{}", tool_line(name, *description));
    }
}

fn tool_line(name: &str, description: Option<&str>) -> String {
    match description {
        Some(d) => format!("{}: {d}", name.bold()),
        None => format!("{}", name.bold()),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
