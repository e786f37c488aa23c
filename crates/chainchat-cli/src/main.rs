//! Chainchat CLI: entry point.
//!
//! # Commands
//!
//! - `chainchat chat [PROMPT] [--tool NAME]...`: one-shot prompt or interactive shell
//! - `chainchat list-tools`: discoverable tools and their descriptions
//! - `chainchat providers`: registered providers and their key status

mod helpers;
mod providers;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{debug, info};

use chainchat_agent::discovery::{ToolError, ToolIndexCache, ToolLoader};
use chainchat_agent::{open_checkpointer, Chat, PluginManager, Tool};
use chainchat_core::attachment::Attachment;
use chainchat_core::config::{load_config, CheckpointKind, Config};
use chainchat_core::utils::expand_home;
use chainchat_providers::http_provider::create_provider;
use chainchat_providers::traits::LlmRequestConfig;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Chat with LLMs from the terminal, optionally with tools
#[derive(Parser)]
#[command(name = "chainchat", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt, or start an interactive chat when no prompt is given
    Chat(ChatArgs),

    /// List discoverable tools
    ListTools {
        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show registered providers and whether each is configured
    Providers,
}

#[derive(Args)]
struct ChatArgs {
    /// Prompt to send. Omit for the interactive shell.
    prompt: Option<String>,

    /// Tool to bind (repeatable)
    #[arg(short = 'T', long = "tool", value_name = "NAME")]
    tools: Vec<String>,

    /// Trim history sent to the model to this many tokens
    #[arg(long, value_name = "N")]
    max_history_tokens: Option<usize>,

    /// System message
    #[arg(short, long)]
    system: Option<String>,

    /// Attach a file (media type guessed from the extension)
    #[arg(short, long = "attach", value_name = "PATH")]
    attach: Vec<PathBuf>,

    /// Attach a file with an explicit media type
    #[arg(long = "attach-type", num_args = 2, value_names = ["PATH", "MIME"])]
    attach_type: Vec<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Provider to use instead of matching on the model name
    #[arg(long)]
    provider: Option<String>,

    /// Conversation thread identifier
    #[arg(long = "thread", value_name = "ID")]
    thread: Option<String>,

    /// Where thread history is kept: memory or jsonl
    #[arg(long)]
    checkpoint: Option<CheckpointKind>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    logs: bool,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat(args) => {
            init_logging(args.logs);
            run_chat(args).await
        }
        Commands::ListTools { logs } => {
            init_logging(logs);
            list_tools()
        }
        Commands::Providers => providers::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(args: ChatArgs) -> Result<()> {
    let mut config = load_config(None);
    apply_chat_args(&mut config, &args);

    let attachments = collect_attachments(&args);
    let plugins = PluginManager::with_builtins();
    let chat = build_chat(&config, &plugins, &args.tools)?;

    match args.prompt {
        Some(prompt) => {
            info!(thread = chat.thread_id(), "one-shot prompt");
            let mut renderer = helpers::TerminalRenderer::default();
            chat.prompt(&prompt, attachments.as_deref(), &mut renderer)
                .await
                .context("chat failed")?;
        }
        None => repl::run(&chat, attachments).await?,
    }

    Ok(())
}

/// CLI flags override the loaded config.
fn apply_chat_args(config: &mut Config, args: &ChatArgs) {
    let chat = &mut config.chat;
    if let Some(model) = &args.model {
        chat.model = model.clone();
    }
    if let Some(provider) = &args.provider {
        chat.provider = Some(provider.clone());
    }
    if let Some(system) = &args.system {
        chat.system_message = Some(system.clone());
    }
    if let Some(max) = args.max_history_tokens {
        chat.max_history_tokens = Some(max);
    }
    if let Some(thread) = &args.thread {
        chat.thread_id = thread.clone();
    }
    if let Some(checkpoint) = args.checkpoint {
        chat.checkpoint = checkpoint;
    }
}

fn collect_attachments(args: &ChatArgs) -> Option<Vec<Attachment>> {
    let mut attachments: Vec<Attachment> = args
        .attach
        .iter()
        .map(|path| Attachment::from_path(path.clone(), None))
        .collect();
    for pair in args.attach_type.chunks_exact(2) {
        attachments.push(Attachment::from_path(&pair[0], Some(pair[1].clone())));
    }
    (!attachments.is_empty()).then_some(attachments)
}

/// Build the conversation engine from config and the requested tool names.
fn build_chat(config: &Config, plugins: &PluginManager, tool_args: &[String]) -> Result<Chat> {
    let defaults = &config.chat;

    let names = if tool_args.is_empty() {
        &config.tools.default_tools
    } else {
        tool_args
    };
    let tools = resolve_tools(config, plugins, names)?;

    let specs = plugins.providers();
    let provider = create_provider(
        &specs,
        &defaults.model,
        defaults.provider.as_deref(),
        &config.providers,
    )?;

    let chat = Chat::new(Arc::new(provider), defaults.model.clone(), tools)
        .with_system_message(defaults.system_message.clone())
        .with_max_history_tokens(defaults.max_history_tokens)
        .with_thread_id(defaults.thread_id.clone())
        .with_checkpointer(open_checkpointer(defaults.checkpoint)?)
        .with_observer(Box::new(helpers::StderrToolObserver))
        .with_max_steps(defaults.max_steps)
        .with_request_config(LlmRequestConfig {
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        });

    info!(
        model = %defaults.model,
        tools = ?chat.tool_names(),
        checkpoint = %defaults.checkpoint,
        "chat ready"
    );
    Ok(chat)
}

/// Resolve tool names, turning an unknown name into a usage error.
fn resolve_tools(
    config: &Config,
    plugins: &PluginManager,
    names: &[String],
) -> Result<Option<Vec<Arc<dyn Tool>>>> {
    if names.is_empty() {
        return Ok(None);
    }
    let loader = open_loader(config, plugins)?;
    match loader.resolve(Some(names)) {
        Ok(tools) => Ok(tools),
        Err(e @ ToolError::NotFound { .. }) => {
            Cli::command().error(ErrorKind::InvalidValue, e).exit()
        }
        Err(e) => Err(e.into()),
    }
}

fn open_loader(config: &Config, plugins: &PluginManager) -> Result<ToolLoader> {
    let cache_path = expand_home(&config.tools.cache_path);
    debug!(path = %cache_path.display(), "opening tool cache");
    let cache = ToolIndexCache::open(&cache_path)?;
    Ok(ToolLoader::new(plugins.ecosystem(), cache))
}

// ─────────────────────────────────────────────
// list-tools
// ─────────────────────────────────────────────

fn list_tools() -> Result<()> {
    let config = load_config(None);
    let plugins = PluginManager::with_builtins();
    let loader = open_loader(&config, &plugins)?;
    helpers::print_tools(&loader.descriptions()?);
    Ok(())
}

/// Initialize tracing/logging (to stderr).
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("chainchat=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
