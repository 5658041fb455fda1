//! KXA CLI - chat with the knowledge-extraction agent from a terminal
//!
//! Answers are printed as they stream in.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kxa_client::{ClientConfig, FramingMode, KxaClient};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::Interrupt;
use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "kxa-cli")]
#[command(author, version, about = "Knowledge-extraction agent CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Agent base URL (the stream path is appended)
    #[arg(short, long, env = "KXA_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "KXA_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Frame delimiting used by the agent
    #[arg(long, value_enum)]
    framing: Option<FramingArg>,

    /// Print the context object after each answer
    #[arg(long)]
    show_context: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and stream the answer
    Ask {
        /// Question text (words are joined with spaces)
        #[arg(required = true)]
        question: Vec<String>,

        /// System prompt sent before the question
        #[arg(long)]
        system: Option<String>,
    },

    /// Start an interactive chat session
    Chat {
        /// System prompt sent at the start of the conversation
        #[arg(long)]
        system: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FramingArg {
    /// One frame per `data:` line
    Line,
    /// Frames separated by blank lines
    Block,
}

impl From<FramingArg> for FramingMode {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Line => FramingMode::Line,
            FramingArg::Block => FramingMode::Block,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stderr keeps logs out of the streamed answer
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let system = match &cli.command {
        Commands::Ask { system, .. } | Commands::Chat { system } => system.as_deref(),
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.server.as_deref(),
        cli.framing.map(Into::into),
        system,
        cli.no_color,
    );

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet, cli.show_context);

    let client = create_client(&merged)?;
    let interrupt = Interrupt::install().context("Failed to install Ctrl+C handler")?;

    // Execute command
    match &cli.command {
        Commands::Ask { question, .. } => {
            let question = question.join(" ");
            commands::ask(
                &client,
                &question,
                merged.system_prompt.as_deref(),
                &interrupt,
                &ctx,
            )
            .await?;
        }

        Commands::Chat { .. } => {
            commands::chat(&client, merged.system_prompt.as_deref(), &interrupt, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a client for the resolved configuration
fn create_client(merged: &MergedConfig) -> Result<KxaClient> {
    let config = ClientConfig {
        framing: merged.framing,
        ..ClientConfig::default()
    };
    KxaClient::with_config(&merged.server, config).context("Failed to create agent client")
}
