//! Output rendering for kxa-cli (streamed text or JSON lines)

use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use kxa_client::{ChatResponse, DecodedEvent, StreamOutcome};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Answer text as it streams in (default)
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub show_context: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool, show_context: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self {
            format,
            quiet,
            show_context,
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.dimmed());
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print the input prompt
    pub fn prompt(&self) {
        print!("{} ", ">".green().bold());
        let _ = std::io::stdout().flush();
    }

    /// Render one streamed event
    pub fn event(&self, event: &DecodedEvent) {
        match self.format {
            OutputFormat::Text => {
                if let Some(delta) = &event.delta {
                    print!("{}", delta);
                    let _ = std::io::stdout().flush();
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Render the end of a reply
    pub fn finish(&self, response: &ChatResponse) {
        match self.format {
            OutputFormat::Text => {
                if !response.text.is_empty() {
                    println!();
                }
                for attachment in &response.attachments {
                    println!("{}", format_block("attachment", attachment).cyan());
                }
                if self.show_context {
                    if let Some(context) = &response.context {
                        println!("{}", format_block("context", context).dimmed());
                    }
                }
                if response.outcome == Some(StreamOutcome::Cancelled) {
                    self.warn("[cancelled]");
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "outcome": response.outcome }));
            }
        }
    }
}

/// Label and pretty-print a JSON value
fn format_block(label: &str, value: &serde_json::Value) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("[{}] {}", label, body)
}
