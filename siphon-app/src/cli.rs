use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use siphon_action::InvocationEvent;
use siphon_common::observability::LogFormat;
use std::io::Read;
use std::path::PathBuf;

/// Scrape one web page and print the agent response envelope.
#[derive(Parser, Debug)]
#[command(name = "siphon")]
#[command(version)]
#[command(about = "Fetch a page and print its readable text as an agent response")]
#[command(long_about = None)]
#[command(group(ArgGroup::new("input").args(["event", "url", "text"])))]
pub struct Cli {
    /// Invocation event JSON file (`-` for stdin, the default)
    #[arg(long, value_name = "FILE")]
    pub event: Option<PathBuf>,

    /// Scrape this URL directly
    #[arg(long)]
    pub url: Option<String>,

    /// Free text to search for a URL
    #[arg(long)]
    pub text: Option<String>,

    /// YAML/TOML/JSON configuration file
    #[arg(long, value_name = "FILE", env = "SIPHON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print the flat scrape report instead of the envelope
    #[arg(long)]
    pub report: bool,

    #[arg(long, default_value = "text", env = "SIPHON_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Also write a daily log file here
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Build the invocation from flags, falling back to a JSON event on `stdin`.
    pub fn event(&self, stdin: impl Read) -> Result<InvocationEvent> {
        if let Some(url) = &self.url {
            return Ok(InvocationEvent::for_url(url.clone()));
        }
        if let Some(text) = &self.text {
            return Ok(InvocationEvent::for_text(text.clone()));
        }
        match &self.event {
            Some(path) if path.as_os_str() != "-" => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading event file {}", path.display()))?;
                parse_event(&raw)
            }
            _ => read_event(stdin),
        }
    }
}

fn read_event(mut reader: impl Read) -> Result<InvocationEvent> {
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .context("reading event from stdin")?;
    parse_event(&raw)
}

fn parse_event(raw: &str) -> Result<InvocationEvent> {
    if raw.trim().is_empty() {
        return Ok(InvocationEvent::default());
    }
    serde_json::from_str(raw).context("event is not valid JSON")
}
