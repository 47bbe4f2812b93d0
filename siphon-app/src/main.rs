use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use siphon_action::ScrapeHandler;
use siphon_common::observability::{LogConfig, init_logging};
use siphon_config::{SiphonConfig, SiphonConfigLoader};
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (plain env vars win over file)
    let mut loader = SiphonConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let cfg: SiphonConfig = loader.load().context("loading configuration")?;

    // 2) Logs go to stderr; stdout carries the response
    let log_file = init_logging(LogConfig {
        log_dir: cli.log_dir.clone(),
        format: cli.log_format,
        ..LogConfig::default()
    })?;
    tracing::debug!(?cfg, log_file = ?log_file, "siphon.start");

    let event = cli.event(std::io::stdin().lock())?;
    let handler = ScrapeHandler::from_config(cfg).context("building HTTP client")?;

    let out = if cli.report {
        serde_json::to_string_pretty(&handler.report(&event).await)?
    } else {
        serde_json::to_string(&handler.handle(&event).await?)?
    };
    println!("{out}");

    Ok(())
}
