//! Shared observability helpers for binaries and integration tests.
//!
//! The logging initializer centralises our `tracing` setup. Call
//! [`init_logging`] once near process start; additional callers are treated
//! as no-ops and simply receive the originally resolved log file path.
//!
//! stdout is reserved for the response envelope, so events go to `stderr`
//! and, when a directory is configured, to a daily rolling file.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

pub const LOG_DIR_ENV: &str = "SIPHON_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for file names).
    pub app_name: &'static str,
    /// Optional explicit directory for a rolling file sink. If `None`, we
    /// consult `SIPHON_LOG_DIR`; when that is unset too, no file is written.
    pub log_dir: Option<PathBuf>,
    /// Whether to emit events to `stderr`.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "siphon",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Returns the concrete log file path for the current day, or `None` when
/// only `stderr` is in use.
pub fn init_logging(config: LogConfig) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let mut full_path = None;
    let mut file_writer = None;
    if let Some(dir) = resolve_log_dir(config.log_dir.as_deref()) {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

        let log_filename = format!("{}.log", config.app_name);
        let today = Local::now().format("%Y-%m-%d").to_string();
        full_path = Some(dir.join(format!("{log_filename}.{today}")));

        let appender = rolling::daily(dir, log_filename);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        file_writer = Some(writer);
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    match config.format {
        LogFormat::Text => {
            let file = file_writer.map(|w| fmt::layer().with_writer(w).with_ansi(false));
            let stderr = config
                .emit_stderr
                .then(|| fmt::layer().with_writer(std::io::stderr));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file)
                .with(stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
        LogFormat::Json => {
            let file = file_writer.map(|w| fmt::layer().json().with_writer(w));
            let stderr = config
                .emit_stderr
                .then(|| fmt::layer().json().with_writer(std::io::stderr));
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file)
                .with(stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
    }

    let _ = LOG_PATH.set(full_path.clone());
    Ok(full_path)
}

fn resolve_log_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(expand_home(dir));
    }

    std::env::var(LOG_DIR_ENV)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| expand_home(Path::new(&raw)))
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
