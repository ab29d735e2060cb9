//! Cryptopanel Library
//!
//! A terminal dashboard for cryptocurrency market data that refreshes
//! progressively in the background, plus a CSV price history tracker.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod launcher;
pub mod metrics;
pub mod provider;
pub mod session;
pub mod ui;

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::LogConfig;

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize tracing subscriber for logging.
///
/// With a log file the output goes to a daily rolling file, because the
/// full-screen UI owns the terminal. Keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn init_logging(level: &str, log_file: Option<&LogConfig>) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cryptopanel={}", level).into());

    let Some(log_file) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return Ok(None);
    };

    let path = Path::new(&log_file.file_path);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .context("Log file path has no file name")?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let appender = tracing_appender::rolling::daily(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    Ok(Some(guard))
}
