//! Tracing setup shared by the binaries.
//!
//! Logs go to stderr and to a daily-rolling file under `<home>/logs/`.
//! `DEPLOYBOARD_LOG` takes precedence over the level passed in.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::paths;

const LOG_ENV: &str = "DEPLOYBOARD_LOG";
const LOG_FILE_PREFIX: &str = "deployboard.log";

/// Installs the global subscriber.
///
/// Keep the returned guard alive for the lifetime of the process; dropping it
/// flushes and stops the file writer.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init(default_level: &str) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let logs_dir = paths::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
