//! Diagnostic logging.
//!
//! The terminal is owned by the UI, so `tracing` output is written to a log
//! file (default `~/.local/share/pagewright/pagewright.log`). The level comes
//! from the config and can be overridden with `PAGEWRIGHT_LOG`, which accepts
//! any `EnvFilter` directive.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PAGEWRIGHT_LOG";

/// Install the global subscriber. Returns the log file path, or `None` when
/// logging is disabled.
pub fn init(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    if !config.enabled {
        return Ok(None);
    }

    let path = config.file.clone();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(&config.level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;

    Ok(Some(path))
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log a contained failure together with where it happened.
pub fn log_exception<E: Display + ?Sized>(context: &str, error: &E) {
    tracing::error!(context = %context, error = %format!("{error:#}"), "contained failure");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_logging_installs_nothing() {
        let config = LoggingConfig {
            enabled: false,
            ..LoggingConfig::default()
        };
        assert!(init(&config).unwrap().is_none());
    }

    #[test]
    fn test_bad_level_falls_back() {
        // an unparsable directive must not panic
        let _ = filter("[[[not a level");
    }
}
