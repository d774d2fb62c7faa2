//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a sensible default so the application works out of the box.

use crate::app::navigation::DEFAULT_MAX_HISTORY;
use crate::app::tasks::DEFAULT_MAX_WORKERS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Window and status bar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_max_notifications")]
    pub max_notifications: usize,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            tick_rate_ms: default_tick_rate(),
            max_notifications: default_max_notifications(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Back-history depth; the oldest entry is dropped beyond this.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_initial_route")]
    pub initial_route: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            initial_route: default_initial_route(),
        }
    }
}

/// Background worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

/// Diagnostic log settings. The terminal belongs to the UI, so logs go to a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_title() -> String {
    "Pagewright".to_string()
}
fn default_tick_rate() -> u64 {
    250
}
fn default_max_notifications() -> usize {
    5
}
fn default_timestamp_format() -> String {
    "%H:%M:%S".to_string()
}
fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}
fn default_initial_route() -> String {
    "home".to_string()
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pagewright")
        .join("pagewright.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.navigation.max_history, 20);
        assert_eq!(config.navigation.initial_route, "home");
        assert_eq!(config.tasks.max_workers, 5);
        assert_eq!(config.ui.tick_rate_ms, 250);
        assert!(config.logging.enabled);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [navigation]
            max_history = 3

            [ui]
            title = "Demo"
            "#,
        )
        .unwrap();
        assert_eq!(config.navigation.max_history, 3);
        assert_eq!(config.navigation.initial_route, "home");
        assert_eq!(config.ui.title, "Demo");
        assert_eq!(config.ui.max_notifications, 5);
    }
}
