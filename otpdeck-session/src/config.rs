//! Session configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::mutate::DEFAULT_DEBOUNCE_MS;
use crate::sched::DEFAULT_GRACE_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Margin past a rotation boundary before refetching, in ms.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Per-origin quiet window between mutation submissions, in ms.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Scanner surface geometry.
    #[serde(default = "default_scanner_width")]
    pub scanner_width: u32,

    #[serde(default = "default_scanner_height")]
    pub scanner_height: u32,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_grace_ms() -> u64 {
    DEFAULT_GRACE_MS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_scanner_width() -> u32 {
    510
}

fn default_scanner_height() -> u32 {
    730
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
            debounce_ms: default_debounce_ms(),
            scanner_width: default_scanner_width(),
            scanner_height: default_scanner_height(),
            log_level: default_log_level(),
        }
    }
}

/// Load configuration from the default location or use defaults.
pub fn load_config() -> Result<SessionConfig> {
    let config_path = project_dirs()
        .map(|d| d.config_dir().join("session.toml"))
        .unwrap_or_else(|| PathBuf::from("otpdeck-session.toml"));

    load_config_from(&config_path)
}

/// Load configuration from a specific path; absent file means defaults.
pub fn load_config_from(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        return Ok(SessionConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    let config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;

    Ok(config)
}

/// Initialize tracing for embedders that have no subscriber of their own.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &SessionConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "otpdeck", "otpdeck")
}
