//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::overlay::DEFAULT_DEBOUNCE;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings file holding theme and key bindings
    pub settings_path: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Minimum spacing between accepted overlay toggles
    pub toggle_debounce: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("copyman");
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| home.join(".local").join("share"))
            .join("copyman");

        let settings_path = env_path("COPYMAN_SETTINGS")
            .unwrap_or_else(|| config_dir.join("settings.json"));
        let socket_path =
            env_path("COPYMAN_SOCKET").unwrap_or_else(|| data_dir.join("daemon.sock"));

        let toggle_debounce = match std::env::var("COPYMAN_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("invalid COPYMAN_DEBOUNCE_MS: {raw:?}"))?,
            ),
            Err(_) => DEFAULT_DEBOUNCE,
        };

        Ok(Self {
            settings_path,
            socket_path,
            data_dir,
            toggle_debounce,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
