//! The daemon's settings file.
//!
//! Settings are stored as JSON in `<config dir>/wlankeep/config.json`. A
//! missing or broken file is never fatal: the keeper simply runs
//! unconfigured until a valid file appears.

use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use wlankeep::TargetConfig;

const APP_DIR: &str = "wlankeep";
const FILE_NAME: &str = "config.json";

/// Default location of the settings file.
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(std::env::temp_dir);
    path.push(APP_DIR);
    path.push(FILE_NAME);
    path
}

/// Loads the settings at `path`, falling back to defaults.
pub fn load(path: &Path) -> TargetConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TargetConfig::default(),
        Err(e) => {
            warn!("Failed to read {}: {e}; using defaults", path.display());
            return TargetConfig::default();
        }
    };

    match serde_json::from_str::<TargetConfig>(&content) {
        Ok(config) => config.normalized(),
        Err(e) => {
            warn!("Invalid settings in {}: {e}; using defaults", path.display());
            TargetConfig::default()
        }
    }
}

/// Writes `config` to `path` as pretty JSON, creating the directory.
pub fn save(path: &Path, config: &TargetConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("Failed to encode settings")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Overrides applied by `configure` and one-shot commands.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub adapter: Option<String>,
    pub network: Option<String>,
    pub interval: Option<u64>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.adapter.is_none() && self.network.is_none() && self.interval.is_none()
    }

    pub fn apply(&self, mut config: TargetConfig) -> TargetConfig {
        if let Some(adapter) = &self.adapter {
            config.selected_adapter = adapter.clone();
        }
        if let Some(network) = &self.network {
            config.selected_network = network.clone();
        }
        if let Some(interval) = self.interval {
            config.poll_interval = interval;
        }
        config.normalized()
    }
}
