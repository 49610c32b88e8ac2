//! Persisted audio settings
//!
//! The monitor remembers the last device selection in a YAML file so the
//! next run reopens the same devices. A missing or unreadable file is not an
//! error: the engine falls back to the platform defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use daiw_core::EngineConfig;

/// Config file name inside the application config directory
pub const CONFIG_FILE_NAME: &str = "audio.yaml";

/// Default settings path
///
/// Returns: `{config_dir}/daiw/audio.yaml` (e.g. `~/.config/daiw/audio.yaml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daiw")
        .join(CONFIG_FILE_NAME)
}

/// Load settings from a YAML file
///
/// Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> EngineConfig {
    if !path.exists() {
        log::info!("No audio settings at {:?}, using defaults", path);
        return EngineConfig::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("Failed to read audio settings {:?}: {}, using defaults", path, e);
            return EngineConfig::default();
        }
    };

    match serde_yaml::from_str::<EngineConfig>(&contents) {
        Ok(config) => {
            log::info!("Loaded audio settings from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Failed to parse audio settings {:?}: {}, using defaults", path, e);
            EngineConfig::default()
        }
    }
}

/// Save settings to a YAML file, creating parent directories as needed
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize audio settings")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write audio settings: {:?}", path))?;

    log::info!("Saved audio settings to {:?}", path);
    Ok(())
}
