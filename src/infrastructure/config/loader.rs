use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use super::app_config::AppConfig;
use super::paths::config_dir;

/// Load a YAML configuration file from disk
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Save a configuration to a YAML file
pub fn save_yaml<T: Serialize>(path: impl AsRef<Path>, config: &T) -> anyhow::Result<()> {
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the application config from settings.yaml in the user config
/// directory. Missing or invalid files fall back to defaults.
pub fn load_app_config() -> AppConfig {
    let settings_path = config_dir().join("settings.yaml");

    if settings_path.exists() {
        match load_yaml::<AppConfig>(&settings_path) {
            Ok(config) => {
                tracing::info!("Loaded settings from {:?}", settings_path);
                return config;
            }
            Err(e) => {
                tracing::warn!("Failed to parse settings.yaml: {}, using defaults", e);
            }
        }
    } else {
        tracing::debug!("No settings.yaml found, using defaults");
    }

    AppConfig::default()
}

/// Ensure user config directory exists
pub fn ensure_config_dir() -> std::io::Result<()> {
    let dir = config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(())
}
