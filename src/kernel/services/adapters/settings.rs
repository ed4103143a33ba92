use std::path::{Path, PathBuf};

use crate::kernel::services::ports::EngineConfig;

use super::paths::get_config_dir;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot determine settings directory")]
    NoConfigDir,
    #[error("settings io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn get_settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE))
}

/// Writes the default settings if the file does not exist yet.
pub fn ensure_settings_file() -> Result<PathBuf, SettingsError> {
    let path = get_settings_path().ok_or(SettingsError::NoConfigDir)?;
    ensure_settings_file_at(&path)?;
    Ok(path)
}

pub fn ensure_settings_file_at(path: &Path) -> Result<(), SettingsError> {
    let io = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
    }
    if !path.exists() {
        let content = serde_json::to_string_pretty(&EngineConfig::default())
            .unwrap_or_else(|_| "{}".to_string());
        std::fs::write(path, content).map_err(io)?;
    }
    Ok(())
}

/// Defaults when no settings file exists.
pub fn load_settings() -> Result<EngineConfig, SettingsError> {
    match get_settings_path() {
        Some(path) => load_settings_from(&path),
        None => Ok(EngineConfig::default()),
    }
}

pub fn load_settings_from(path: &Path) -> Result<EngineConfig, SettingsError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(EngineConfig::default()),
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/settings.rs"]
mod tests;
