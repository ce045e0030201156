use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::model::config::StatusSettings;

/// Error type for loading plugin settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not parse settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported settings format: {} (expected .json or .toml)", .0.display())]
    UnknownFormat(PathBuf),
}

/// Load settings from a `.json` (plugin `data.json`) or `.toml` file.
///
/// With no path, the built-in defaults are returned.
pub fn load_settings(path: Option<&Path>) -> Result<StatusSettings, SettingsError> {
    let Some(path) = path else {
        return Ok(StatusSettings::default());
    };
    let text = fs::read_to_string(path).map_err(|e| SettingsError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let settings = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json_settings(&text)?,
        Some("toml") => parse_toml_settings(&text)?,
        _ => return Err(SettingsError::UnknownFormat(path.to_path_buf())),
    };
    debug!(path = %path.display(), states = settings.task_status_cycle.len(), "settings loaded");
    Ok(settings)
}

/// Parse settings JSON. Keys the status filter does not use are ignored, so a full
/// plugin `data.json` loads as is.
pub fn parse_json_settings(text: &str) -> Result<StatusSettings, SettingsError> {
    Ok(serde_json::from_str(text)?)
}

pub fn parse_toml_settings(text: &str) -> Result<StatusSettings, SettingsError> {
    Ok(toml::from_str(text)?)
}
