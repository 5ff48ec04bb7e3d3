//! Settings loading.
//!
//! Settings come from a TOML or JSON file picked by the host (the format is
//! chosen by file extension), or from the embedded default profile. The core
//! only ever sees the parsed [`SettingsFile`] snapshot.

pub mod schema;

pub use schema::{
    InsertAtLayerSettings, InsertFrequency, PassSettings, PrintSequence, PrinterSettings,
    PrimeTowerSettings, SearchReplaceSettings, SettingsFile, ToolMacro, ToolMacrosSettings,
    ZhopTravelSettings,
};

use std::path::Path;
use thiserror::Error;

/// Default settings profile shipped with the binary.
const EMBEDDED_DEFAULT: &str = include_str!("../../resources/settings/default.toml");

/// Errors while loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported settings format '{0}' (expected .toml or .json)")]
    UnsupportedFormat(String),
}

/// Parse settings from TOML text.
pub fn from_toml_str(text: &str) -> Result<SettingsFile, SettingsError> {
    Ok(toml::from_str(text)?)
}

/// Parse settings from JSON text.
pub fn from_json_str(text: &str) -> Result<SettingsFile, SettingsError> {
    Ok(serde_json::from_str(text)?)
}

/// Load a settings file, choosing the parser by extension.
pub fn load(path: &Path) -> Result<SettingsFile, SettingsError> {
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => from_toml_str(&text),
        Some("json") => from_json_str(&text),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("").to_string(),
        )),
    }
}

/// The embedded default profile: a single-extruder machine with every pass
/// section absent, so the pipeline is a no-op until the user configures it.
pub fn embedded_default() -> Result<SettingsFile, SettingsError> {
    from_toml_str(EMBEDDED_DEFAULT)
}
