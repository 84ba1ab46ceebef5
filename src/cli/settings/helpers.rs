//! Helper functions for settings operations.

use std::path::Path;

use crate::core::catalog::ModelCatalog;
use crate::core::config::data::Config;

use super::error::SettingError;

/// Load the config at `path`, apply `f`, and save it back.
pub fn mutate_config_at<F, T>(path: &Path, f: F) -> Result<T, SettingError>
where
    F: FnOnce(&mut Config) -> Result<T, SettingError>,
{
    let mut config =
        Config::load_from_path(path).map_err(|e| SettingError::ConfigError(e.to_string()))?;
    let result = f(&mut config)?;
    config
        .save_to_path(path)
        .map_err(|e| SettingError::ConfigError(e.to_string()))?;
    Ok(result)
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Resolve a model id case-insensitively against the built-in catalog,
/// returning the canonical id.
pub fn validate_model(input: &str) -> Result<String, SettingError> {
    ModelCatalog::builtin()
        .find(input)
        .map(|entry| entry.id.clone())
        .ok_or_else(|| SettingError::UnknownModel {
            input: input.to_string(),
        })
}

pub fn validate_endpoint(input: &str) -> Result<String, SettingError> {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(SettingError::InvalidUrl(input.to_string()))
    }
}
