//! Validation helpers and parsing utilities for policy fields.

use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::model::TransferMode;

/// Parse a boolean toggle (`true/false`, `yes/no`, `on/off`, `1/0`).
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` for any other spelling.
pub fn parse_toggle(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::invalid(field, value, "not_a_boolean")),
    }
}

/// Parse the transfer mode field.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the mode is unknown.
pub fn parse_transfer_mode(value: &str) -> ConfigResult<TransferMode> {
    value.parse()
}

/// Parse the download root; blank values mean "not configured".
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is a relative path.
pub fn parse_download_root(value: &str) -> ConfigResult<Option<PathBuf>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let path = PathBuf::from(trimmed);
    if !path.is_absolute() {
        return Err(ConfigError::invalid(
            "download_root",
            value,
            "must_be_absolute",
        ));
    }
    Ok(Some(path))
}
