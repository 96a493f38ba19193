//! Policy sources: process environment and JSON documents.
//!
//! # Design
//! - Environment lookups go through a closure so tests never mutate process state.
//! - Unset variables keep the policy defaults; malformed ones fail loudly.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::defaults::{
    ENV_DELETE_FAILED, ENV_DOWNLOAD_DIR, ENV_KEEP_PROCESSED_DIR, ENV_TRANSFER_MODE, ENV_UNPACK,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::PostProcessPolicy;
use crate::validate::{parse_download_root, parse_toggle, parse_transfer_mode};

impl PostProcessPolicy {
    /// Build a policy from `SLUICE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` when a variable holds an invalid value.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a policy from an arbitrary key lookup, layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` when a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();
        policy.apply_lookup(lookup)?;
        Ok(policy)
    }

    /// Overlay values found through `lookup` onto this policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` when a value is invalid.
    pub fn apply_lookup<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DOWNLOAD_DIR) {
            self.download_root = parse_download_root(&value)?;
        }
        if let Some(value) = lookup(ENV_TRANSFER_MODE) {
            self.transfer_mode = parse_transfer_mode(&value)?;
        }
        if let Some(value) = lookup(ENV_UNPACK) {
            self.unpack = parse_toggle("unpack", &value)?;
        }
        if let Some(value) = lookup(ENV_KEEP_PROCESSED_DIR) {
            self.keep_processed_dir = parse_toggle("keep_processed_dir", &value)?;
        }
        if let Some(value) = lookup(ENV_DELETE_FAILED) {
            self.delete_failed = parse_toggle("delete_failed", &value)?;
        }
        debug!(
            transfer_mode = %self.transfer_mode,
            unpack = self.unpack,
            keep_processed_dir = self.keep_processed_dir,
            "post-process policy resolved"
        );
        Ok(())
    }

    /// Load a policy from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` when the file cannot be read and
    /// `ConfigError::Json` when it does not describe a policy.
    pub fn from_json_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            operation: "policy.read",
            path: path.to_path_buf(),
            source,
        })?;
        let policy: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            operation: "policy.parse",
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(root) = policy.download_root() {
            parse_download_root(&root.display().to_string())?;
        }
        Ok(policy)
    }
}
