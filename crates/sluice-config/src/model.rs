//! Typed post-processing policy.
//!
//! # Design
//! - Pure data carriers consumed by the post-processing pass.
//! - Keeps parsing in `validate.rs` and sourcing in `loader.rs`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a processed file reaches its library destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Move the file; the download directory is consumed.
    Move,
    /// Copy the file and leave the source in place.
    #[default]
    Copy,
    /// Hard link the file into the library.
    Hardlink,
    /// Symlink the file into the library.
    Symlink,
}

impl TransferMode {
    /// Render the mode as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Hardlink => "hardlink",
            Self::Symlink => "symlink",
        }
    }

    /// Whether the source file is consumed by the transfer.
    ///
    /// Only a consuming transfer allows leftovers to be deleted, and it makes
    /// duplicate detection unnecessary because a processed source no longer
    /// exists to be picked up again.
    #[must_use]
    pub const fn consumes_source(self) -> bool {
        matches!(self, Self::Move)
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(Self::Move),
            "copy" => Ok(Self::Copy),
            "hardlink" | "hard_link" => Ok(Self::Hardlink),
            "symlink" | "symlink_reversed" => Ok(Self::Symlink),
            _ => Err(ConfigError::invalid("transfer_mode", s, "unknown_mode")),
        }
    }
}

/// Settings governing one post-processing pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PostProcessPolicy {
    /// Root directory the download client writes completed releases into.
    pub download_root: Option<PathBuf>,
    /// How processed files reach the library.
    pub transfer_mode: TransferMode,
    /// Whether archives are expanded before classification.
    pub unpack: bool,
    /// Whether processed directories are kept and guarded by `.processed` markers.
    pub keep_processed_dir: bool,
    /// Whether a failed download is deleted once the failed processor succeeds.
    pub delete_failed: bool,
}

impl PostProcessPolicy {
    /// Download root when one is configured and non-empty.
    #[must_use]
    pub fn download_root(&self) -> Option<&std::path::Path> {
        self.download_root
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}
