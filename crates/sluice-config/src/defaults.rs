//! Environment variable names and fallback values for the post-processing policy.
//!
//! # Design
//! - Centralize variable names so the CLI help text and loader stay consistent.

/// Root directory the download client writes completed releases into.
pub const ENV_DOWNLOAD_DIR: &str = "SLUICE_DOWNLOAD_DIR";
/// Transfer mode (`move`, `copy`, `hardlink`, `symlink`).
pub const ENV_TRANSFER_MODE: &str = "SLUICE_TRANSFER_MODE";
/// Whether RAR/ZIP archives are expanded before processing.
pub const ENV_UNPACK: &str = "SLUICE_UNPACK";
/// Whether processed directories are kept and guarded by `.processed` markers.
pub const ENV_KEEP_PROCESSED_DIR: &str = "SLUICE_KEEP_PROCESSED_DIR";
/// Whether failed downloads are deleted once the failed processor succeeds.
pub const ENV_DELETE_FAILED: &str = "SLUICE_DELETE_FAILED";

/// Section label used in validation errors.
pub(crate) const POLICY_SECTION: &str = "post_process";
