//! Source cleanup after a directory has been processed under `move`.
//!
//! Nothing here fails the pass: every filesystem error becomes a warning line
//! and the file or directory is left in place.

use std::fs;
use std::path::Path;

use sluice_config::TransferMode;

use crate::error::PostProcError;
use crate::report::ResultLog;
use crate::walker::same_directory;

/// What cleanup removed from one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Leftover files deleted.
    pub deleted_files: Vec<String>,
    /// Whether the directory itself was removed.
    pub removed_directory: bool,
}

/// Deletes leftovers and emptied directories when the source is consumed.
#[derive(Debug, Clone, Copy)]
pub struct CleanupPolicy<'a> {
    transfer_mode: TransferMode,
    download_root: Option<&'a Path>,
}

impl<'a> CleanupPolicy<'a> {
    /// Policy for one pass.
    #[must_use]
    pub const fn new(transfer_mode: TransferMode, download_root: Option<&'a Path>) -> Self {
        Self {
            transfer_mode,
            download_root,
        }
    }

    /// Clean `dir` after processing.
    ///
    /// `leftovers` are the non-video names of the working file list; they are
    /// only deleted when `outcome_ok` holds. The directory is removed once it
    /// is empty, unless it is the download root.
    pub fn run(
        &self,
        dir: &Path,
        leftovers: &[String],
        outcome_ok: bool,
        log: &mut ResultLog,
    ) -> CleanupSummary {
        let mut summary = CleanupSummary::default();
        if !self.transfer_mode.consumes_source() {
            return summary;
        }

        if outcome_ok {
            for name in leftovers {
                if delete_leftover(dir, name, log) {
                    summary.deleted_files.push(name.clone());
                }
            }
        }

        if self
            .download_root
            .is_some_and(|root| same_directory(dir, root))
        {
            return summary;
        }
        match fs::read_dir(dir).map(|mut entries| entries.next().is_none()) {
            Ok(true) => {}
            Ok(false) => {
                log.debug(format!(
                    "Skipping Deleting folder {} because some files was not deleted/processed",
                    dir.display()
                ));
                return summary;
            }
            Err(source) => {
                let err = PostProcError::io("cleanup.list_dir", dir, source);
                log.warning(format!("Warning: unable to inspect the folder {}", err.describe()));
                return summary;
            }
        }

        log.debug(format!("Deleting folder {}", dir.display()));
        match fs::remove_dir_all(dir) {
            Ok(()) => summary.removed_directory = true,
            Err(source) => {
                let err = PostProcError::io("cleanup.remove_dir", dir, source);
                log.warning(format!("Warning: unable to remove the folder {}", err.describe()));
            }
        }
        summary
    }
}

fn delete_leftover(dir: &Path, name: &str, log: &mut ResultLog) -> bool {
    let path = dir.join(name);
    let Ok(metadata) = fs::symlink_metadata(&path) else {
        return false;
    };
    log.debug(format!("Deleting file {name}"));

    if metadata.permissions().readonly() {
        log.debug(format!("Changing ReadOnly Flag for file {name}"));
        if let Err(source) = make_writable(&path, metadata.permissions()) {
            log.debug(format!(
                "Cannot change permissions of {}: {source}",
                path.display()
            ));
        }
    }

    match fs::remove_file(&path) {
        Ok(()) => true,
        Err(source) => {
            log.warning(format!("Unable to delete file {name}: {source}"));
            false
        }
    }
}

#[cfg(unix)]
fn make_writable(path: &Path, permissions: fs::Permissions) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = permissions.mode() | 0o200;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path, mut permissions: fs::Permissions) -> std::io::Result<()> {
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}
