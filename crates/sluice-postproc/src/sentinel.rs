//! `.processed` marker bookkeeping for keep-in-place transfer modes.
//!
//! A marker is a zero-length file named after its video with the extension
//! swapped for `processed`. While it exists the video is never resubmitted.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::classify::{SENTINEL_EXTENSION, is_sentinel_file, strip_extension};
use crate::error::{PostProcError, PostProcResult};
use crate::report::ResultLog;

/// Marker path that pairs with `video`.
#[must_use]
pub fn marker_path(video: &Path) -> PathBuf {
    video.with_extension(SENTINEL_EXTENSION)
}

/// Whether `video` already has a marker next to it.
#[must_use]
pub fn has_marker(video: &Path) -> bool {
    marker_path(video).is_file()
}

/// Create the marker for `video`; an existing marker is left untouched.
///
/// # Errors
///
/// Returns `PostProcError::Io` when the marker cannot be created.
pub fn write_marker(video: &Path) -> PostProcResult<PathBuf> {
    let marker = marker_path(video);
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&marker)
        .map_err(|source| PostProcError::io("sentinel.write", &marker, source))?;
    debug!(marker = %marker.display(), "wrote processed marker");
    Ok(marker)
}

/// Delete markers in `files` whose companion is gone.
///
/// A marker is orphaned when it is the only entry of `files` starting with
/// its base name. Returns the names of the markers removed; failures are
/// logged as warnings and the marker stays.
pub fn reclaim_orphans(dir: &Path, files: &[String], log: &mut ResultLog) -> Vec<String> {
    let mut removed = Vec::new();
    for marker in files.iter().filter(|name| is_sentinel_file(name)) {
        let base = strip_extension(marker);
        let matches = files.iter().filter(|name| name.starts_with(base)).count();
        if matches != 1 {
            continue;
        }
        let path = dir.join(marker);
        match fs::remove_file(&path) {
            Ok(()) => {
                log.debug(format!("Removed orphaned processed marker {}", path.display()));
                removed.push(marker.clone());
            }
            Err(source) => {
                let err = PostProcError::io("sentinel.reclaim", &path, source);
                log.warning(format!("Unable to remove orphaned marker: {}", err.describe()));
            }
        }
    }
    removed
}
