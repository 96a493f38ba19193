//! Ordered checks deciding whether a candidate subdirectory is processed.

use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use sluice_config::TransferMode;

use crate::catalog::CatalogStore;
use crate::classify::{is_archive_file, is_media_file, strip_extension};
use crate::collaborators::NameParser;
use crate::error::PostProcResult;
use crate::report::ResultLog;
use crate::walker::subtree_file_names;

/// Directory-name prefixes download clients use for unusable releases.
pub const EXCLUSION_PREFIXES: [(&str, &str); 3] = [
    (
        "_FAILED_",
        "The directory name indicates it failed to extract, cancelling",
    ),
    (
        "_UNDERSIZED_",
        "The directory name indicates that it was previously rejected for being undersized, cancelling",
    ),
    (
        "_UNPACK_",
        "The directory name indicates that this release is in the process of being unpacked, skipping",
    ),
];

const ALREADY_PROCESSED: &str =
    "You're trying to post process a dir that's already been processed, skipping";

/// Evaluates candidate subdirectories against the catalog and the parser.
pub struct EligibilityEngine<'a> {
    catalog: &'a dyn CatalogStore,
    parser: &'a dyn NameParser,
    transfer_mode: TransferMode,
    unpack: bool,
}

impl<'a> EligibilityEngine<'a> {
    /// Engine bound to one pass's collaborators and policy.
    #[must_use]
    pub fn new(
        catalog: &'a dyn CatalogStore,
        parser: &'a dyn NameParser,
        transfer_mode: TransferMode,
        unpack: bool,
    ) -> Self {
        Self {
            catalog,
            parser,
            transfer_mode,
            unpack,
        }
    }

    /// Whether `parent/name` should be extracted and processed.
    ///
    /// Checks short-circuit in order: exclusion prefix, show library
    /// location, catalog duplicates (skipped under `move`), parseable media.
    /// A catalog failure makes the directory ineligible.
    pub fn is_eligible(&self, parent: &Path, name: &str, log: &mut ResultLog) -> bool {
        log.debug(format!("Processing folder {name}"));
        if let Some((_, message)) = EXCLUSION_PREFIXES
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix))
        {
            log.debug(*message);
            return false;
        }

        let dir = parent.join(name);
        match self.check_catalog_and_content(&dir, name, log) {
            Ok(eligible) => eligible,
            Err(err) => {
                log.error(format!(
                    "Unable to check {} against the catalog: {}",
                    dir.display(),
                    err.describe()
                ));
                false
            }
        }
    }

    fn check_catalog_and_content(
        &self,
        dir: &Path,
        name: &str,
        log: &mut ResultLog,
    ) -> PostProcResult<bool> {
        if self.inside_show_location(dir)? {
            log.error(
                "You're trying to post process an episode that's already been moved to its show dir",
            );
            return Ok(false);
        }

        let all_files = subtree_file_names(dir)?;
        let videos: Vec<&String> = all_files.iter().filter(|file| is_media_file(file)).collect();

        if self.transfer_mode != TransferMode::Move && self.is_duplicate(name, &videos)? {
            log.debug(ALREADY_PROCESSED);
            return Ok(false);
        }

        if videos.iter().any(|video| self.parser.parse(video).is_some()) {
            return Ok(true);
        }
        if self.unpack
            && all_files
                .iter()
                .filter(|file| is_archive_file(file))
                .any(|archive| self.parser.parse(archive).is_some())
        {
            return Ok(true);
        }
        log.debug(format!("No recognisable episode found in {}, skipping", dir.display()));
        Ok(false)
    }

    fn inside_show_location(&self, dir: &Path) -> PostProcResult<bool> {
        let dir = lowercase_path(&canonical_or_self(dir));
        for show in self.catalog.shows()? {
            let location = lowercase_path(&canonical_or_self(&show.location));
            let nested = format!("{}{MAIN_SEPARATOR}", location.trim_end_matches(MAIN_SEPARATOR));
            if dir == location || dir.starts_with(&nested) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_duplicate(&self, name: &str, videos: &[&String]) -> PostProcResult<bool> {
        if !self.catalog.episodes_by_release(name)?.is_empty() {
            return Ok(true);
        }
        for video in videos {
            if !self
                .catalog
                .episodes_by_release(strip_extension(video))?
                .is_empty()
            {
                return Ok(true);
            }
            if !self.catalog.downloaded_history_matching(video)?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn canonical_or_self(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn lowercase_path(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}
