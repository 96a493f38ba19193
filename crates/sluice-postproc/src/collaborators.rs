//! Contracts for the collaborators the pass delegates to.
//!
//! # Design
//! - Renaming/transcoding, failed-download handling and release-name parsing live
//!   outside this crate; the pass only sees these traits.
//! - An unparseable name is ordinary control flow and yields `None`.

use std::path::Path;

use thiserror::Error;

/// Identity a release name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseIdentity {
    /// Series name as written in the release, separators normalised to spaces.
    pub series_name: String,
    /// Season number for season/episode releases.
    pub season: Option<u32>,
    /// Episode numbers covered by the release.
    pub episodes: Vec<u32>,
    /// Air date (`YYYY-MM-DD`) for date-based releases.
    pub air_date: Option<String>,
}

/// Parses release names into show/episode identity.
pub trait NameParser {
    /// Parse `name`; `None` means the name is not a recognisable release.
    fn parse(&self, name: &str) -> Option<ReleaseIdentity>;
}

/// Success flag and log text produced by a collaborator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessReport {
    /// Whether the collaborator handled its input.
    pub success: bool,
    /// The collaborator's own accumulated log text.
    pub log: String,
}

impl PostProcessReport {
    /// Successful run with `log`.
    #[must_use]
    pub fn succeeded(log: impl Into<String>) -> Self {
        Self {
            success: true,
            log: log.into(),
        }
    }

    /// Unsuccessful run with `log`.
    #[must_use]
    pub fn unsuccessful(log: impl Into<String>) -> Self {
        Self {
            success: false,
            log: log.into(),
        }
    }
}

/// Unrecoverable collaborator failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("collaborator processing failed")]
pub struct ProcessingFailure {
    /// Failure message captured into the result log.
    pub message: String,
    /// Log text the collaborator accumulated before failing.
    pub log: String,
}

impl ProcessingFailure {
    /// Failure with `message` and no accumulated log.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            log: String::new(),
        }
    }
}

/// Renames, moves or transcodes one media file into the library.
pub trait EpisodePostProcessor {
    /// Process `file`, optionally bound to the download client's release name.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingFailure` when the file cannot be handled at all.
    fn process(
        &self,
        file: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure>;
}

/// Handles a download the client reported as failed.
pub trait FailedDownloadProcessor {
    /// Process the failed download stored at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingFailure` when the failure cannot be recorded.
    fn process(
        &self,
        dir: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure>;
}
