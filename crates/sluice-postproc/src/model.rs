//! Domain models for the post-processing pass.
//!
//! # Design
//! - Keep request/response types lightweight; nothing here is persisted.
//! - Avoid embedding IO handles; callers supply paths.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::report::ResultLog;

/// Inputs for one post-processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    /// Directory (or leaf name under the download root) to process.
    pub target: PathBuf,
    /// Release name supplied by the download client, when known.
    pub name_hint: Option<String>,
    /// Accepted for caller compatibility; eligible subtrees are always walked.
    pub recurse: bool,
    /// Route the target to the failed-download processor instead.
    pub failed_download: bool,
}

impl ProcessRequest {
    /// Request a normal pass over `target`.
    #[must_use]
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            name_hint: None,
            recurse: false,
            failed_download: false,
        }
    }

    /// Attach the download client's release name.
    #[must_use]
    pub fn with_name_hint(mut self, hint: impl Into<String>) -> Self {
        self.name_hint = Some(hint.into());
        self
    }

    /// Mark the download as failed.
    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.failed_download = true;
        self
    }
}

/// How a candidate directory entered the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Found while scanning the configured download root.
    ScheduledRoot,
    /// Named explicitly by the caller.
    ExplicitTarget,
}

impl Origin {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::ScheduledRoot => "scheduled_root",
            Self::ExplicitTarget => "explicit_target",
        }
    }
}

/// A directory under consideration together with its immediate files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDirectory {
    /// Absolute path of the directory.
    pub path: PathBuf,
    /// How the directory entered the pass.
    pub origin: Origin,
    /// Names of the files directly inside `path`.
    pub files: Vec<String>,
}

/// Classification of a file name, recomputed on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A media file handed to the episode post-processor.
    Video,
    /// A RAR or ZIP archive that may hold media.
    Archive,
    /// A `.processed` marker.
    Sentinel,
    /// Anything else.
    Other,
}

/// Result of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The unit was handled.
    Succeeded,
    /// The unit failed; carries the failure message.
    Failed(String),
    /// The unit was deliberately not handled; carries the reason.
    Skipped(String),
}

impl Outcome {
    /// Whether the unit failed.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcome tagged with the path it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    /// File or directory the outcome applies to.
    pub path: PathBuf,
    /// What happened to it.
    pub outcome: Outcome,
}

/// Everything a pass produced: the rendered log plus per-unit outcomes.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Ordered status lines.
    pub log: ResultLog,
    /// Per-unit outcomes in processing order.
    pub units: Vec<UnitOutcome>,
}

impl PassReport {
    pub(crate) fn record(&mut self, path: &Path, outcome: Outcome) {
        self.units.push(UnitOutcome {
            path: path.to_path_buf(),
            outcome,
        });
    }

    /// Outcome recorded for `path`, if any (latest wins).
    #[must_use]
    pub fn outcome_for(&self, path: &Path) -> Option<&Outcome> {
        self.units
            .iter()
            .rev()
            .find(|unit| unit.path == path)
            .map(|unit| &unit.outcome)
    }

    /// Render the log as the newline-joined report text.
    #[must_use]
    pub fn render(&self) -> String {
        self.log.render()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
