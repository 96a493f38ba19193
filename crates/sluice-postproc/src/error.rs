//! # Design
//!
//! - Provide structured, constant-message errors for the post-processing pass.
//! - Capture operation context (paths, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.
//! - These never cross the pass boundary; the orchestrator renders them into the result log.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for post-processing operations.
pub type PostProcResult<T> = Result<T, PostProcError>;

/// Errors produced while walking, unpacking, or cleaning a download directory.
#[derive(Debug, Error)]
pub enum PostProcError {
    /// IO failures while interacting with the filesystem.
    #[error("post-process io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Walkdir traversal failures.
    #[error("post-process walkdir failure")]
    Walkdir {
        /// Operation that triggered the walkdir failure.
        operation: &'static str,
        /// Path involved in the walkdir failure.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// Zip archive failures.
    #[error("post-process zip failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// RAR archive failures.
    #[error("post-process rar failure")]
    Rar {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying unrar error.
        source: unrar::error::UnrarError,
    },
    /// JSON parsing failures for catalog snapshots.
    #[error("post-process json failure")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Catalog store query failures.
    #[error("catalog query failed")]
    Catalog {
        /// Query that failed.
        operation: &'static str,
        /// Backend supplied detail.
        detail: String,
    },
    /// A built-in name pattern failed to compile.
    #[error("post-process pattern compile failure")]
    Pattern {
        /// Pattern identifier.
        pattern: &'static str,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// Unsupported archive format.
    #[error("post-process unsupported archive")]
    UnsupportedArchive {
        /// Archive that could not be handled.
        path: PathBuf,
    },
}

impl PostProcError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn rar(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: unrar::error::UnrarError,
    ) -> Self {
        Self::Rar {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a catalog failure from any backend error.
    pub fn catalog(operation: &'static str, detail: impl fmt::Display) -> Self {
        Self::Catalog {
            operation,
            detail: detail.to_string(),
        }
    }

    /// Render the error with its operation context and source chain for the result log.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Io {
                operation,
                path,
                source,
            } => with_path(operation, path, source),
            Self::Walkdir {
                operation,
                path,
                source,
            } => with_path(operation, path, source),
            Self::Zip {
                operation,
                path,
                source,
            } => with_path(operation, path, source),
            Self::Rar {
                operation,
                path,
                source,
            } => with_path(operation, path, source),
            Self::Json {
                operation,
                path,
                source,
            } => with_path(operation, path, source),
            Self::Catalog { operation, detail } => format!("{operation}: {detail}"),
            Self::Pattern { pattern, source } => format!("pattern {pattern}: {source}"),
            Self::UnsupportedArchive { path } => {
                format!("unsupported archive format: {}", path.display())
            }
        }
    }
}

fn with_path(operation: &str, path: &Path, source: &dyn fmt::Display) -> String {
    format!("{operation} ({}): {source}", path.display())
}
