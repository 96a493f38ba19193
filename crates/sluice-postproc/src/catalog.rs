//! Read-only query contract against the show/episode catalog.
//!
//! # Design
//! - One typed record per query instead of loosely shaped rows.
//! - `InMemoryCatalog` answers the queries from a snapshot; it backs the CLI
//!   (loaded from JSON) and the test suites.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PostProcError, PostProcResult};

/// A show known to the catalog and where its library lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRecord {
    /// Catalog identifier of the show.
    pub show_id: u64,
    /// Display name.
    pub name: String,
    /// Library directory holding the show's files.
    pub location: PathBuf,
}

/// Quality an episode was obtained in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Standard definition.
    Sd,
    /// 720p.
    Hd720p,
    /// 1080p.
    Hd1080p,
    /// Quality could not be determined.
    Unknown,
}

/// Catalog status of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "quality", rename_all = "snake_case")]
pub enum EpisodeStatus {
    /// Not aired yet.
    Unaired,
    /// Wanted but not obtained.
    Wanted,
    /// Deliberately not wanted.
    Skipped,
    /// Sent to the download client.
    Snatched(Quality),
    /// Present in the library.
    Downloaded(Quality),
    /// Present and archived.
    Archived,
    /// Ignored by the user.
    Ignored,
}

impl EpisodeStatus {
    /// Whether the episode already has a file in the library.
    #[must_use]
    pub const fn is_downloaded(self) -> bool {
        matches!(self, Self::Downloaded(_))
    }
}

/// An episode row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Show the episode belongs to.
    pub show_id: u64,
    /// Season number.
    pub season: u32,
    /// Episode number.
    pub episode: u32,
    /// Release name the episode was last processed from (empty when never).
    #[serde(default)]
    pub release_name: String,
    /// Current status.
    pub status: EpisodeStatus,
}

/// A history row recording which resource produced which episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Show the resource was matched to.
    pub show_id: u64,
    /// Season number.
    pub season: u32,
    /// Episode number.
    pub episode: u32,
    /// Resource (file or release name) that was snatched or processed.
    pub resource: String,
}

/// Queries the post-processing pass runs against the catalog.
pub trait CatalogStore {
    /// Every known show.
    ///
    /// # Errors
    ///
    /// Returns `PostProcError::Catalog` when the backend fails.
    fn shows(&self) -> PostProcResult<Vec<ShowRecord>>;

    /// Episodes whose recorded release name equals `release_name`.
    ///
    /// # Errors
    ///
    /// Returns `PostProcError::Catalog` when the backend fails.
    fn episodes_by_release(&self, release_name: &str) -> PostProcResult<Vec<EpisodeRecord>>;

    /// History rows whose resource ends with `file_name` and whose episode is
    /// currently downloaded.
    ///
    /// # Errors
    ///
    /// Returns `PostProcError::Catalog` when the backend fails.
    fn downloaded_history_matching(&self, file_name: &str) -> PostProcResult<Vec<HistoryRecord>>;
}

/// Snapshot-backed catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCatalog {
    /// Known shows.
    pub shows: Vec<ShowRecord>,
    /// Known episodes.
    pub episodes: Vec<EpisodeRecord>,
    /// History rows.
    pub history: Vec<HistoryRecord>,
}

impl InMemoryCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written as JSON.
    ///
    /// # Errors
    ///
    /// Returns `PostProcError::Io` when the file cannot be read and
    /// `PostProcError::Json` when it is not a catalog snapshot.
    pub fn from_json_file(path: &Path) -> PostProcResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|source| PostProcError::io("catalog.read", path, source))?;
        serde_json::from_str(&raw).map_err(|source| PostProcError::Json {
            operation: "catalog.parse",
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add a show.
    #[must_use]
    pub fn with_show(mut self, show_id: u64, name: &str, location: impl Into<PathBuf>) -> Self {
        self.shows.push(ShowRecord {
            show_id,
            name: name.to_string(),
            location: location.into(),
        });
        self
    }

    /// Add an episode.
    #[must_use]
    pub fn with_episode(mut self, episode: EpisodeRecord) -> Self {
        self.episodes.push(episode);
        self
    }

    /// Add a history row.
    #[must_use]
    pub fn with_history(mut self, history: HistoryRecord) -> Self {
        self.history.push(history);
        self
    }
}

impl CatalogStore for InMemoryCatalog {
    fn shows(&self) -> PostProcResult<Vec<ShowRecord>> {
        Ok(self.shows.clone())
    }

    fn episodes_by_release(&self, release_name: &str) -> PostProcResult<Vec<EpisodeRecord>> {
        Ok(self
            .episodes
            .iter()
            .filter(|episode| !episode.release_name.is_empty())
            .filter(|episode| episode.release_name == release_name)
            .cloned()
            .collect())
    }

    fn downloaded_history_matching(&self, file_name: &str) -> PostProcResult<Vec<HistoryRecord>> {
        let needle = file_name.to_lowercase();
        Ok(self
            .history
            .iter()
            .filter(|row| row.resource.to_lowercase().ends_with(&needle))
            .filter(|row| {
                self.episodes.iter().any(|episode| {
                    episode.show_id == row.show_id
                        && episode.season == row.season
                        && episode.episode == row.episode
                        && episode.status.is_downloaded()
                })
            })
            .cloned()
            .collect())
    }
}
