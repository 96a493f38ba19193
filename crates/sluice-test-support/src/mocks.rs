//! Recording collaborator doubles.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sluice_postproc::catalog::{EpisodeRecord, HistoryRecord, ShowRecord};
use sluice_postproc::classify::file_name;
use sluice_postproc::sentinel::write_marker;
use sluice_postproc::{
    CatalogStore, EpisodePostProcessor, FailedDownloadProcessor, PostProcError, PostProcResult,
    PostProcessReport, ProcessingFailure,
};

/// One call received by a recording double.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// File or directory the collaborator was asked to handle.
    pub path: PathBuf,
    /// Release name passed alongside it.
    pub name_hint: Option<String>,
}

#[derive(Debug, Clone)]
enum Script {
    Raise(String),
    ReportFailure,
}

/// Episode post-processor that records every call.
///
/// Successful calls can consume the file (like a move) and write the
/// `.processed` marker (like keep-in-place modes). Failures are scripted per
/// file name.
#[derive(Debug, Default)]
pub struct RecordingPostProcessor {
    calls: Mutex<Vec<RecordedCall>>,
    scripts: HashMap<String, Script>,
    consume_files: bool,
    write_markers: bool,
}

impl RecordingPostProcessor {
    /// Processor that succeeds for every file and touches nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise a processing failure carrying `message` for `file_name`.
    #[must_use]
    pub fn failing_on(mut self, file_name: &str, message: &str) -> Self {
        self.scripts
            .insert(file_name.to_string(), Script::Raise(message.to_string()));
        self
    }

    /// Report an unsuccessful result (no failure signal) for `file_name`.
    #[must_use]
    pub fn unsuccessful_on(mut self, file_name: &str) -> Self {
        self.scripts
            .insert(file_name.to_string(), Script::ReportFailure);
        self
    }

    /// Delete each successfully processed file.
    #[must_use]
    pub const fn consuming_files(mut self) -> Self {
        self.consume_files = true;
        self
    }

    /// Write a `.processed` marker next to each successfully processed file.
    #[must_use]
    pub const fn writing_markers(mut self) -> Self {
        self.write_markers = true;
        self
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// File names received so far, in call order.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|call| file_name(&call.path))
            .collect()
    }
}

impl EpisodePostProcessor for RecordingPostProcessor {
    fn process(
        &self,
        file: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                path: file.to_path_buf(),
                name_hint: name_hint.map(str::to_string),
            });

        let name = file_name(file);
        match self.scripts.get(&name) {
            Some(Script::Raise(message)) => {
                return Err(ProcessingFailure {
                    message: message.clone(),
                    log: format!("recording processor: giving up on {name}"),
                });
            }
            Some(Script::ReportFailure) => {
                return Ok(PostProcessReport::unsuccessful(format!(
                    "recording processor: could not place {name}"
                )));
            }
            None => {}
        }

        if self.write_markers {
            write_marker(file).map_err(|err| ProcessingFailure::new(err.describe()))?;
        }
        if self.consume_files {
            fs::remove_file(file).map_err(|err| ProcessingFailure::new(err.to_string()))?;
        }
        Ok(PostProcessReport::succeeded(format!(
            "recording processor: handled {name}"
        )))
    }
}

/// How the failed-download double answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedScript {
    /// Report success.
    Succeed,
    /// Report an unsuccessful result.
    ReportFailure,
    /// Raise a processing failure with the message.
    Raise(String),
}

/// Failed-download processor that records every call.
#[derive(Debug)]
pub struct RecordingFailedProcessor {
    calls: Mutex<Vec<RecordedCall>>,
    script: FailedScript,
}

impl RecordingFailedProcessor {
    /// Processor answering with `script`.
    #[must_use]
    pub const fn new(script: FailedScript) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script,
        }
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for RecordingFailedProcessor {
    fn default() -> Self {
        Self::new(FailedScript::Succeed)
    }
}

impl FailedDownloadProcessor for RecordingFailedProcessor {
    fn process(
        &self,
        dir: &Path,
        name_hint: Option<&str>,
    ) -> Result<PostProcessReport, ProcessingFailure> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                path: dir.to_path_buf(),
                name_hint: name_hint.map(str::to_string),
            });
        match &self.script {
            FailedScript::Succeed => Ok(PostProcessReport::succeeded(
                "recording failed processor: marked failed",
            )),
            FailedScript::ReportFailure => Ok(PostProcessReport::unsuccessful(
                "recording failed processor: nothing to mark",
            )),
            FailedScript::Raise(message) => Err(ProcessingFailure::new(message.clone())),
        }
    }
}

/// Catalog whose every query fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCatalog;

impl CatalogStore for UnavailableCatalog {
    fn shows(&self) -> PostProcResult<Vec<ShowRecord>> {
        Err(PostProcError::catalog("catalog.shows", "database is locked"))
    }

    fn episodes_by_release(&self, _release_name: &str) -> PostProcResult<Vec<EpisodeRecord>> {
        Err(PostProcError::catalog(
            "catalog.episodes_by_release",
            "database is locked",
        ))
    }

    fn downloaded_history_matching(&self, _file_name: &str) -> PostProcResult<Vec<HistoryRecord>> {
        Err(PostProcError::catalog(
            "catalog.downloaded_history_matching",
            "database is locked",
        ))
    }
}
