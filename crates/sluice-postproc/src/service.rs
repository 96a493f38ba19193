//! Orchestrates one post-processing pass over a download directory.
//!
//! # Design
//! - `run` never fails: every error is rendered into the pass report at the
//!   unit boundary (bare file, video file, directory) where it occurred.
//! - State for one invocation lives in `Pass`, which owns the report and the
//!   name hint; nothing outlives the call.
//! - Outcomes flow upward as values; a directory tree's failure gates its
//!   leftover cleanup.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use sluice_config::{PostProcessPolicy, TransferMode};
use tracing::{debug, info_span};

use crate::catalog::CatalogStore;
use crate::classify::{classify, is_archive_file, strip_extension};
use crate::cleanup::CleanupPolicy;
use crate::collaborators::{EpisodePostProcessor, FailedDownloadProcessor, NameParser};
use crate::eligibility::EligibilityEngine;
use crate::error::PostProcError;
use crate::extract::ArchiveExtractor;
use crate::model::{CandidateDirectory, FileKind, Origin, Outcome, PassReport, ProcessRequest};
use crate::sentinel::{has_marker, marker_path, reclaim_orphans};
use crate::walker::{
    WalkPlan, list_children, plan, processing_order, resolve_target, same_directory,
};

const PROCESSOR_REPORTED_FAILURE: &str = "processor reported failure";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Resolve,
    FailedDownload,
    LooseFiles,
    Eligibility,
    Process,
    Cleanup,
}

impl Stage {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::FailedDownload => "failed_download",
            Self::LooseFiles => "loose_files",
            Self::Eligibility => "eligibility",
            Self::Process => "process",
            Self::Cleanup => "cleanup",
        }
    }
}

/// External collaborators a pass depends on.
#[derive(Clone)]
pub struct Collaborators {
    /// Read-only catalog queries.
    pub catalog: Arc<dyn CatalogStore>,
    /// Release-name parser used by the eligibility checks.
    pub parser: Arc<dyn NameParser>,
    /// Handles each qualifying media file.
    pub post_processor: Arc<dyn EpisodePostProcessor>,
    /// Handles downloads the client reported as failed.
    pub failed_processor: Arc<dyn FailedDownloadProcessor>,
}

/// Runs post-processing passes against a fixed policy and collaborator set.
#[derive(Clone)]
pub struct PostProcessService {
    policy: PostProcessPolicy,
    collaborators: Collaborators,
}

impl PostProcessService {
    /// Build a service from its policy and collaborators.
    #[must_use]
    pub const fn new(policy: PostProcessPolicy, collaborators: Collaborators) -> Self {
        Self {
            policy,
            collaborators,
        }
    }

    /// Policy the service runs with.
    #[must_use]
    pub const fn policy(&self) -> &PostProcessPolicy {
        &self.policy
    }

    /// Run one pass and return the newline-joined report text.
    #[must_use]
    pub fn process(&self, request: &ProcessRequest) -> String {
        self.run(request).render()
    }

    /// Run one pass and return the report with per-unit outcomes.
    #[must_use]
    pub fn run(&self, request: &ProcessRequest) -> PassReport {
        let span = info_span!("post_process", target = %request.target.display());
        let _guard = span.enter();

        let mut pass = Pass {
            service: self,
            report: PassReport::default(),
            name_hint: request
                .name_hint
                .clone()
                .filter(|hint| !hint.trim().is_empty()),
        };
        pass.execute(request);
        pass.report
    }
}

struct Pass<'s> {
    service: &'s PostProcessService,
    report: PassReport,
    name_hint: Option<String>,
}

impl<'s> Pass<'s> {
    fn policy(&self) -> &'s PostProcessPolicy {
        &self.service.policy
    }

    fn collaborators(&self) -> &'s Collaborators {
        &self.service.collaborators
    }

    fn keep_markers(&self) -> bool {
        self.policy().keep_processed_dir
    }

    fn transfer_mode(&self) -> TransferMode {
        self.policy().transfer_mode
    }

    fn extractor(&self) -> ArchiveExtractor {
        ArchiveExtractor::new(self.policy().unpack)
    }

    fn execute(&mut self, request: &ProcessRequest) {
        debug!(stage = Stage::Resolve.as_str(), "resolving target");
        let root = self.policy().download_root();
        let Some(target) = resolve_target(&request.target, root, &mut self.report.log)
        else {
            self.report.record(
                &request.target,
                Outcome::Skipped("unable to locate folder".to_string()),
            );
            return;
        };

        if request.recurse {
            self.report
                .log
                .debug("Recursive processing requested; eligible directories are always walked");
        }

        if request.failed_download {
            self.process_failed_download(&target);
            return;
        }

        let walk = match plan(&target, root, self.name_hint.as_deref(), &mut self.report.log) {
            Ok(walk) => walk,
            Err(err) => {
                self.report
                    .log
                    .error(format!("Unable to list {}: {}", target.display(), err.describe()));
                self.report.record(&target, Outcome::Failed(err.describe()));
                return;
            }
        };

        debug!(
            origin = walk.origin.as_str(),
            subdirectories = walk.subdirectories.len(),
            loose_files = walk.loose_files.len(),
            "walk planned"
        );
        self.process_loose_files(&walk);
        self.process_subdirectories(&walk);
    }

    fn process_failed_download(&mut self, dir: &Path) {
        let span = info_span!(
            "stage",
            stage = Stage::FailedDownload.as_str(),
            path = %dir.display()
        );
        let _guard = span.enter();

        let hint = self.name_hint.clone();
        let result = self
            .collaborators()
            .failed_processor
            .process(dir, hint.as_deref());
        let failure = match result {
            Ok(report) => {
                self.report.log.append_verbatim(&report.log);
                (!report.success).then(|| PROCESSOR_REPORTED_FAILURE.to_string())
            }
            Err(failure) => {
                self.report.log.append_verbatim(&failure.log);
                Some(failure.message)
            }
        };

        if self.policy().delete_failed && failure.is_none() {
            self.remove_failed_download(dir);
        }

        let hint = hint.as_deref().unwrap_or("-");
        match failure {
            None => {
                self.report.log.info(format!(
                    "Processing succeeded: ({hint}, {})",
                    dir.display()
                ));
                self.report.record(dir, Outcome::Succeeded);
            }
            Some(message) => {
                self.report.log.warning(format!(
                    "Processing failed: ({hint}, {}): {message}",
                    dir.display()
                ));
                self.report.record(dir, Outcome::Failed(message));
            }
        }
    }

    fn remove_failed_download(&mut self, dir: &Path) {
        let root = self.policy().download_root();
        if root.is_some_and(|root| same_directory(dir, root)) {
            self.report.log.warning(format!(
                "Warning: not removing {} because it is the download root",
                dir.display()
            ));
            return;
        }
        self.report.log.debug(format!(
            "Deleting folder of failed download {}",
            dir.display()
        ));
        if let Err(source) = fs::remove_dir_all(dir) {
            let err = PostProcError::io("failed_download.remove_dir", dir, source);
            self.report.log.warning(format!(
                "Warning: Unable to remove the failed folder {}",
                err.describe()
            ));
        }
    }

    fn process_loose_files(&mut self, walk: &WalkPlan) {
        let candidate = walk.loose_candidate();
        if candidate.files.is_empty() {
            return;
        }
        let span = info_span!(
            "stage",
            stage = Stage::LooseFiles.as_str(),
            path = %candidate.path.display()
        );
        let _guard = span.enter();

        if self.keep_markers() && !walk.is_bare_file() {
            reclaim_orphans(&candidate.path, &candidate.files, &mut self.report.log);
        }

        let (files, _) = self.expand_archives(&candidate);
        let (videos, _) = split_videos(&files);
        self.report
            .log
            .debug(format!("PostProcessing Files: {files:?}"));
        self.report
            .log
            .debug(format!("PostProcessing VideoFiles: {videos:?}"));
        self.drop_ambiguous_hint(&videos);

        for video in &videos {
            let path = candidate.path.join(video);
            if self.skip_for_marker(&path) || self.skip_recorded_release(video, &path) {
                continue;
            }
            let outcome = self.invoke_post_processor(&path);
            self.report.record(&path, outcome);
        }
    }

    fn process_subdirectories(&mut self, walk: &WalkPlan) {
        for name in &walk.subdirectories {
            let dir = walk.parent.join(name);
            let eligible = {
                let span = info_span!(
                    "stage",
                    stage = Stage::Eligibility.as_str(),
                    path = %dir.display()
                );
                let _guard = span.enter();
                let collaborators = self.collaborators();
                EligibilityEngine::new(
                    &*collaborators.catalog,
                    &*collaborators.parser,
                    self.transfer_mode(),
                    self.policy().unpack,
                )
                .is_eligible(&walk.parent, name, &mut self.report.log)
            };
            if eligible {
                self.process_tree(&dir, walk.origin);
            } else {
                self.report
                    .record(&dir, Outcome::Skipped("directory is not eligible".to_string()));
            }
        }
    }

    fn process_tree(&mut self, tree: &Path, origin: Origin) {
        let directories = match processing_order(tree, origin) {
            Ok(directories) => directories,
            Err(err) => {
                self.report.log.error(format!(
                    "Unable to walk {}: {}",
                    tree.display(),
                    err.describe()
                ));
                self.report.record(tree, Outcome::Failed(err.describe()));
                return;
            }
        };

        let mut tree_failure: Option<String> = None;
        for candidate in directories {
            let span = info_span!(
                "stage",
                stage = Stage::Process.as_str(),
                path = %candidate.path.display()
            );
            let _guard = span.enter();

            let (files, failed_archives) = self.expand_archives(&candidate);
            if let Some(archive) = failed_archives.first()
                && tree_failure.is_none()
            {
                tree_failure = Some(format!("unable to unpack {archive}"));
            }
            let (videos, others) = split_videos(&files);
            self.drop_ambiguous_hint(&videos);

            for video in &videos {
                let path = candidate.path.join(video);
                if self.skip_for_marker(&path) {
                    continue;
                }
                let outcome = self.invoke_post_processor(&path);
                let failure = match &outcome {
                    Outcome::Failed(message) => Some(message.clone()),
                    Outcome::Succeeded | Outcome::Skipped(_) => None,
                };
                self.report.record(&path, outcome);
                if let Some(message) = failure {
                    if tree_failure.is_none() {
                        tree_failure = Some(message);
                    }
                    break;
                }
            }

            let leftovers = self.leftovers(&candidate.path, &videos, others);
            self.cleanup_directory(&candidate.path, &leftovers, tree_failure.is_none());
            let outcome = tree_failure
                .clone()
                .map_or(Outcome::Succeeded, Outcome::Failed);
            self.report.record(&candidate.path, outcome);
        }
    }

    fn cleanup_directory(&mut self, dir: &Path, leftovers: &[String], outcome_ok: bool) {
        let span = info_span!(
            "stage",
            stage = Stage::Cleanup.as_str(),
            path = %dir.display()
        );
        let _guard = span.enter();

        self.report
            .log
            .debug(format!("Cleaning up Folder {}", dir.display()));
        if self.keep_markers() {
            match list_file_names(dir) {
                Ok(current) => {
                    reclaim_orphans(dir, &current, &mut self.report.log);
                }
                Err(err) => self.report.log.warning(format!(
                    "Unable to check for orphaned markers: {}",
                    err.describe()
                )),
            }
        }
        let summary = CleanupPolicy::new(self.transfer_mode(), self.policy().download_root())
            .run(dir, leftovers, outcome_ok, &mut self.report.log);
        debug!(
            deleted_files = summary.deleted_files.len(),
            removed_directory = summary.removed_directory,
            "cleanup finished"
        );
    }

    /// Non-video names cleanup may delete. While markers are kept, a marker
    /// whose video is still on disk is not one of them.
    fn leftovers(&self, dir: &Path, videos: &[String], others: Vec<String>) -> Vec<String> {
        if !self.keep_markers() {
            return others;
        }
        let guarded: Vec<_> = videos
            .iter()
            .map(|video| dir.join(video))
            .filter(|video| video.exists())
            .map(|video| marker_path(&video))
            .collect();
        others
            .into_iter()
            .filter(|name| {
                classify(name) != FileKind::Sentinel || !guarded.contains(&dir.join(name))
            })
            .collect()
    }

    /// Unpack the candidate's archives; returns the merged file list and the
    /// archives that failed.
    fn expand_archives(&mut self, candidate: &CandidateDirectory) -> (Vec<String>, Vec<String>) {
        let archives: Vec<String> = candidate
            .files
            .iter()
            .filter(|file| is_archive_file(file))
            .cloned()
            .collect();
        let unpacked = self
            .extractor()
            .unpack(&candidate.path, &archives, &mut self.report.log);
        for archive in &unpacked.failed {
            self.report.record(
                &candidate.path.join(archive),
                Outcome::Failed("unable to unpack archive".to_string()),
            );
        }

        let mut files = candidate.files.clone();
        for name in unpacked.files {
            if !files.contains(&name) {
                files.push(name);
            }
        }
        (files, unpacked.failed)
    }

    fn drop_ambiguous_hint(&mut self, videos: &[String]) {
        if videos.len() >= 2 && self.name_hint.take().is_some() {
            self.report
                .log
                .debug("Several video files found; ignoring the release name for this pass");
        }
    }

    fn skip_for_marker(&mut self, video: &Path) -> bool {
        if !(self.keep_markers() && has_marker(video)) {
            return false;
        }
        self.report.log.info(format!(
            "Processing skipped for {}: .processed file detected.",
            video.display()
        ));
        self.report.record(
            video,
            Outcome::Skipped(".processed file detected".to_string()),
        );
        true
    }

    fn skip_recorded_release(&mut self, video: &str, path: &Path) -> bool {
        if self.transfer_mode() == TransferMode::Move {
            return false;
        }
        let recorded = self
            .collaborators()
            .catalog
            .episodes_by_release(strip_extension(video));
        match recorded {
            Ok(records) if records.is_empty() => false,
            Ok(_) => {
                self.report.log.debug(format!(
                    "You're trying to post process the file {video} that's already been processed, skipping"
                ));
                self.report.record(
                    path,
                    Outcome::Skipped("release already processed".to_string()),
                );
                true
            }
            Err(err) => {
                self.report.log.error(format!(
                    "Unable to check {video} against the catalog: {}",
                    err.describe()
                ));
                self.report
                    .record(path, Outcome::Skipped("catalog unavailable".to_string()));
                true
            }
        }
    }

    fn invoke_post_processor(&mut self, file: &Path) -> Outcome {
        let result = self
            .collaborators()
            .post_processor
            .process(file, self.name_hint.as_deref());
        let failure = match result {
            Ok(report) => {
                self.report.log.append_verbatim(&report.log);
                (!report.success).then(|| PROCESSOR_REPORTED_FAILURE.to_string())
            }
            Err(failure) => {
                self.report.log.append_verbatim(&failure.log);
                Some(failure.message)
            }
        };
        match failure {
            None => {
                self.report
                    .log
                    .info(format!("Processing succeeded for {}", file.display()));
                Outcome::Succeeded
            }
            Some(message) => {
                self.report.log.warning(format!(
                    "Processing failed for {}: {message}",
                    file.display()
                ));
                Outcome::Failed(message)
            }
        }
    }
}

/// Split a working file list into deduplicated videos and everything else.
fn split_videos(files: &[String]) -> (Vec<String>, Vec<String>) {
    let mut videos: Vec<String> = Vec::new();
    let mut others: Vec<String> = Vec::new();
    for file in files {
        let bucket = match classify(file) {
            FileKind::Video => &mut videos,
            FileKind::Archive | FileKind::Sentinel | FileKind::Other => &mut others,
        };
        if !bucket.contains(file) {
            bucket.push(file.clone());
        }
    }
    (videos, others)
}

fn list_file_names(dir: &Path) -> Result<Vec<String>, PostProcError> {
    list_children(dir).map(|(_, files)| files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_videos_separates_media_from_leftovers() {
        let files: Vec<String> = [
            "show.s01e01.mkv",
            "show.s01e01.processed",
            "show.s01e01.rar",
            "sample.mkv",
            "release.nfo",
            "show.s01e01.mkv",
        ]
        .iter()
        .map(|name| (*name).to_string())
        .collect();

        let (videos, others) = split_videos(&files);

        assert_eq!(videos, vec!["show.s01e01.mkv"]);
        assert_eq!(
            others,
            vec![
                "show.s01e01.processed",
                "show.s01e01.rar",
                "sample.mkv",
                "release.nfo"
            ]
        );
    }
}
