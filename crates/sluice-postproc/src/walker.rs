//! Target resolution and the two directory traversals.
//!
//! `plan` decides what one invocation looks at; `processing_order` walks an
//! eligible subtree deepest-first for processing; `subtree_file_names` feeds
//! the eligibility checks. The traversals never share state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::classify::file_name;
use crate::error::{PostProcError, PostProcResult};
use crate::model::{CandidateDirectory, Origin};
use crate::report::ResultLog;

/// What one invocation will look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkPlan {
    /// How the target entered the pass.
    pub origin: Origin,
    /// Directory holding `subdirectories`.
    pub parent: PathBuf,
    /// Candidate subdirectory names, evaluated for eligibility one by one.
    pub subdirectories: Vec<String>,
    /// Directory holding `loose_files`.
    pub loose_dir: PathBuf,
    /// Files processed directly, outside any candidate subdirectory.
    pub loose_files: Vec<String>,
}

impl WalkPlan {
    /// Loose files as a candidate directory.
    #[must_use]
    pub fn loose_candidate(&self) -> CandidateDirectory {
        CandidateDirectory {
            path: self.loose_dir.clone(),
            origin: self.origin,
            files: self.loose_files.clone(),
        }
    }

    /// Whether the invocation targets one bare file.
    #[must_use]
    pub fn is_bare_file(&self) -> bool {
        self.origin == Origin::ExplicitTarget && !self.loose_files.is_empty()
    }
}

/// Resolve the caller's path into an existing directory.
///
/// Existing directories are canonicalized. Anything else is retried as a leaf
/// name under the download root, which covers download clients running on a
/// different host.
pub fn resolve_target(target: &Path, root: Option<&Path>, log: &mut ResultLog) -> Option<PathBuf> {
    log.debug(format!("Processing folder {}", target.display()));
    log.debug(format!(
        "Download root: {}",
        root.map(|root| root.display().to_string()).unwrap_or_default()
    ));

    let mut resolved = target.to_path_buf();
    if target.is_dir() {
        resolved = fs::canonicalize(target).unwrap_or(resolved);
    } else if let Some(root) = root.filter(|root| root.is_dir() && *root != target)
        && let Some(leaf) = target.file_name()
    {
        resolved = root.join(leaf);
        log.debug(format!("Trying to use folder {}", resolved.display()));
    }

    if resolved.is_dir() {
        Some(resolved)
    } else {
        log.warning(
            "Unable to figure out what folder to process. If your downloader and this host \
             aren't the same machine make sure the download root is configured.",
        );
        None
    }
}

/// Decide between scheduled-root, explicit-directory and bare-file modes.
///
/// # Errors
///
/// Returns `PostProcError::Walkdir` when the root listing cannot be read.
pub fn plan(
    resolved: &Path,
    root: Option<&Path>,
    name_hint: Option<&str>,
    log: &mut ResultLog,
) -> PostProcResult<WalkPlan> {
    let is_root = root.is_some_and(|root| same_directory(resolved, root));
    let plan = if is_root && name_hint.is_none() {
        let (subdirectories, loose_files) = list_children(resolved)?;
        WalkPlan {
            origin: Origin::ScheduledRoot,
            parent: resolved.to_path_buf(),
            subdirectories,
            loose_dir: resolved.to_path_buf(),
            loose_files,
        }
    } else if let Some(hint) = name_hint
        .filter(|hint| !hint.ends_with(".nzb"))
        .filter(|hint| resolved.join(hint).is_file())
    {
        WalkPlan {
            origin: Origin::ExplicitTarget,
            parent: resolved.parent().unwrap_or(resolved).to_path_buf(),
            subdirectories: Vec::new(),
            loose_dir: resolved.to_path_buf(),
            loose_files: vec![hint.to_string()],
        }
    } else {
        let leaf = file_name(resolved);
        WalkPlan {
            origin: Origin::ExplicitTarget,
            parent: resolved.parent().unwrap_or(resolved).to_path_buf(),
            subdirectories: if leaf.is_empty() { Vec::new() } else { vec![leaf] },
            loose_dir: resolved.to_path_buf(),
            loose_files: Vec::new(),
        }
    };

    log.debug(format!("PostProcessing Path: {}", plan.parent.display()));
    log.debug(format!("PostProcessing Dirs: {:?}", plan.subdirectories));
    Ok(plan)
}

/// Every directory of the subtree at `dir`, deepest first, with the names of
/// the files directly inside it. Siblings are visited in name order.
///
/// # Errors
///
/// Returns `PostProcError::Walkdir` when part of the subtree cannot be read.
pub fn processing_order(
    dir: &Path,
    origin: Origin,
) -> PostProcResult<Vec<CandidateDirectory>> {
    let mut pending: HashMap<PathBuf, Vec<String>> = HashMap::new();
    let mut ordered = Vec::new();
    for entry in WalkDir::new(dir).contents_first(true).sort_by_file_name() {
        let entry =
            entry.map_err(|source| PostProcError::walkdir("walk.process", dir, source))?;
        if entry.file_type().is_dir() {
            let files = pending.remove(entry.path()).unwrap_or_default();
            ordered.push(CandidateDirectory {
                path: entry.into_path(),
                origin,
                files,
            });
        } else if let Some(parent) = entry.path().parent() {
            pending
                .entry(parent.to_path_buf())
                .or_default()
                .push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(ordered)
}

/// Names of every file anywhere under `dir`.
///
/// # Errors
///
/// Returns `PostProcError::Walkdir` when part of the subtree cannot be read.
pub fn subtree_file_names(dir: &Path) -> PostProcResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry =
            entry.map_err(|source| PostProcError::walkdir("walk.eligibility", dir, source))?;
        if !entry.file_type().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Immediate children of `dir` split into (directories, files), sorted by name.
pub(crate) fn list_children(dir: &Path) -> PostProcResult<(Vec<String>, Vec<String>)> {
    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry =
            entry.map_err(|source| PostProcError::walkdir("walk.list_children", dir, source))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() {
            directories.push(name);
        } else {
            files.push(name);
        }
    }
    Ok((directories, files))
}

pub(crate) fn same_directory(left: &Path, right: &Path) -> bool {
    if left == right {
        return true;
    }
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}
