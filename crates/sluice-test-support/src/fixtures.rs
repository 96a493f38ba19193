//! Download-directory fixtures.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use sluice_config::{PostProcessPolicy, TransferMode};
use sluice_postproc::{
    CatalogStore, Collaborators, EpisodePostProcessor, FailedDownloadProcessor, PostProcessService,
    SceneNameParser,
};
use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Temporary download root that is removed on drop.
#[derive(Debug)]
pub struct DownloadRoot {
    temp: TempDir,
}

impl DownloadRoot {
    /// Create an empty download root.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("failed to create download root")?;
        Ok(Self { temp })
    }

    /// Root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Create `relative` (and its parents) holding `files` with small
    /// placeholder contents.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or a file cannot be written.
    pub fn release(&self, relative: &str, files: &[&str]) -> Result<PathBuf> {
        let dir = self.path().join(relative);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        for name in files {
            write_file(&dir.join(name), name.as_bytes())?;
        }
        Ok(dir)
    }

    /// Write one file under the root.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(relative);
        write_file(&path, contents)?;
        Ok(path)
    }

    /// Policy rooted here with the given transfer mode and unpacking enabled.
    #[must_use]
    pub fn policy(&self, transfer_mode: TransferMode) -> PostProcessPolicy {
        PostProcessPolicy {
            download_root: Some(self.path().to_path_buf()),
            transfer_mode,
            unpack: true,
            ..PostProcessPolicy::default()
        }
    }
}

/// Write `contents` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be written.
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Write a ZIP archive at `path` holding `entries` (`name`, `contents`).
///
/// # Errors
///
/// Returns an error when the archive cannot be written.
pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    for (name, contents) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .with_context(|| format!("failed to start zip entry {name}"))?;
        writer
            .write_all(contents)
            .with_context(|| format!("failed to write zip entry {name}"))?;
    }
    writer.finish().context("failed to finish zip archive")?;
    Ok(())
}

/// Write a stored ZIP archive whose `damaged` entry fails its checksum on read.
///
/// The entry's first payload byte is flipped after the archive is written, so
/// the archive opens and lists normally and only extraction fails.
///
/// # Errors
///
/// Returns an error when the archive cannot be written or `damaged` is not
/// one of `entries`.
pub fn write_damaged_zip(path: &Path, entries: &[(&str, &[u8])], damaged: &str) -> Result<()> {
    let Some((_, payload)) = entries.iter().find(|(name, _)| *name == damaged) else {
        bail!("no zip entry named {damaged}");
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in entries {
        writer
            .start_file(*name, options)
            .with_context(|| format!("failed to start zip entry {name}"))?;
        writer
            .write_all(contents)
            .with_context(|| format!("failed to write zip entry {name}"))?;
    }
    writer.finish().context("failed to finish zip archive")?;

    let mut bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let Some(offset) = bytes
        .windows(payload.len())
        .position(|window| window == *payload)
    else {
        bail!("payload of {damaged} not found in {}", path.display());
    };
    bytes[offset] ^= 0x20;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

/// Service wired to `catalog`, the default parser and the given processors.
///
/// # Errors
///
/// Returns an error when the default parser cannot be built.
pub fn service(
    policy: PostProcessPolicy,
    catalog: Arc<dyn CatalogStore>,
    post_processor: Arc<dyn EpisodePostProcessor>,
    failed_processor: Arc<dyn FailedDownloadProcessor>,
) -> Result<PostProcessService> {
    let parser = SceneNameParser::new().context("failed to build name parser")?;
    Ok(PostProcessService::new(
        policy,
        Collaborators {
            catalog,
            parser: Arc::new(parser),
            post_processor,
            failed_processor,
        },
    ))
}
