//! Flat, non-overwriting archive extraction into the archive's own directory.
//!
//! Each entry is written under a temporary name and renamed into place once
//! it is complete. When an archive fails, every file it placed is removed
//! again, so a later pass never mistakes a half-written entry for a good one.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::classify::{is_rar_file, is_zip_file};
use crate::error::{PostProcError, PostProcResult};
use crate::report::ResultLog;

const PARTIAL_SUFFIX: &str = "unpacking";

/// What a batch of archives produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unpacked {
    /// Names of every non-directory entry, merged into the working file list.
    pub files: Vec<String>,
    /// Archives that could not be extracted.
    pub failed: Vec<String>,
}

/// Expands RAR and ZIP archives found in a download directory.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveExtractor {
    enabled: bool,
}

impl ArchiveExtractor {
    /// Extractor honouring the unpack toggle.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Extract `archives` (names relative to `dir`) flat into `dir`.
    ///
    /// Entries whose destination already exists are left alone. One failing
    /// archive is logged, the files it placed are removed, and the rest are
    /// still attempted.
    pub fn unpack(&self, dir: &Path, archives: &[String], log: &mut ResultLog) -> Unpacked {
        let mut unpacked = Unpacked::default();
        if !self.enabled || archives.is_empty() {
            return unpacked;
        }
        log.debug(format!("Packed Releases detected: {archives:?}"));
        for archive in archives {
            log.debug(format!("Unpacking archive: {archive}"));
            let mut placed = Placed::default();
            match extract_archive(&dir.join(archive), dir, &mut placed) {
                Ok(mut names) => unpacked.files.append(&mut names),
                Err(err) => {
                    placed.roll_back();
                    log.error(format!("Failed Unrar archive {archive}: {}", err.describe()));
                    unpacked.failed.push(archive.clone());
                }
            }
        }
        log.debug(format!("UnRar content: {:?}", unpacked.files));
        unpacked
    }
}

/// Files one archive has written so far.
#[derive(Debug, Default)]
struct Placed {
    paths: Vec<PathBuf>,
}

impl Placed {
    /// Write `destination` through a temporary sibling, then rename it into place.
    fn stage<T, F>(&mut self, destination: &Path, write: F) -> PostProcResult<T>
    where
        F: FnOnce(&Path) -> PostProcResult<T>,
    {
        let partial = partial_path(destination);
        let written = match write(&partial) {
            Ok(written) => written,
            Err(err) => {
                remove_quietly(&partial);
                return Err(err);
            }
        };
        if let Err(source) = fs::rename(&partial, destination) {
            remove_quietly(&partial);
            return Err(PostProcError::io("unpack.commit", destination, source));
        }
        self.paths.push(destination.to_path_buf());
        Ok(written)
    }

    fn roll_back(self) {
        for path in self.paths {
            remove_quietly(&path);
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{name}.{PARTIAL_SUFFIX}"))
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed incomplete archive entry"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            path = %path.display(),
            error = %err,
            "unable to remove incomplete archive entry"
        ),
    }
}

fn extract_archive(
    archive: &Path,
    target: &Path,
    placed: &mut Placed,
) -> PostProcResult<Vec<String>> {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if is_zip_file(&name) {
        extract_zip(archive, target, placed)
    } else if is_rar_file(&name) {
        extract_rar(archive, target, placed)
    } else {
        Err(PostProcError::UnsupportedArchive {
            path: archive.to_path_buf(),
        })
    }
}

fn extract_zip(
    archive: &Path,
    target: &Path,
    placed: &mut Placed,
) -> PostProcResult<Vec<String>> {
    let file = File::open(archive)
        .map_err(|source| PostProcError::io("unpack.zip.open", archive, source))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|source| PostProcError::zip("unpack.zip.decode", archive, source))?;

    let mut names = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|source| PostProcError::zip("unpack.zip.read_entry", archive, source))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = flat_name(entry.name()) else {
            continue;
        };
        let destination = target.join(&name);
        names.push(name);
        if destination.exists() {
            debug!(path = %destination.display(), "archive entry already present");
            continue;
        }
        placed.stage(&destination, |partial| {
            let mut output = File::create(partial)
                .map_err(|source| PostProcError::io("unpack.zip.create_file", partial, source))?;
            io::copy(&mut entry, &mut output)
                .map_err(|source| PostProcError::io("unpack.zip.copy", partial, source))?;
            Ok(())
        })?;
    }
    Ok(names)
}

fn extract_rar(
    archive: &Path,
    target: &Path,
    placed: &mut Placed,
) -> PostProcResult<Vec<String>> {
    let mut cursor = unrar::Archive::new(archive)
        .open_for_processing()
        .map_err(|source| PostProcError::rar("unpack.rar.open", archive, source))?;

    let mut names = Vec::new();
    while let Some(header) = cursor
        .read_header()
        .map_err(|source| PostProcError::rar("unpack.rar.read_header", archive, source))?
    {
        let (is_file, entry_name) = {
            let entry = header.entry();
            (entry.is_file(), entry.filename.to_string_lossy().into_owned())
        };
        let destination = match (is_file, flat_name(&entry_name)) {
            (true, Some(name)) => {
                let destination = target.join(&name);
                names.push(name);
                Some(destination).filter(|path| !path.exists())
            }
            _ => None,
        };
        cursor = match destination {
            Some(destination) => placed.stage(&destination, |partial| {
                header
                    .extract_to(partial)
                    .map_err(|source| PostProcError::rar("unpack.rar.extract", partial, source))
            })?,
            None => header
                .skip()
                .map_err(|source| PostProcError::rar("unpack.rar.skip", archive, source))?,
        };
    }
    Ok(names)
}

/// Final component of an archive entry name; sub-paths are discarded.
fn flat_name(entry: &str) -> Option<String> {
    let name = entry.rsplit(['/', '\\']).next().unwrap_or(entry);
    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::CompressionMethod;
    use zip::write::FileOptions;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> TestResult {
        let mut writer = zip::ZipWriter::new(File::create(path)?);
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options)?;
            } else {
                writer.start_file(*name, options)?;
                writer.write_all(bytes)?;
            }
        }
        writer.finish()?;
        Ok(())
    }

    /// Flip one byte of `payload` inside a stored archive so its checksum no longer matches.
    fn damage(path: &Path, payload: &[u8]) -> TestResult {
        let mut bytes = fs::read(path)?;
        let offset = bytes
            .windows(payload.len())
            .position(|window| window == payload)
            .ok_or("payload not found in archive")?;
        bytes[offset] ^= 0x20;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn rar_fixture(name: &str, into: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let source = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name);
        let destination = into.join(name);
        fs::copy(source, &destination)?;
        Ok(destination)
    }

    fn listing(dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    #[test]
    fn zip_entries_land_flat_without_overwrite() -> TestResult {
        let temp = tempfile::tempdir()?;
        write_zip(
            &temp.path().join("release.zip"),
            &[
                ("nested/", b""),
                ("nested/release.mkv", b"video"),
                ("release.nfo", b"fresh"),
            ],
        )?;
        fs::write(temp.path().join("release.nfo"), b"original")?;
        let mut log = ResultLog::new();

        let unpacked = ArchiveExtractor::new(true).unpack(
            temp.path(),
            &["release.zip".to_string()],
            &mut log,
        );

        assert!(unpacked.failed.is_empty());
        assert_eq!(unpacked.files, vec!["release.mkv", "release.nfo"]);
        assert_eq!(fs::read(temp.path().join("release.mkv"))?, b"video");
        assert_eq!(fs::read(temp.path().join("release.nfo"))?, b"original");
        assert!(!temp.path().join("nested").exists());
        assert!(log.contains("Unpacking archive: release.zip"));
        Ok(())
    }

    #[test]
    fn disabled_extractor_is_a_no_op() -> TestResult {
        let temp = tempfile::tempdir()?;
        write_zip(&temp.path().join("a.zip"), &[("a.mkv", b"x")])?;
        let mut log = ResultLog::new();
        let unpacked =
            ArchiveExtractor::new(false).unpack(temp.path(), &["a.zip".to_string()], &mut log);
        assert_eq!(unpacked, Unpacked::default());
        assert!(log.is_empty());
        assert!(!temp.path().join("a.mkv").exists());
        Ok(())
    }

    #[test]
    fn corrupt_archive_fails_but_batch_continues() -> TestResult {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("broken.zip"), b"not a zip")?;
        write_zip(&temp.path().join("good.zip"), &[("good.mkv", b"x")])?;
        let mut log = ResultLog::new();

        let unpacked = ArchiveExtractor::new(true).unpack(
            temp.path(),
            &["broken.zip".to_string(), "good.zip".to_string()],
            &mut log,
        );

        assert_eq!(unpacked.failed, vec!["broken.zip".to_string()]);
        assert_eq!(unpacked.files, vec!["good.mkv".to_string()]);
        assert!(log.contains("[ERROR] Failed Unrar archive broken.zip"));
        Ok(())
    }

    #[test]
    fn checksum_failure_removes_every_file_the_archive_placed() -> TestResult {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("show.s01e02.zip");
        write_zip(
            &archive,
            &[
                ("show.s01e02.srt", b"subtitles"),
                ("show.s01e02.nfo", b"fresh notes"),
                ("show.s01e02.mkv", b"GOODVIDEOPAYLOAD"),
            ],
        )?;
        damage(&archive, b"GOODVIDEOPAYLOAD")?;
        fs::write(temp.path().join("show.s01e02.nfo"), b"original")?;
        let archives = vec!["show.s01e02.zip".to_string()];

        for _ in 0..2 {
            let mut log = ResultLog::new();
            let unpacked = ArchiveExtractor::new(true).unpack(temp.path(), &archives, &mut log);

            assert_eq!(unpacked.failed, archives);
            assert!(unpacked.files.is_empty());
            assert!(log.contains("[ERROR] Failed Unrar archive show.s01e02.zip"));
            assert_eq!(listing(temp.path())?, vec!["show.s01e02.nfo", "show.s01e02.zip"]);
            assert_eq!(fs::read(temp.path().join("show.s01e02.nfo"))?, b"original");
        }
        Ok(())
    }

    #[test]
    fn rar_entries_land_flat_without_overwrite() -> TestResult {
        let temp = tempfile::tempdir()?;
        rar_fixture("episode.rar", temp.path())?;
        fs::write(temp.path().join("show.s01e03.nfo"), b"original")?;
        let mut log = ResultLog::new();

        let unpacked = ArchiveExtractor::new(true).unpack(
            temp.path(),
            &["episode.rar".to_string()],
            &mut log,
        );

        assert!(unpacked.failed.is_empty());
        assert_eq!(unpacked.files, vec!["show.s01e03.mkv", "show.s01e03.nfo"]);
        assert_eq!(fs::read(temp.path().join("show.s01e03.mkv"))?, b"rar video payload");
        assert_eq!(fs::read(temp.path().join("show.s01e03.nfo"))?, b"original");
        assert!(!temp.path().join("Release").exists());
        assert_eq!(
            listing(temp.path())?,
            vec!["episode.rar", "show.s01e03.mkv", "show.s01e03.nfo"]
        );
        Ok(())
    }

    #[test]
    fn corrupt_rar_is_rolled_back() -> TestResult {
        let temp = tempfile::tempdir()?;
        rar_fixture("corrupt.rar", temp.path())?;
        let mut log = ResultLog::new();

        let unpacked = ArchiveExtractor::new(true).unpack(
            temp.path(),
            &["corrupt.rar".to_string()],
            &mut log,
        );

        assert_eq!(unpacked.failed, vec!["corrupt.rar".to_string()]);
        assert!(unpacked.files.is_empty());
        assert_eq!(listing(temp.path())?, vec!["corrupt.rar"]);
        assert!(log.contains("[ERROR] Failed Unrar archive corrupt.rar"));
        Ok(())
    }

    #[test]
    fn flat_name_drops_directories() {
        assert_eq!(flat_name("a/b/c.mkv").as_deref(), Some("c.mkv"));
        assert_eq!(flat_name("a\\c.mkv").as_deref(), Some("c.mkv"));
        assert_eq!(flat_name("a/.."), None);
        assert_eq!(flat_name("dir/"), None);
    }

    #[test]
    fn partial_names_are_hidden_siblings() {
        assert_eq!(
            partial_path(Path::new("/dl/show.mkv")),
            PathBuf::from("/dl/.show.mkv.unpacking")
        );
    }
}
