//! Pure file-name predicates used to sort a directory listing.

use std::path::Path;

use crate::model::FileKind;

/// Extension of sentinel marker files.
pub const SENTINEL_EXTENSION: &str = "processed";

const MEDIA_EXTENSIONS: &[&str] = &[
    "avi", "mkv", "mpg", "mpeg", "wmv", "ogm", "mp4", "iso", "img", "divx", "m2ts", "m4v", "ts",
    "flv", "f4v", "mov", "rmvb", "vob", "dvr-ms", "wtv", "ogv", "3gp", "webm",
];

/// Split `name` at its last dot; the extension is empty when there is no dot.
#[must_use]
pub fn split_extension(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or((name, ""))
}

/// File name with its final extension removed.
#[must_use]
pub fn strip_extension(name: &str) -> &str {
    split_extension(name).0
}

/// Final path component of `path` as UTF-8 (lossy).
#[must_use]
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether `name` is a media file worth handing to the episode post-processor.
///
/// Samples, macOS resource forks and "extras" are never media.
#[must_use]
pub fn is_media_file(name: &str) -> bool {
    if name.starts_with("._") || is_sample(name) {
        return false;
    }
    let (base, extension) = split_extension(name);
    let base = base.to_lowercase();
    if base.ends_with("extra") || base.ends_with("extras") {
        return false;
    }
    let extension = extension.to_ascii_lowercase();
    MEDIA_EXTENSIONS.contains(&extension.as_str())
}

/// Whether `name` is a RAR archive that should be opened.
///
/// Multi-volume `.partNN.rar` sets are opened through their first volume only.
#[must_use]
pub fn is_rar_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let Some(stem) = lower.strip_suffix(".rar") else {
        return false;
    };
    if stem.is_empty() {
        return false;
    }
    match volume_number(stem) {
        Some(volume) => volume == 1,
        None => true,
    }
}

/// Whether `name` is a ZIP archive.
#[must_use]
pub fn is_zip_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.len() > ".zip".len() && lower.ends_with(".zip")
}

/// Whether `name` is any archive the extractor understands.
#[must_use]
pub fn is_archive_file(name: &str) -> bool {
    is_rar_file(name) || is_zip_file(name)
}

/// Whether `name` is a `.processed` marker.
#[must_use]
pub fn is_sentinel_file(name: &str) -> bool {
    let (base, extension) = split_extension(name);
    !base.is_empty() && extension == SENTINEL_EXTENSION
}

/// Classify `name` into exactly one kind.
#[must_use]
pub fn classify(name: &str) -> FileKind {
    if is_sentinel_file(name) {
        FileKind::Sentinel
    } else if is_media_file(name) {
        FileKind::Video
    } else if is_archive_file(name) {
        FileKind::Archive
    } else {
        FileKind::Other
    }
}

fn volume_number(stem: &str) -> Option<u32> {
    let (_, tail) = stem.rsplit_once(".part")?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

fn is_sample(name: &str) -> bool {
    let lower = name.to_lowercase();
    let mut search_from = 0;
    while let Some(offset) = lower[search_from..].find("sample") {
        let start = search_from + offset;
        let preceded = lower[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let rest = lower[start + "sample".len()..].trim_start_matches(|c: char| c.is_ascii_digit());
        let followed = rest.chars().next().is_some_and(|c| !c.is_alphanumeric());
        if preceded && followed {
            return true;
        }
        search_from = start + "sample".len();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_files_are_recognised_by_extension() {
        assert!(is_media_file("Show.S01E01.720p.mkv"));
        assert!(is_media_file("show.s01e01.AVI"));
        assert!(!is_media_file("Show.S01E01.nfo"));
        assert!(!is_media_file("noextension"));
    }

    #[test]
    fn samples_forks_and_extras_are_not_media() {
        assert!(!is_media_file("show.s01e01.sample.mkv"));
        assert!(!is_media_file("Sample-show.s01e01.mkv"));
        assert!(!is_media_file("show_sample2_s01e01.mkv"));
        assert!(!is_media_file("._show.s01e01.mkv"));
        assert!(!is_media_file("show.s01.extras.mkv"));
        assert!(is_media_file("samplers.s01e01.mkv"));
    }

    #[test]
    fn rar_volumes_only_open_first_part() {
        assert!(is_rar_file("release.rar"));
        assert!(is_rar_file("release.part01.rar"));
        assert!(is_rar_file("release.part1.RAR"));
        assert!(!is_rar_file("release.part02.rar"));
        assert!(!is_rar_file("release.r00"));
        assert!(!is_rar_file(".rar"));
    }

    #[test]
    fn classify_assigns_one_kind() {
        assert_eq!(classify("a.mkv"), FileKind::Video);
        assert_eq!(classify("a.rar"), FileKind::Archive);
        assert_eq!(classify("a.zip"), FileKind::Archive);
        assert_eq!(classify("a.processed"), FileKind::Sentinel);
        assert_eq!(classify(".processed"), FileKind::Other);
        assert_eq!(classify("a.nfo"), FileKind::Other);
    }

    #[test]
    fn extension_helpers_split_on_last_dot() {
        assert_eq!(split_extension("a.b.mkv"), ("a.b", "mkv"));
        assert_eq!(strip_extension("plain"), "plain");
        assert_eq!(file_name(Path::new("/dl/Show/a.mkv")), "a.mkv");
    }
}
