//! End-to-end passes over temporary download directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use sluice_config::TransferMode;
use sluice_postproc::{
    CatalogStore, EpisodeRecord, EpisodeStatus, InMemoryCatalog, Outcome, PostProcessService,
    ProcessRequest, Quality,
};
use sluice_test_support::fixtures::{DownloadRoot, service, write_damaged_zip, write_zip};
use sluice_test_support::mocks::{
    FailedScript, RecordingFailedProcessor, RecordingPostProcessor, UnavailableCatalog,
};

struct Harness {
    root: DownloadRoot,
    processor: Arc<RecordingPostProcessor>,
    failed: Arc<RecordingFailedProcessor>,
    service: PostProcessService,
}

impl Harness {
    fn build(
        root: DownloadRoot,
        mode: TransferMode,
        keep_markers: bool,
        catalog: Arc<dyn CatalogStore>,
        processor: RecordingPostProcessor,
        failed: RecordingFailedProcessor,
    ) -> Result<Self> {
        let mut policy = root.policy(mode);
        policy.keep_processed_dir = keep_markers;
        policy.delete_failed = true;
        let processor = Arc::new(processor);
        let failed = Arc::new(failed);
        let service = service(policy, catalog, processor.clone(), failed.clone())?;
        Ok(Self {
            root,
            processor,
            failed,
            service,
        })
    }

    fn moving(root: DownloadRoot, processor: RecordingPostProcessor) -> Result<Self> {
        Self::build(
            root,
            TransferMode::Move,
            false,
            Arc::new(InMemoryCatalog::new()),
            processor,
            RecordingFailedProcessor::default(),
        )
    }

    fn root_path(&self) -> Result<PathBuf> {
        Ok(fs::canonicalize(self.root.path())?)
    }
}

fn copy_rar_fixture(fixture: &str, destination: &Path) -> Result<()> {
    let source = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(fixture);
    fs::copy(source, destination)?;
    Ok(())
}

#[test]
fn scheduled_root_processes_release_and_removes_directory() -> Result<()> {
    let root = DownloadRoot::new()?;
    root.release("Show.S01E01.720p", &["show.s01e01.720p.mkv", "release.nfo"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new().consuming_files())?;

    let report = harness
        .service
        .run(&ProcessRequest::new(harness.root.path()));

    let release = harness.root_path()?.join("Show.S01E01.720p");
    assert_eq!(harness.processor.file_names(), vec!["show.s01e01.720p.mkv"]);
    assert_eq!(harness.processor.calls()[0].name_hint, None);
    assert!(!release.exists());
    assert!(harness.root.path().exists());
    assert_eq!(report.outcome_for(&release), Some(&Outcome::Succeeded));
    assert!(report.log.contains("Processing succeeded for"));
    assert!(report.log.contains("recording processor: handled show.s01e01.720p.mkv"));
    Ok(())
}

#[test]
fn unpacking_directory_is_rejected_before_extraction() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("_UNPACK_Show.S01E01", &[])?;
    write_zip(&dir.join("show.s01e01.zip"), &[("show.s01e01.mkv", b"video")])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let text = harness.service.process(&ProcessRequest::new(harness.root.path()));

    assert!(harness.processor.calls().is_empty());
    assert!(!dir.join("show.s01e01.mkv").exists());
    assert!(text.contains("in the process of being unpacked"));
    Ok(())
}

#[test]
fn archive_only_release_is_unpacked_and_processed() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S01E02", &[])?;
    write_zip(&dir.join("show.s01e02.zip"), &[("Release/show.s01e02.mkv", b"video")])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new().consuming_files())?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    let release = harness.root_path()?.join("Show.S01E02");
    let calls = harness.processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, release.join("show.s01e02.mkv"));
    assert!(report.log.contains("Unpacking archive: show.s01e02.zip"));
    assert!(!release.exists(), "archive leftover and directory should be cleaned");
    Ok(())
}

#[test]
fn rar_only_release_is_unpacked_and_processed() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S01E03", &[])?;
    copy_rar_fixture("episode.rar", &dir.join("show.s01e03.rar"))?;
    let harness = Harness::moving(root, RecordingPostProcessor::new().consuming_files())?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    let release = harness.root_path()?.join("Show.S01E03");
    let calls = harness.processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, release.join("show.s01e03.mkv"));
    assert!(report.log.contains("Unpacking archive: show.s01e03.rar"));
    assert_eq!(report.outcome_for(&release), Some(&Outcome::Succeeded));
    assert!(!release.exists(), "archive, notes and directory should be cleaned");
    Ok(())
}

#[test]
fn damaged_archive_never_reaches_the_processor() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S01E02", &[])?;
    write_damaged_zip(
        &dir.join("show.s01e02.zip"),
        &[("show.s01e02.nfo", b"notes"), ("show.s01e02.mkv", b"GOODVIDEOPAYLOAD")],
        "show.s01e02.mkv",
    )?;
    let harness = Harness::moving(root, RecordingPostProcessor::new().consuming_files())?;
    let request = ProcessRequest::new(harness.root.path());

    let first = harness.service.run(&request);
    let second = harness.service.run(&request);

    let release = harness.root_path()?.join("Show.S01E02");
    assert!(harness.processor.calls().is_empty());
    assert!(!release.join("show.s01e02.mkv").exists());
    assert!(!release.join("show.s01e02.nfo").exists());
    assert!(release.join("show.s01e02.zip").exists(), "a failed tree keeps its archive");
    for report in [&first, &second] {
        assert!(matches!(report.outcome_for(&release), Some(Outcome::Failed(_))));
        assert!(report.log.contains("Failed Unrar archive show.s01e02.zip"));
    }
    Ok(())
}

#[test]
fn show_library_locations_are_never_processed() -> Result<()> {
    let root = DownloadRoot::new()?;
    let library = root.release("Library", &["show.s01e01.mkv"])?;
    let catalog = InMemoryCatalog::new().with_show(1, "Show", library);
    let harness = Harness::build(
        root,
        TransferMode::Move,
        false,
        Arc::new(catalog),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::default(),
    )?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert!(harness.processor.calls().is_empty());
    assert!(report.log.contains("already been moved to its show dir"));
    Ok(())
}

#[test]
fn marker_makes_second_pass_skip() -> Result<()> {
    let root = DownloadRoot::new()?;
    root.release("Show.S01E03.720p", &["show.s01e03.mkv", "release.nfo"])?;
    let harness = Harness::build(
        root,
        TransferMode::Copy,
        true,
        Arc::new(InMemoryCatalog::new()),
        RecordingPostProcessor::new().writing_markers(),
        RecordingFailedProcessor::default(),
    )?;
    let request = ProcessRequest::new(harness.root.path());

    let _ = harness.service.run(&request);
    let second = harness.service.run(&request);

    let video = harness
        .root_path()?
        .join("Show.S01E03.720p")
        .join("show.s01e03.mkv");
    assert_eq!(harness.processor.calls().len(), 1);
    assert!(matches!(second.outcome_for(&video), Some(Outcome::Skipped(_))));
    assert!(second.log.contains(".processed file detected"));
    assert!(video.exists(), "copy mode never deletes sources");
    Ok(())
}

#[test]
fn orphaned_markers_are_reclaimed_and_paired_markers_kept() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release(
        "Show.S01E04",
        &["show.s01e04.mkv", "show.s01e04.processed", "old.release.processed"],
    )?;
    let harness = Harness::build(
        root,
        TransferMode::Copy,
        true,
        Arc::new(InMemoryCatalog::new()),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::default(),
    )?;

    let _ = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert!(harness.processor.calls().is_empty());
    assert!(dir.join("show.s01e04.processed").exists());
    assert!(!dir.join("old.release.processed").exists());
    Ok(())
}

#[test]
fn marker_survives_move_cleanup_while_its_video_remains() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release(
        "Show.S01E09",
        &["show.s01e09.mkv", "show.s01e09.processed", "release.nfo"],
    )?;
    let harness = Harness::build(
        root,
        TransferMode::Move,
        true,
        Arc::new(InMemoryCatalog::new()),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::default(),
    )?;
    let request = ProcessRequest::new(harness.root.path());

    let _ = harness.service.run(&request);
    let second = harness.service.run(&request);

    assert!(harness.processor.calls().is_empty());
    assert!(dir.join("show.s01e09.mkv").exists());
    assert!(dir.join("show.s01e09.processed").exists());
    assert!(!dir.join("release.nfo").exists());
    assert!(second.log.contains(".processed file detected"));
    Ok(())
}

#[test]
fn several_videos_drop_the_name_hint() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S01", &["show.s01e01.mkv", "show.s01e02.mkv"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let _ = harness
        .service
        .run(&ProcessRequest::new(&dir).with_name_hint("Show.S01.Complete"));

    let calls = harness.processor.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.name_hint.is_none()));
    Ok(())
}

#[test]
fn single_video_keeps_the_name_hint() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S01E05.720p", &["show.s01e05.mkv"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let _ = harness
        .service
        .run(&ProcessRequest::new(&dir).with_name_hint("Show.S01E05.720p-GRP"));

    let calls = harness.processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name_hint.as_deref(), Some("Show.S01E05.720p-GRP"));
    Ok(())
}

#[test]
fn first_failure_stops_the_directory_and_keeps_leftovers() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release(
        "Show.S02",
        &["show.s02e01.mkv", "show.s02e02.mkv", "release.nfo"],
    )?;
    let other = root.release("Show.S03E01", &["show.s03e01.mkv", "release.nfo"])?;
    let harness = Harness::moving(
        root,
        RecordingPostProcessor::new()
            .failing_on("show.s02e01.mkv", "destination is read-only")
            .consuming_files(),
    )?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert_eq!(
        harness.processor.file_names(),
        vec!["show.s02e01.mkv", "show.s03e01.mkv"]
    );
    assert!(dir.join("release.nfo").exists());
    assert!(dir.join("show.s02e02.mkv").exists());
    assert!(!other.exists(), "sibling directory is processed and cleaned");
    let canonical = harness.root_path()?.join("Show.S02");
    assert_eq!(
        report.outcome_for(&canonical),
        Some(&Outcome::Failed("destination is read-only".to_string()))
    );
    assert!(report.log.contains("Processing failed for"));
    assert!(report.log.contains("recording processor: giving up on show.s02e01.mkv"));
    Ok(())
}

#[test]
fn unsuccessful_report_counts_as_failure() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S02E03", &["show.s02e03.mkv", "release.nfo"])?;
    let harness = Harness::moving(
        root,
        RecordingPostProcessor::new().unsuccessful_on("show.s02e03.mkv"),
    )?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert!(dir.join("release.nfo").exists());
    let canonical = harness.root_path()?.join("Show.S02E03");
    assert!(matches!(report.outcome_for(&canonical), Some(Outcome::Failed(_))));
    Ok(())
}

#[test]
fn bare_file_is_processed_once_and_recorded_release_skipped() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Incoming", &["show.s01e06.mkv", "show.s01e07.mkv"])?;
    let catalog = InMemoryCatalog::new().with_episode(EpisodeRecord {
        show_id: 1,
        season: 1,
        episode: 7,
        release_name: "show.s01e07".to_string(),
        status: EpisodeStatus::Downloaded(Quality::Sd),
    });
    let harness = Harness::build(
        root,
        TransferMode::Copy,
        false,
        Arc::new(catalog),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::default(),
    )?;

    let _ = harness
        .service
        .run(&ProcessRequest::new(&dir).with_name_hint("show.s01e06.mkv"));
    let skipped = harness
        .service
        .run(&ProcessRequest::new(&dir).with_name_hint("show.s01e07.mkv"));

    assert_eq!(harness.processor.file_names(), vec!["show.s01e06.mkv"]);
    assert!(skipped.log.contains("that's already been processed, skipping"));
    Ok(())
}

#[test]
fn loose_root_files_are_all_attempted() -> Result<()> {
    let root = DownloadRoot::new()?;
    root.file("show.s04e01.mkv", b"a")?;
    root.file("show.s04e02.mkv", b"b")?;
    let harness = Harness::moving(
        root,
        RecordingPostProcessor::new().failing_on("show.s04e01.mkv", "unknown show"),
    )?;

    let _ = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert_eq!(
        harness.processor.file_names(),
        vec!["show.s04e01.mkv", "show.s04e02.mkv"]
    );
    assert!(harness.root.path().exists());
    Ok(())
}

#[test]
fn failed_download_is_handed_off_and_deleted() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S05E01", &["show.s05e01.mkv"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let text = harness
        .service
        .process(&ProcessRequest::new(&dir).with_name_hint("Show.S05E01").failed());

    assert!(harness.processor.calls().is_empty());
    assert_eq!(harness.failed.calls().len(), 1);
    assert!(!dir.exists());
    assert!(text.contains("recording failed processor: marked failed"));
    assert!(text.contains("Processing succeeded: (Show.S05E01,"));
    Ok(())
}

#[test]
fn failed_download_error_keeps_the_directory() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S05E02", &["show.s05e02.mkv"])?;
    let harness = Harness::build(
        root,
        TransferMode::Move,
        false,
        Arc::new(InMemoryCatalog::new()),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::new(FailedScript::Raise("no snatch history".to_string())),
    )?;

    let report = harness.service.run(&ProcessRequest::new(&dir).failed());

    assert!(dir.exists());
    assert!(report.log.contains("Processing failed: (-,"));
    assert!(report.log.contains("no snatch history"));
    Ok(())
}

#[test]
fn failed_download_never_removes_the_download_root() -> Result<()> {
    let root = DownloadRoot::new()?;
    let dir = root.release("Show.S05E03", &["show.s05e03.mkv"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let report = harness
        .service
        .run(&ProcessRequest::new(harness.root.path()).failed());

    assert_eq!(harness.failed.calls().len(), 1);
    assert!(harness.root.path().exists());
    assert!(dir.join("show.s05e03.mkv").exists());
    assert!(report.log.contains("because it is the download root"));
    assert!(!report.log.contains("Deleting folder of failed download"));
    Ok(())
}

#[test]
fn unresolvable_target_returns_report_without_processing() -> Result<()> {
    let root = DownloadRoot::new()?;
    let harness = Harness::moving(root, RecordingPostProcessor::new())?;

    let text = harness
        .service
        .process(&ProcessRequest::new("/remote/client/Missing.Release"));

    assert!(harness.processor.calls().is_empty());
    assert!(text.contains("Unable to figure out what folder to process"));
    Ok(())
}

#[test]
fn catalog_outage_makes_directories_ineligible() -> Result<()> {
    let root = DownloadRoot::new()?;
    root.release("Show.S06E01", &["show.s06e01.mkv"])?;
    let harness = Harness::build(
        root,
        TransferMode::Copy,
        false,
        Arc::new(UnavailableCatalog),
        RecordingPostProcessor::new(),
        RecordingFailedProcessor::default(),
    )?;

    let report = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert!(harness.processor.calls().is_empty());
    assert!(report.log.contains("[ERROR] Unable to check"));
    Ok(())
}

#[test]
fn nested_releases_are_processed_deepest_first() -> Result<()> {
    let root = DownloadRoot::new()?;
    root.release("Show.S07", &["show.s07e01.mkv"])?;
    root.release("Show.S07/Disc2", &["show.s07e02.mkv"])?;
    let harness = Harness::moving(root, RecordingPostProcessor::new().consuming_files())?;

    let _ = harness.service.run(&ProcessRequest::new(harness.root.path()));

    assert_eq!(
        harness.processor.file_names(),
        vec!["show.s07e02.mkv", "show.s07e01.mkv"]
    );
    assert!(!harness.root.path().join("Show.S07").exists());
    Ok(())
}
