#![forbid(unsafe_code)]
#![warn(
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    missing_docs
)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![allow(clippy::module_name_repetitions)]

//! Download-directory post-processing pass.
//!
//! One call walks a download directory, decides which release directories are
//! eligible, unpacks their archives, hands every media file to an
//! [`EpisodePostProcessor`] exactly once and cleans up the source afterwards.
//! The caller gets the accumulated status lines back as one report.
//!
//! Layout: `walker.rs` (target resolution and traversals), `eligibility.rs`
//! (ordered directory checks), `extract.rs` (RAR/ZIP unpacking),
//! `sentinel.rs` (`.processed` markers), `cleanup.rs` (move-mode source
//! cleanup), `service.rs` (orchestration), `report.rs` (result log).

pub mod catalog;
pub mod classify;
pub mod cleanup;
pub mod collaborators;
pub mod eligibility;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod report;
pub mod sentinel;
pub mod service;
pub mod walker;

pub use catalog::{
    CatalogStore, EpisodeRecord, EpisodeStatus, HistoryRecord, InMemoryCatalog, Quality,
    ShowRecord,
};
pub use collaborators::{
    EpisodePostProcessor, FailedDownloadProcessor, NameParser, PostProcessReport,
    ProcessingFailure, ReleaseIdentity,
};
pub use error::{PostProcError, PostProcResult};
pub use model::{Outcome, PassReport, ProcessRequest, UnitOutcome};
pub use parser::SceneNameParser;
pub use report::{ResultLog, Severity};
pub use service::{Collaborators, PostProcessService};
