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

//! Post-processing policy for the download directory pass.
//!
//! Layout: `model.rs` (typed policy), `validate.rs` (field parsing helpers),
//! `loader.rs` (environment and JSON document sources), `defaults.rs`
//! (variable names and fallback values).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{PostProcessPolicy, TransferMode};
