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
#![allow(clippy::redundant_pub_crate)]

//! Command-line front end running one post-processing pass.
//!
//! Layout:
//! - `cli.rs`: argument parsing, policy loading and dispatch
//! - `hooks.rs`: external-command collaborators
//! - `error.rs`: user-facing errors and exit codes
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod error;
pub(crate) mod hooks;

pub use cli::run;
