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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (download trees and archives), mocks.rs (recording collaborators).

pub mod fixtures;
pub mod mocks;
