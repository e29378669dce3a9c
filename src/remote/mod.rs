//! Remote artifact server module
//!
//! Blocking HTTP clients for the version endpoint and the archive download.

mod client;
mod types;

pub use client::{version_url_for, ArchiveClient, VersionClient};
pub use types::*;
