//! Remote artifact source seams
//!
//! The synchronizer only talks to the network through these two traits, so
//! tests can drive it with in-memory sources.

use std::io::Write;

use crate::error::SyncResult;
use crate::remote::RemoteVersion;

/// Looks up the latest version published by the artifact server
pub trait VersionResolver {
    /// Latest remote version, or `None` when the server cannot be reached or
    /// answers with something unparseable. Must never block for long.
    fn latest_version(&self) -> Option<RemoteVersion>;
}

/// Streams the compressed database archive
pub trait ArchiveDownloader {
    /// Write the whole archive into `sink`, returning the byte count
    fn download(&self, sink: &mut dyn Write) -> SyncResult<u64>;

    /// Human-readable origin for log messages
    fn origin(&self) -> &str;
}
