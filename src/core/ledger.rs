//! Local version marker
//!
//! A plain-text `.db_version` file inside the artifact directory records which
//! remote version populated it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Marker file name inside the artifact directory
pub const VERSION_FILE: &str = ".db_version";

/// Version reported when no marker can be read
pub const UNKNOWN_VERSION: &str = "unknown";

/// Reads and writes the version marker of one artifact directory
#[derive(Debug, Clone)]
pub struct VersionLedger {
    marker: PathBuf,
}

impl VersionLedger {
    pub fn new(artifact_dir: &Path) -> Self {
        Self {
            marker: artifact_dir.join(VERSION_FILE),
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    /// Installed version; `"unknown"` if the marker is missing, unreadable
    /// or empty
    pub fn get(&self) -> String {
        if !self.marker.exists() {
            return UNKNOWN_VERSION.to_string();
        }

        match fs::read_to_string(&self.marker) {
            Ok(content) => {
                let version = content.trim();
                if version.is_empty() {
                    UNKNOWN_VERSION.to_string()
                } else {
                    version.to_string()
                }
            }
            Err(e) => {
                warn!("Could not read version file: {}", e);
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    /// Persist `version`. Best-effort: a missing marker only costs a
    /// redundant update check next time.
    pub fn record(&self, version: &str) -> bool {
        match fs::write(&self.marker, version) {
            Ok(()) => {
                info!("Saved database version: {}", version);
                true
            }
            Err(e) => {
                warn!("Could not save version file: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_marker_is_unknown() {
        let dir = tempdir().unwrap();
        let ledger = VersionLedger::new(dir.path());
        assert_eq!(ledger.get(), UNKNOWN_VERSION);
    }

    #[test]
    fn test_missing_directory_is_unknown() {
        let dir = tempdir().unwrap();
        let ledger = VersionLedger::new(&dir.path().join("absent"));
        assert_eq!(ledger.get(), UNKNOWN_VERSION);
    }

    #[test]
    fn test_record_then_get() {
        let dir = tempdir().unwrap();
        let ledger = VersionLedger::new(dir.path());

        assert!(ledger.record("2025.1"));
        assert_eq!(fs::read_to_string(ledger.marker_path()).unwrap(), "2025.1");
        assert_eq!(ledger.get(), "2025.1");
    }

    #[test]
    fn test_get_trims_whitespace() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "2025.2\n").unwrap();
        assert_eq!(VersionLedger::new(dir.path()).get(), "2025.2");
    }

    #[test]
    fn test_empty_marker_is_unknown() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "  \n").unwrap();
        assert_eq!(VersionLedger::new(dir.path()).get(), UNKNOWN_VERSION);
    }

    #[test]
    fn test_record_into_missing_directory_fails_softly() {
        let dir = tempdir().unwrap();
        let ledger = VersionLedger::new(&dir.path().join("absent"));
        assert!(!ledger.record("2025.1"));
    }

    #[test]
    fn test_unreadable_marker_is_unknown() {
        let dir = tempdir().unwrap();
        // A directory where the marker file should be cannot be read as text
        fs::create_dir(dir.path().join(VERSION_FILE)).unwrap();
        assert_eq!(VersionLedger::new(dir.path()).get(), UNKNOWN_VERSION);
    }
}
