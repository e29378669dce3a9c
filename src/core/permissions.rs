//! Permission normalization for extracted database trees
//!
//! Archives and copies may carry read-only modes. The vector store opens its
//! database read-write, so every file and directory under the artifact is
//! forced owner-writable before use. Individual failures do not stop the walk;
//! they are collected in a [`PermissionReport`].

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};

/// A single path the normalizer could not fix
#[derive(Debug, Clone)]
pub struct PermissionFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Aggregate result of a normalization pass
#[derive(Debug, Clone, Default)]
pub struct PermissionReport {
    /// Number of entries whose mode was checked or updated
    pub fixed: usize,
    /// Entries that could not be fixed
    pub failures: Vec<PermissionFailure>,
    /// False when the critical file exists but cannot be opened for writing
    pub critical_writable: bool,
}

impl PermissionReport {
    /// The pass succeeds when the critical file is writable; other failures
    /// are advisory
    pub fn is_success(&self) -> bool {
        self.critical_writable
    }

    fn record_failure(&mut self, path: &Path, message: String) {
        warn!("Could not fix permissions for {}: {}", path.display(), message);
        self.failures.push(PermissionFailure {
            path: path.to_path_buf(),
            message,
        });
    }
}

/// Make `root`, everything below it, and its parent directory owner-writable,
/// then probe `<root>/<critical_file>` for write access
pub fn normalize_permissions(root: &Path, critical_file: &str) -> SyncResult<PermissionReport> {
    if !root.exists() {
        return Err(SyncError::Permission(format!(
            "{} does not exist",
            root.display()
        )));
    }

    let mut report = PermissionReport::default();

    // Children before parents, so tightening a directory never blocks the
    // walk from reaching entries below it.
    for entry in WalkDir::new(root).contents_first(true).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                report.record_failure(&path, e.to_string());
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            continue;
        }

        match make_owner_writable(entry.path(), file_type.is_dir()) {
            Ok(()) => report.fixed += 1,
            Err(e) => report.record_failure(entry.path(), e.to_string()),
        }
    }

    // Some platforms refuse to create files (journals, WAL) under a read-only
    // parent even when the directory itself is writable.
    if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
        if parent.exists() {
            if let Err(e) = make_owner_writable(parent, true) {
                report.record_failure(parent, e.to_string());
            }
        }
    }

    report.critical_writable = probe_writable(&root.join(critical_file));
    if report.critical_writable {
        debug!(
            root = %root.display(),
            fixed = report.fixed,
            failed = report.failures.len(),
            "permissions normalized"
        );
    } else {
        error!(
            "{} is still not writable after permission fix",
            root.join(critical_file).display()
        );
    }

    Ok(report)
}

/// Remove a directory tree even when parts of it are read-only
pub fn remove_dir_all_writable(path: &Path) -> std::io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !meta.is_dir() {
        return fs::remove_file(path);
    }

    for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
        if entry.file_type().is_dir() {
            let _ = make_owner_writable(entry.path(), true);
        }
    }
    fs::remove_dir_all(path)
}

#[cfg(unix)]
fn make_owner_writable(path: &Path, is_dir: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::symlink_metadata(path)?.permissions().mode() & 0o7777;
    let wanted = if is_dir { mode | 0o755 } else { mode | 0o644 };
    if wanted != mode {
        fs::set_permissions(path, fs::Permissions::from_mode(wanted))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_owner_writable(path: &Path, _is_dir: bool) -> std::io::Result<()> {
    let mut perms = fs::symlink_metadata(path)?.permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// A missing file counts as writable; an existing one must open for writing
fn probe_writable(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    fs::OpenOptions::new().append(true).open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("segments/a")).unwrap();
        fs::write(root.join("index.sqlite3"), b"db").unwrap();
        fs::write(root.join("segments/a/data.bin"), b"vectors").unwrap();
        fs::write(root.join("segments/header.bin"), b"h").unwrap();
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = tempdir().unwrap();
        let err = normalize_permissions(&dir.path().join("absent"), "index.sqlite3").unwrap_err();
        assert!(matches!(err, SyncError::Permission(_)));
    }

    #[test]
    fn test_missing_critical_file_is_not_failure() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("other.bin"), b"x").unwrap();

        let report = normalize_permissions(&root, "index.sqlite3").unwrap();
        assert!(report.is_success());
        assert!(report.failures.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_critical_file_fails_the_pass() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        build_tree(&root);
        fs::remove_file(root.join("index.sqlite3")).unwrap();
        fs::create_dir(root.join("index.sqlite3")).unwrap();

        let report = normalize_permissions(&root, "index.sqlite3").unwrap();
        assert!(!report.critical_writable);
        assert!(!report.is_success());
        // The rest of the tree is still walked
        assert!(report.fixed >= 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_tree_becomes_owner_writable() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        build_tree(&root);

        set_mode(&root.join("index.sqlite3"), 0o444);
        set_mode(&root.join("segments/a/data.bin"), 0o400);
        set_mode(&root.join("segments/header.bin"), 0o444);
        set_mode(&root.join("segments/a"), 0o555);
        set_mode(&root.join("segments"), 0o555);
        set_mode(&root, 0o555);

        let report = normalize_permissions(&root, "index.sqlite3").unwrap();
        assert!(report.is_success());
        assert!(report.failures.is_empty());

        for entry in WalkDir::new(&root) {
            let entry = entry.unwrap();
            let mode = mode_of(entry.path());
            if entry.file_type().is_dir() {
                assert_eq!(mode & 0o755, 0o755, "{}", entry.path().display());
            } else {
                assert_eq!(mode & 0o644, 0o644, "{}", entry.path().display());
            }
        }
        assert!(probe_writable(&root.join("index.sqlite3")));
    }

    #[cfg(unix)]
    #[test]
    fn test_parent_directory_is_fixed() {
        let dir = tempdir().unwrap();
        let parent = dir.path().join("parent");
        let root = parent.join("db");
        build_tree(&root);
        set_mode(&parent, 0o555);

        normalize_permissions(&root, "index.sqlite3").unwrap();
        assert_eq!(mode_of(&parent) & 0o755, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_bits_are_preserved() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        build_tree(&root);
        let script = root.join("tool.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        set_mode(&script, 0o500);

        normalize_permissions(&root, "index.sqlite3").unwrap();
        assert_eq!(mode_of(&script), 0o744);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_left_alone() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");
        build_tree(&root);
        let outside = dir.path().join("outside.txt");
        fs::write(&outside, b"x").unwrap();
        set_mode(&outside, 0o400);
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let report = normalize_permissions(&root, "index.sqlite3").unwrap();
        assert!(report.is_success());
        assert_eq!(mode_of(&outside), 0o400);
    }
}
