//! Artifact fetcher
//!
//! Downloads the database archive, extracts it and swaps the payload into
//! place. Every temporary (archive file, extraction dir, staging dir) lives
//! in the target's parent directory and is removed on every exit path, so a
//! failed fetch leaves the target exactly as it was.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, info, warn};
use ulid::Ulid;

use super::archive::{copy_tree, extract_tar_gz, locate_payload};
use super::permissions::{normalize_permissions, remove_dir_all_writable, PermissionReport};
use super::source::ArchiveDownloader;
use crate::error::{SyncError, SyncResult};

const TEMP_PREFIX: &str = ".ragdocs-";

/// What to fetch and how
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    /// Directory name searched for inside the archive
    pub payload_name: &'a str,
    /// File that must end up writable
    pub critical_file: &'a str,
    /// Re-download even if the target exists
    pub force: bool,
}

/// Result of a successful fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// Target already existed and `force` was off; nothing was downloaded
    AlreadyPresent,
    /// A fresh copy was installed
    Installed {
        bytes: u64,
        permissions: PermissionReport,
    },
}

/// Temporary directory that is removed on drop even if its contents were
/// made read-only
struct ScratchDir {
    inner: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    fn new_in(parent: &Path, label: &str) -> SyncResult<Self> {
        let dir = Builder::new()
            .prefix(&format!("{}{}-", TEMP_PREFIX, label))
            .tempdir_in(parent)?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            inner: Some(dir),
            path,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Stop managing the directory and hand its path to the caller
    fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.inner.take() {
            dir.keep()
        } else {
            self.path.clone()
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let Some(dir) = self.inner.take() else {
            return;
        };
        let path = dir.keep();
        if let Err(e) = remove_dir_all_writable(&path) {
            warn!("Could not remove temporary directory {}: {}", path.display(), e);
        }
    }
}

/// Directory that hosts all temporaries for `target`
fn scratch_parent(target: &Path) -> PathBuf {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Ensure `target` holds the payload of the archive served by `downloader`
pub fn fetch_artifact(
    downloader: &dyn ArchiveDownloader,
    target: &Path,
    options: &FetchOptions<'_>,
) -> SyncResult<FetchOutcome> {
    if target.exists() && !options.force {
        info!("Database already exists at {}", target.display());
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let scratch = scratch_parent(target);
    fs::create_dir_all(&scratch)?;

    info!("Downloading database from {}...", downloader.origin());
    let mut archive = Builder::new()
        .prefix(&format!("{}download-", TEMP_PREFIX))
        .suffix(".tar.gz")
        .tempfile_in(&scratch)?;
    let bytes = downloader.download(archive.as_file_mut())?;
    archive.as_file_mut().flush()?;
    debug!(bytes, path = %archive.path().display(), "archive stored");

    info!("Extracting database...");
    let extracted = ScratchDir::new_in(&scratch, "extract")?;
    extract_tar_gz(archive.path(), extracted.path())?;
    let payload = locate_payload(extracted.path(), options.payload_name)?;

    // Copy rather than move so the extraction directory never becomes part
    // of the installed artifact.
    let staging = ScratchDir::new_in(&scratch, "stage")?;
    copy_tree(&payload, staging.path())?;
    drop(extracted);
    drop(archive);

    let staged = normalize_permissions(staging.path(), options.critical_file)?;
    if !staged.is_success() {
        return Err(SyncError::Permission(format!(
            "{} would not be writable after install",
            options.critical_file
        )));
    }

    swap_into_place(staging, target, &scratch)?;

    let permissions = normalize_permissions(target, options.critical_file)?;
    if !permissions.is_success() {
        warn!("Failed to fix permissions after database download - database may be read-only");
    }

    info!("Database successfully downloaded to {}", target.display());
    Ok(FetchOutcome::Installed { bytes, permissions })
}

/// Replace `target` with the staged directory. The old target is renamed
/// aside first and restored if the final rename fails.
fn swap_into_place(staging: ScratchDir, target: &Path, scratch: &Path) -> SyncResult<()> {
    let backup = if fs::symlink_metadata(target).is_ok() {
        let backup = scratch.join(format!("{}old-{}", TEMP_PREFIX, Ulid::new()));
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };

    let staged = staging.keep();
    match fs::rename(&staged, target) {
        Ok(()) => {
            if let Some(backup) = backup {
                if let Err(e) = remove_dir_all_writable(&backup) {
                    warn!("Could not remove previous database {}: {}", backup.display(), e);
                }
            }
            Ok(())
        }
        Err(e) => {
            let _ = remove_dir_all_writable(&staged);
            if let Some(backup) = backup {
                if let Err(restore) = fs::rename(&backup, target) {
                    warn!(
                        "Could not restore previous database from {}: {}",
                        backup.display(),
                        restore
                    );
                }
            }
            Err(e.into())
        }
    }
}
