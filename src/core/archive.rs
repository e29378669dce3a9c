//! Archive extraction and payload handling
//!
//! Extraction refuses entries that would land outside the extraction root:
//! absolute paths, `..` components, and links pointing out of the tree.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};

fn archive_error(context: &str, e: impl std::fmt::Display) -> SyncError {
    SyncError::ArchiveFormat(format!("{}: {}", context, e))
}

/// Unpack a `.tar.gz` file into `dest`, returning the number of entries
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> SyncResult<usize> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_overwrite(true);

    let entries = tar
        .entries()
        .map_err(|e| archive_error("failed to read archive", e))?;

    let mut count = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error("corrupt archive entry", e))?;
        let path = entry
            .path()
            .map_err(|e| archive_error("invalid entry path", e))?
            .into_owned();

        ensure_contained(&path)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(|e| archive_error("invalid link target", e))?
                .ok_or_else(|| {
                    SyncError::ArchiveFormat(format!("link {} has no target", path.display()))
                })?
                .into_owned();

            if entry_type.is_hard_link() {
                ensure_contained(&link)?;
            } else {
                ensure_link_contained(&path, &link)?;
            }
        }

        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| archive_error(&format!("failed to extract {}", path.display()), e))?;
        if !unpacked {
            return Err(SyncError::ArchiveFormat(format!(
                "entry {} escapes the extraction root",
                path.display()
            )));
        }
        count += 1;
    }

    debug!(entries = count, dest = %dest.display(), "archive extracted");
    Ok(count)
}

/// Reject absolute paths and parent-directory components
fn ensure_contained(path: &Path) -> SyncResult<()> {
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::ArchiveFormat(format!(
                    "entry {} escapes the extraction root",
                    path.display()
                )));
            }
        }
    }
    Ok(())
}

/// A symlink target is resolved against the link's own directory
fn ensure_link_contained(entry: &Path, target: &Path) -> SyncResult<()> {
    let mut depth: isize = entry
        .parent()
        .map(|p| {
            p.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count() as isize
        })
        .unwrap_or(0);

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return Err(SyncError::ArchiveFormat(format!(
                        "link {} points outside the extraction root",
                        entry.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SyncError::ArchiveFormat(format!(
                    "link {} has an absolute target",
                    entry.display()
                )));
            }
        }
    }
    Ok(())
}

/// Find the database directory inside an extracted tree
///
/// Prefers the shallowest directory literally named `payload_name`; otherwise
/// accepts the single top-level directory. Anything else is ambiguous.
pub fn locate_payload(root: &Path, payload_name: &str) -> SyncResult<PathBuf> {
    let named = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir() && e.file_name() == payload_name)
        .min_by_key(|e| e.depth());

    if let Some(entry) = named {
        return Ok(entry.into_path());
    }

    let mut top_level: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    top_level.sort();

    match top_level.len() {
        1 => Ok(top_level.remove(0)),
        0 => Err(SyncError::ArchiveFormat(format!(
            "could not find a {} directory in archive",
            payload_name
        ))),
        _ => {
            let names: Vec<String> = top_level
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();
            Err(SyncError::ArchiveFormat(format!(
                "could not find a {} directory in archive; ambiguous candidates: {}",
                payload_name,
                names.join(", ")
            )))
        }
    }
}

/// Recursively copy the contents of `src` into the existing directory `dst`
pub fn copy_tree(src: &Path, dst: &Path) -> SyncResult<u64> {
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| SyncError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| SyncError::Io(std::io::Error::other(e)))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            copied += fs::copy(entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> SyncResult<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, _target: &Path) -> SyncResult<()> {
    tracing::warn!("Skipping symlink {} while copying database", src.display());
    Ok(())
}
