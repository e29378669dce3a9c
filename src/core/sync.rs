//! Sync orchestrator
//!
//! Decides whether the local database must be installed or updated, runs the
//! fetcher and records the version marker afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use super::fetch::{fetch_artifact, FetchOptions, FetchOutcome};
use super::ledger::{VersionLedger, UNKNOWN_VERSION};
use super::source::{ArchiveDownloader, VersionResolver};
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteVersion;

/// What is on disk right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalState {
    Missing,
    Present { version: String },
}

impl LocalState {
    pub fn inspect(target: &Path) -> Self {
        if target.exists() {
            LocalState::Present {
                version: VersionLedger::new(target).get(),
            }
        } else {
            LocalState::Missing
        }
    }

    pub fn version(&self) -> &str {
        match self {
            LocalState::Missing => UNKNOWN_VERSION,
            LocalState::Present { version } => version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    None,
    Install,
    Update,
}

/// Decision table for one sync run
///
/// A missing artifact is always installed; whether that is possible at all
/// (a download URL exists) is the caller's concern. An existing artifact is
/// replaced only when auto-update is on and the remote reports a different
/// version.
pub fn decide(local: &LocalState, auto_update: bool, remote: Option<&RemoteVersion>) -> SyncDecision {
    match local {
        LocalState::Missing => SyncDecision::Install,
        LocalState::Present { .. } if !auto_update => SyncDecision::None,
        LocalState::Present { version } => match remote {
            Some(remote) if remote.version != *version => SyncDecision::Update,
            _ => SyncDecision::None,
        },
    }
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Existing artifact kept as is
    Unchanged { version: String },
    /// Fresh install; `None` when the remote version could not be checked
    Installed { version: Option<String> },
    Updated { from: String, to: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Install,
    Update,
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAction::Install => write!(f, "install"),
            UpdateAction::Update => write!(f, "update"),
        }
    }
}

/// Pending install or update, as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateInfo {
    pub action: UpdateAction,
    pub current_version: Option<String>,
    pub new_version: String,
    pub size_mb: f64,
    pub changelog: Option<String>,
}

impl UpdateInfo {
    fn new(action: UpdateAction, current_version: Option<String>, remote: &RemoteVersion) -> Self {
        Self {
            action,
            current_version,
            new_version: remote.version.clone(),
            size_mb: remote.size_mb,
            changelog: remote.changelog().map(str::to_string),
        }
    }
}

/// Keeps one artifact directory in sync with the artifact server
pub struct Synchronizer<'a> {
    downloader: Option<&'a dyn ArchiveDownloader>,
    resolver: Option<&'a dyn VersionResolver>,
    target: PathBuf,
    payload_name: String,
    critical_file: String,
    auto_update: bool,
}

impl<'a> Synchronizer<'a> {
    pub fn new(target: impl Into<PathBuf>, payload_name: &str, critical_file: &str) -> Self {
        Self {
            downloader: None,
            resolver: None,
            target: target.into(),
            payload_name: payload_name.to_string(),
            critical_file: critical_file.to_string(),
            auto_update: true,
        }
    }

    pub fn with_downloader(mut self, downloader: &'a dyn ArchiveDownloader) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn with_resolver(mut self, resolver: &'a dyn VersionResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Bring the artifact to the state the decision table asks for
    pub fn sync(&self) -> SyncResult<SyncOutcome> {
        let local = LocalState::inspect(&self.target);

        let remote = match local {
            LocalState::Present { .. } if !self.auto_update => None,
            _ => self.resolver.and_then(|r| r.latest_version()),
        };

        match (decide(&local, self.auto_update, remote.as_ref()), local, remote) {
            (SyncDecision::Install, _, remote) => self.install(remote.as_ref()),
            (SyncDecision::Update, LocalState::Present { version }, Some(remote)) => {
                self.update(version, &remote)
            }
            (_, local, _) => {
                info!("Using existing database at {}", self.target.display());
                Ok(SyncOutcome::Unchanged {
                    version: local.version().to_string(),
                })
            }
        }
    }

    /// Pending install or update according to the remote, or `None` when
    /// up to date or the remote cannot be reached
    pub fn check_for_updates(&self) -> Option<UpdateInfo> {
        let remote = self.resolver?.latest_version()?;

        match LocalState::inspect(&self.target) {
            LocalState::Missing => Some(UpdateInfo::new(UpdateAction::Install, None, &remote)),
            LocalState::Present { version } if version != remote.version => Some(UpdateInfo::new(
                UpdateAction::Update,
                Some(version),
                &remote,
            )),
            LocalState::Present { .. } => None,
        }
    }

    /// Download `info.new_version` unconditionally and record it
    pub fn force_update(&self, info: &UpdateInfo) -> SyncResult<SyncOutcome> {
        let downloader = self.require_downloader()?;
        let from = LocalState::inspect(&self.target);

        info!("Updating database to version {}...", info.new_version);
        fetch_artifact(downloader, &self.target, &self.fetch_options(true))?;
        VersionLedger::new(&self.target).record(&info.new_version);

        Ok(match from {
            LocalState::Missing => SyncOutcome::Installed {
                version: Some(info.new_version.clone()),
            },
            LocalState::Present { version } => SyncOutcome::Updated {
                from: version,
                to: info.new_version.clone(),
            },
        })
    }

    fn install(&self, remote: Option<&RemoteVersion>) -> SyncResult<SyncOutcome> {
        let downloader = self.require_downloader()?;

        info!("Database not found at {}", self.target.display());
        match remote {
            Some(remote) => info!(
                "Downloading database version {} ({:.1} MB)...",
                remote.version, remote.size_mb
            ),
            None => warn!("Could not check remote version; downloading without version check"),
        }

        let outcome = fetch_artifact(downloader, &self.target, &self.fetch_options(false))
            .map_err(|e| {
                error!("Failed to download database: {}", e);
                SyncError::ArtifactMissing(format!(
                    "failed to download database to {}: {}",
                    self.target.display(),
                    e
                ))
            })?;

        let version = remote.map(|r| r.version.clone());
        if let (FetchOutcome::Installed { .. }, Some(version)) = (&outcome, &version) {
            VersionLedger::new(&self.target).record(version);
        }
        Ok(SyncOutcome::Installed { version })
    }

    fn update(&self, from: String, remote: &RemoteVersion) -> SyncResult<SyncOutcome> {
        let downloader = self.require_downloader()?;

        info!("Database update available: {} -> {}", from, remote.version);
        info!("Download size: {:.1} MB", remote.size_mb);
        if let Some(changelog) = remote.changelog() {
            info!("Changes: {}", changelog);
        }

        fetch_artifact(downloader, &self.target, &self.fetch_options(true))?;
        VersionLedger::new(&self.target).record(&remote.version);
        info!("Database updated to version {}", remote.version);

        Ok(SyncOutcome::Updated {
            from,
            to: remote.version.clone(),
        })
    }

    fn require_downloader(&self) -> SyncResult<&'a dyn ArchiveDownloader> {
        self.downloader.ok_or_else(|| {
            SyncError::ArtifactMissing(format!(
                "no database at {} and no download URL configured. \
                 Set RAGDOCS_DB_URL or database.download_url",
                self.target.display()
            ))
        })
    }

    fn fetch_options(&self, force: bool) -> FetchOptions<'_> {
        FetchOptions {
            payload_name: &self.payload_name,
            critical_file: &self.critical_file,
            force,
        }
    }
}
