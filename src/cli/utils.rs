//! CLI utility functions
//!
//! Builds the artifact server clients and the synchronizer from config, so
//! `serve`, `update` and `status` agree on where the database comes from.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::core::sync::Synchronizer;
use crate::remote::{ArchiveClient, VersionClient};

/// HTTP clients for the configured artifact server; either may be absent
pub struct RemoteClients {
    pub archive: Option<ArchiveClient>,
    pub version: Option<VersionClient>,
}

impl RemoteClients {
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = &config.database;

        let archive = config
            .download_url()
            .map(|url| ArchiveClient::new(url, Duration::from_secs(db.download_timeout_secs)))
            .transpose()
            .context("Failed to create download client")?;

        let version = config
            .version_url()
            .map(|url| VersionClient::new(&url, Duration::from_secs(db.version_timeout_secs)))
            .transpose()
            .context("Failed to create version client")?;

        Ok(Self { archive, version })
    }

    /// Synchronizer for the configured database path
    pub fn synchronizer(&self, config: &Config) -> Synchronizer<'_> {
        let db = &config.database;
        let mut sync = Synchronizer::new(config.database_path(), &db.payload_dir, &db.critical_file)
            .auto_update(db.auto_update);

        if let Some(archive) = &self.archive {
            sync = sync.with_downloader(archive);
        }
        if let Some(version) = &self.version {
            sync = sync.with_resolver(version);
        }
        sync
    }
}
