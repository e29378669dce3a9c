//! Serve command - Start MCP server
//!
//! Makes sure a usable database is on disk (installing or updating it when
//! needed), then serves MCP over stdio.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::utils::RemoteClients;
use crate::config::Config;
use crate::core::embedding::VoyageEmbedder;
use crate::core::permissions::normalize_permissions;
use crate::core::query::QueryEngine;
use crate::core::store::SqliteVectorStore;
use crate::core::sync::{SyncOutcome, UpdateAction};
use crate::error::SyncError;

/// Start MCP server for AI integration
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Never contact the version endpoint; use the local database as is
    /// (a missing database is still downloaded)
    #[arg(long)]
    pub no_update: bool,
}

pub fn run(args: ServeArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if args.no_update {
        config.database.auto_update = false;
    }

    let db_path = prepare_database(&config, !args.no_update)?;
    let store_path = db_path.join(&config.database.critical_file);
    let store = SqliteVectorStore::open(&store_path)
        .with_context(|| format!("Failed to open vector database {}", store_path.display()))?;

    let embedder = VoyageEmbedder::from_config(&config.embedding)?;
    if !embedder.has_credentials() {
        warn!("VOYAGE_API_KEY is not set; query_docs and embed_query will return errors");
    }

    let engine = QueryEngine::new(Box::new(embedder), Box::new(store), config.query.clone());
    info!("📂 Database: {}", db_path.display());
    crate::mcp::run_mcp_server(engine)
}

/// Sync the database and make sure it is usable before serving
///
/// A failed sync is tolerated when a database directory is still present;
/// the server then runs on the stale copy. With `check_remote` off the
/// version endpoint is never queried.
pub fn prepare_database(config: &Config, check_remote: bool) -> Result<PathBuf> {
    let db_path = config.database_path();
    let mut remotes = RemoteClients::from_config(config)?;
    if !check_remote {
        remotes.version = None;
    }
    let sync = remotes.synchronizer(config);

    match sync.sync() {
        Ok(SyncOutcome::Unchanged { version }) => {
            info!("Database version: {}", version)
        }
        Ok(SyncOutcome::Installed { version }) => info!(
            "Database installed (version {})",
            version.as_deref().unwrap_or("unknown")
        ),
        Ok(SyncOutcome::Updated { from, to }) => info!("Database updated: {} -> {}", from, to),
        Err(e) if db_path.is_dir() => warn!(
            kind = e.kind(),
            "Database sync failed ({}); using existing database at {}",
            e,
            db_path.display()
        ),
        Err(SyncError::ArtifactMissing(msg)) => return Err(SyncError::ArtifactMissing(msg).into()),
        Err(e) => return Err(SyncError::ArtifactMissing(e.to_string()).into()),
    }

    if !db_path.is_dir() {
        return Err(SyncError::ArtifactMissing(format!(
            "database path {} is not a directory",
            db_path.display()
        ))
        .into());
    }

    let report = normalize_permissions(&db_path, &config.database.critical_file)?;
    if !report.is_success() {
        return Err(SyncError::Permission(format!(
            "{} is not writable",
            db_path.join(&config.database.critical_file).display()
        ))
        .into());
    }

    if !config.database.auto_update {
        if let Some(info) = sync.check_for_updates() {
            if info.action == UpdateAction::Update {
                info!(
                    "Database update available: {} -> {}. Run `ragdocs update` to install it",
                    info.current_version.as_deref().unwrap_or("unknown"),
                    info.new_version
                );
            }
        }
    }

    Ok(db_path)
}
