//! `ragdocs status` command
//!
//! Shows where the database lives, which version is installed and whether
//! the artifact server has something newer.

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use super::utils::RemoteClients;
use crate::config::Config;
use crate::core::ledger::VersionLedger;
use crate::core::source::VersionResolver;
use crate::core::sync::{decide, LocalState, SyncDecision};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub database_path: String,
    pub installed: bool,
    pub local_version: Option<String>,
    pub version_recorded_at: Option<String>,
    pub download_url: Option<String>,
    pub version_url: Option<String>,
    pub auto_update: bool,
    pub remote_version: Option<String>,
    pub update_available: bool,
    pub embedding_key_set: bool,
}

#[derive(Tabled)]
struct Row {
    #[tabled(rename = "Setting")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(name: &'static str, value: String) -> Row {
    Row { name, value }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

impl StatusReport {
    fn rows(&self) -> Vec<Row> {
        let yes_no = |b: bool| String::from(if b { "yes" } else { "no" });
        vec![
            row("Database path", self.database_path.clone()),
            row("Installed", yes_no(self.installed)),
            row("Local version", or_dash(self.local_version.as_deref())),
            row("Version recorded", or_dash(self.version_recorded_at.as_deref())),
            row("Download URL", or_dash(self.download_url.as_deref())),
            row("Version URL", or_dash(self.version_url.as_deref())),
            row("Auto update", yes_no(self.auto_update)),
            row("Remote version", or_dash(self.remote_version.as_deref())),
            row("Embedding key", yes_no(self.embedding_key_set)),
        ]
    }
}

/// Gather status; queries the version endpoint when one is configured
pub fn build_report(config: &Config) -> Result<StatusReport> {
    let db_path = config.database_path();
    let remotes = RemoteClients::from_config(config)?;

    let local = LocalState::inspect(&db_path);
    let ledger = VersionLedger::new(&db_path);
    let version_recorded_at = std::fs::metadata(ledger.marker_path())
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string());

    let remote = remotes.version.as_ref().and_then(|v| v.latest_version());
    let update_available = matches!(
        (&local, decide(&local, true, remote.as_ref())),
        (LocalState::Present { .. }, SyncDecision::Update)
    );

    Ok(StatusReport {
        database_path: db_path.display().to_string(),
        installed: matches!(local, LocalState::Present { .. }),
        local_version: match &local {
            LocalState::Present { version } => Some(version.clone()),
            LocalState::Missing => None,
        },
        version_recorded_at,
        download_url: config.download_url().map(str::to_string),
        version_url: remotes.version.as_ref().map(|v| v.url().to_string()),
        auto_update: config.database.auto_update,
        remote_version: remote.map(|r| r.version),
        update_available,
        embedding_key_set: config
            .embedding
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty()),
    })
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let report = build_report(config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "ragdocs status".bold());
    println!("{}", Table::new(report.rows()).with(Style::rounded()));

    if !report.installed {
        println!(
            "\n{} No database installed. It will be downloaded on first `ragdocs serve`.",
            "⚠".yellow()
        );
    } else if report.update_available {
        println!(
            "\n{} Update available: {} -> {}. Run `ragdocs update`.",
            "⬆".cyan(),
            report.local_version.as_deref().unwrap_or("unknown"),
            report.remote_version.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}
