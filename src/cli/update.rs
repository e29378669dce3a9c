//! `ragdocs update` command
//!
//! Checks the artifact server for a newer database and installs it after
//! confirmation.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::Confirm;

use super::utils::RemoteClients;
use crate::config::Config;
use crate::core::ledger::VersionLedger;
use crate::core::sync::{UpdateAction, UpdateInfo};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

pub fn run(args: UpdateArgs, config: &Config) -> Result<()> {
    println!("{}", "Database Update".bold());

    let remotes = RemoteClients::from_config(config)?;
    if remotes.archive.is_none() {
        bail!(
            "No database download URL configured. Set RAGDOCS_DB_URL or run \
             `ragdocs config database.download_url <url>`"
        );
    }

    println!("\nChecking for updates...");
    let sync = remotes.synchronizer(config);
    let Some(info) = sync.check_for_updates() else {
        let current = VersionLedger::new(sync.target()).get();
        println!("{} Already up to date (version {})", "✓".green(), current);
        return Ok(());
    };

    print_update_info(&info);

    if !args.yes && !confirm() {
        println!("Cancelled.");
        return Ok(());
    }

    println!("\nDownloading...");
    sync.force_update(&info)?;
    println!(
        "\n{} Update complete! (version {})",
        "✓".green(),
        info.new_version.cyan().bold()
    );
    Ok(())
}

fn print_update_info(info: &UpdateInfo) {
    println!();
    match info.action {
        UpdateAction::Install => {
            println!("Installing database version {}", info.new_version.cyan().bold())
        }
        UpdateAction::Update => {
            println!("Update available:");
            println!(
                "  Current: {}",
                info.current_version.as_deref().unwrap_or("unknown")
            );
            println!("  New:     {}", info.new_version.cyan().bold());
        }
    }
    println!("  Size:    {:.1} MB", info.size_mb);
    if let Some(changelog) = &info.changelog {
        println!("  Changes: {}", changelog);
    }
    println!();
}

/// Ask before downloading; a closed or non-interactive stdin counts as "no"
fn confirm() -> bool {
    Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact_opt()
        .ok()
        .flatten()
        .unwrap_or(false)
}
