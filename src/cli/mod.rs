//! CLI module - Command definitions and handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{Config, CONFIG_ENV};

pub mod config;
pub mod serve;
pub mod status;
pub mod update;
pub mod utils;

/// ragdocs - versioned documentation knowledge base for AI assistants
///
/// Keeps a local vector database in sync with the artifact server and
/// serves it over the Model Context Protocol.
#[derive(Parser, Debug)]
#[command(name = "ragdocs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare the database and start the MCP server on stdio
    Serve(serve::ServeArgs),

    /// Check for and install a newer database
    Update(update::UpdateArgs),

    /// Show database location, version and update state
    Status(status::StatusArgs),

    /// Get or set configuration
    Config(config::ConfigArgs),
}

impl Cli {
    /// Config file this invocation reads and writes
    pub fn config_path(&self) -> Result<PathBuf> {
        self.config
            .clone()
            .or_else(Config::default_config_path)
            .context("Could not determine config directory; pass --config")
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_yes() {
        let cli = Cli::try_parse_from(["ragdocs", "update", "-y", "--config", "/tmp/c.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Update(update::UpdateArgs { yes: true })));
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("/tmp/c.toml"));
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["ragdocs", "config", "database.auto_update", "false"]).unwrap();
        match cli.command {
            Commands::Config(args) => {
                assert_eq!(args.key.as_deref(), Some("database.auto_update"));
                assert_eq!(args.value.as_deref(), Some("false"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
