//! ragdocs CLI - Entry point
//!
//! Usage: ragdocs <command> [options]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ragdocs::cli::{config, serve, status, update, Cli, Commands};
use ragdocs::config::Config;

fn main() -> Result<()> {
    // Values from .env never override variables already set
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Stdout carries JSON-RPC in `serve`, so logs always go to stderr
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config_path = cli.config_path();
    let explicit = cli.config;

    match cli.command {
        Commands::Config(args) => config::run(args, &config_path?),
        Commands::Serve(args) => serve::run(args, &Config::load(explicit.as_deref())?),
        Commands::Update(args) => update::run(args, &Config::load(explicit.as_deref())?),
        Commands::Status(args) => status::run(args, &Config::load(explicit.as_deref())?),
    }
}
