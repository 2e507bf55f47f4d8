//! Shelf CLI - keep a local product catalog in sync with a remote collection
//!
//! Edits land in a local SQLite file first; `shelf sync` reconciles them with
//! the remote document collection using last-write-wins per product.

mod cli;
mod commands;
mod error;
mod settings;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::add::run_add;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::list::run_list;
use crate::commands::sync::{run_sync, run_sync_conflicts, run_sync_history, SyncMode};
use crate::error::CliError;
use crate::settings::{load_config, resolve_config_path, resolve_db_path};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => ExitCode::from(status),
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<u8, CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("shelf=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config)?;
    let config = load_config(&config_path)?;
    let db_path = resolve_db_path(cli.db_path, &config)?;

    match cli.command {
        Commands::Add(args) => run_add(args, &db_path).await?,
        Commands::List { limit, json } => run_list(limit, json, &db_path).await?,
        Commands::Sync { command } => {
            let (mode, json) = match command {
                SyncCommands::Push { json } => (SyncMode::Push, json),
                SyncCommands::Pull { json } => (SyncMode::Pull, json),
                SyncCommands::Both { json } => (SyncMode::Both, json),
                SyncCommands::History { limit, json } => {
                    run_sync_history(limit, json, &db_path).await?;
                    return Ok(0);
                }
                SyncCommands::Conflicts { limit, json } => {
                    run_sync_conflicts(limit, json, &db_path).await?;
                    return Ok(0);
                }
            };
            return run_sync(mode, json, &config, &db_path).await;
        }
        Commands::Config { command } => run_config(command, &config_path, &db_path)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(0)
}
