use std::path::{Path, PathBuf};

use shelf_core::util::normalize_text_option;
use shelf_core::ShelfConfig;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::settings::load_config;

/// Values passed to `shelf config init`
#[derive(Debug, Default)]
pub struct ConfigInit {
    pub remote_url: Option<String>,
    pub project_id: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub auth_token: Option<String>,
    pub local_db_path: Option<PathBuf>,
    pub concurrency: Option<usize>,
}

pub fn run_config(
    command: ConfigCommands,
    config_path: &Path,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            remote_url,
            project_id,
            database,
            collection,
            auth_token,
            local_db_path,
            concurrency,
        } => run_config_init(
            ConfigInit {
                remote_url,
                project_id,
                database,
                collection,
                auth_token,
                local_db_path,
                concurrency,
            },
            config_path,
        ),
        ConfigCommands::Show { json } => run_config_show(config_path, db_path, json),
    }
}

pub fn run_config_init(init: ConfigInit, config_path: &Path) -> Result<(), CliError> {
    let mut config = ShelfConfig::load_from_path(config_path)?;
    apply_init(&mut config, init)?;
    config.save_to_path(config_path)?;

    println!("Saved config to {}", config_path.display());
    if config.remote.project_id.is_none() {
        println!("No remote project configured yet; pass --project-id to enable sync.");
    }
    Ok(())
}

/// Merge explicit flags into `config`, keeping existing values for omitted ones
pub fn apply_init(config: &mut ShelfConfig, init: ConfigInit) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(init.remote_url) {
        config.remote.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(project_id) = normalize_text_option(init.project_id) {
        config.remote.project_id = Some(project_id);
    }
    if let Some(database) = normalize_text_option(init.database) {
        config.remote.database = database;
    }
    if let Some(collection) = normalize_text_option(init.collection) {
        config.remote.collection = collection;
    }
    if let Some(token) = normalize_text_option(init.auth_token) {
        config.remote.auth_token = Some(token);
    }
    if let Some(path) = init.local_db_path {
        config.local_db_path = Some(path);
    }
    if let Some(concurrency) = init.concurrency {
        config.concurrency = concurrency;
    }

    config.validate_local()?;
    if config.remote.project_id.is_some() {
        config.remote.validate()?;
    }
    Ok(())
}

pub fn run_config_show(config_path: &Path, db_path: &Path, as_json: bool) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if config.local_db_path.is_none() {
        config.local_db_path = Some(db_path.to_path_buf());
    }
    redact(&mut config);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let remote = &config.remote;
    println!("config file:   {}", config_path.display());
    println!("local db:      {}", db_path.display());
    println!("remote url:    {}", remote.base_url);
    println!(
        "project:       {}",
        remote.project_id.as_deref().unwrap_or("(not set)")
    );
    println!("database:      {}", remote.database);
    println!("collection:    {}", remote.collection);
    println!(
        "auth token:    {}",
        remote.auth_token.as_deref().unwrap_or("(none)")
    );
    println!("concurrency:   {}", config.concurrency);
    Ok(())
}

pub fn redact(config: &mut ShelfConfig) {
    if config.remote.auth_token.is_some() {
        config.remote.auth_token = Some("[REDACTED]".to_string());
    }
}
