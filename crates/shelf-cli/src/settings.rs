//! Locating the config file and the local database.

use std::path::{Path, PathBuf};

use shelf_core::ShelfConfig;

use crate::error::CliError;

const APP_DIR_NAME: &str = "shelf";
const CONFIG_FILE_NAME: &str = "config.json";
const DB_FILE_NAME: &str = "shelf.db";

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Result<PathBuf, CliError> {
    cli_config.map_or_else(default_config_path, Ok)
}

/// Load the config file and apply `SHELF_*` environment overrides
pub fn load_config(path: &Path) -> Result<ShelfConfig, CliError> {
    let mut config = ShelfConfig::load_from_path(path)?;
    config.apply_env()?;
    Ok(config)
}

/// `--db-path` wins, then the config (including `SHELF_DB_PATH`), then the data dir
pub fn resolve_db_path(
    cli_db_path: Option<PathBuf>,
    config: &ShelfConfig,
) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| config.local_db_path.clone()) {
        return Ok(path);
    }
    default_db_path()
}
