// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use tracing::info;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Default config file name inside the storage directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Load configuration for a run.
///
/// An explicit `path` must exist and parse. Without one, `config.toml` in
/// `storage_dir` is used when present and defaults otherwise. Callers apply
/// their overrides and then run [`Config::validate`].
pub fn load_config(path: Option<&Path>, storage_dir: &Path) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load(path)
                .map_err(|e| AppError::config(format!("cannot load {}: {e}", path.display())))?
        }
        None => {
            let default_path = storage_dir.join(CONFIG_FILE);
            if default_path.exists() {
                info!("Loading configuration from {}", default_path.display());
            }
            Config::load_or_default(&default_path)
        }
    };

    Ok(config)
}
