//! Where hearth keeps its files on disk.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::types::Config;
use crate::constants::{APP_NAME, CONFIG_FILENAME, HISTORY_FILENAME};

fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| anyhow!("Could not determine {} directory", kind))
}

impl Config {
    /// `~/.config/hearth/` on Linux.
    pub fn config_dir() -> Result<PathBuf> {
        app_dir(dirs::config_dir(), "config")
    }

    /// `~/.local/share/hearth/` on Linux.
    pub fn data_dir() -> Result<PathBuf> {
        app_dir(dirs::data_dir(), "data")
    }

    pub fn cache_dir() -> Result<PathBuf> {
        app_dir(dirs::cache_dir(), "cache")
    }

    /// The global `config.toml`.
    ///
    /// # Errors
    ///
    /// Fails when the platform has no config directory.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Session transcripts and `index.json`.
    pub fn sessions_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("sessions"))
    }

    /// Readline history for `hearth chat`.
    pub fn history_path() -> Result<PathBuf> {
        Ok(Self::cache_dir()?.join(HISTORY_FILENAME))
    }
}
