//! hearth configuration.
//!
//! A global `config.toml` under the XDG config directory is layered with an
//! optional `hearth.toml` found by walking up from the working directory.
//! Paths for sessions and readline history are resolved here too.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Global file (written with defaults when missing), then the project
    /// file on top, then `{env:VAR}` substitution.
    pub fn load() -> Result<Self> {
        let mut config = match Self::load_project()? {
            Some(project) => Self::merge(Self::load_global()?, project),
            None => Self::load_global()?,
        };
        config.resolve_substitutions();
        Ok(config)
    }
}
