//! Where genrepo keeps its files and how it reads `config.toml`
//!
//! The config file lives under the user config dir unless `--config` or
//! `GENREPO_CONFIG` names another one. Mutable state (the result store and
//! the audit log) lives under the state dir.

pub mod schema;

pub use schema::{BuildLayout, Config};

use crate::error::{GenrepoError, GenrepoResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Reads and writes one `config.toml`
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// `~/.config/genrepo/config.toml` on Linux
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("genrepo")
            .join("config.toml")
    }

    /// `$XDG_STATE_HOME/genrepo`, or the local data dir where there is no
    /// state dir
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("genrepo")
    }

    /// Result store used when `[cache] path` is unset
    pub fn result_store_path() -> PathBuf {
        Self::state_dir().join("results.json")
    }

    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Parse the config file. Without one every section takes the built-in
    /// roots, http bases and repo tool commands.
    pub async fn load(&self) -> GenrepoResult<Config> {
        let path = &self.config_path;
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config at {}, using built-in settings", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GenrepoError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| GenrepoError::ConfigInvalid {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    /// Write `config`, creating the parent directory on first use
    pub async fn save(&self, config: &Config) -> GenrepoResult<()> {
        let path = &self.config_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GenrepoError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(path, content)
            .await
            .map_err(|e| GenrepoError::io(format!("writing config to {}", path.display()), e))?;

        info!("Wrote {}", path.display());
        Ok(())
    }

    pub async fn ensure_state_dirs() -> GenrepoResult<()> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| GenrepoError::io(format!("creating directory {}", dir.display()), e))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
