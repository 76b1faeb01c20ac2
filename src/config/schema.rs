//! Configuration schema for genrepo
//!
//! Configuration is stored at `~/.config/genrepo/config.toml`. Every section
//! is optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote ref listing
    pub git: GitConfig,

    /// Yum build output
    pub rpm: RpmConfig,

    /// Apt build output and repository assembly
    pub deb: DebConfig,

    /// Result cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Remote ref listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// git executable used for `ls-remote`
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

/// How build output directories are named beneath a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLayout {
    /// `{project}/commit/{commit}-{sequence}`
    #[default]
    Suffixed,
    /// `{project}/{commit}/commit/{sequence}`
    Nested,
}

/// Yum build output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpmConfig {
    /// Filesystem root holding one directory per project
    pub build_root: PathBuf,

    /// HTTP URL serving `build_root`
    pub http_base: String,

    /// Directory naming below each project
    pub layout: BuildLayout,
}

impl Default for RpmConfig {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("/srv/release/repository/release/yum/builds"),
            http_base: "http://192.168.51.243/yum/builds/".to_string(),
            layout: BuildLayout::Suffixed,
        }
    }
}

/// Apt build output and repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebConfig {
    /// Filesystem root holding one directory per project
    pub build_root: PathBuf,

    /// Where assembled apt repositories are written
    pub repo_root: PathBuf,

    /// HTTP URL serving `repo_root`
    pub http_base: String,

    /// Directory naming below each project
    pub layout: BuildLayout,

    /// argv for the repository generator; run inside the repository root
    pub generate_command: Vec<String>,

    /// argv that adds one package to a repository
    pub include_command: Vec<String>,
}

impl Default for DebConfig {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("/srv/release/repository/release/apt/builds"),
            repo_root: PathBuf::from("/srv/release/repository/release/apt/repos"),
            http_base: "http://192.168.51.243/apt/repos/".to_string(),
            layout: BuildLayout::Suffixed,
            generate_command: vec![
                "reprepro".to_string(),
                "-b".to_string(),
                "{repo_root}".to_string(),
                "export".to_string(),
                "{label}".to_string(),
            ],
            include_command: vec![
                "reprepro".to_string(),
                "-b".to_string(),
                "{repo_root}".to_string(),
                "includedeb".to_string(),
                "{label}".to_string(),
                "{artifact}".to_string(),
            ],
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store file (defaults to the state directory)
    pub path: Option<PathBuf>,

    /// Drop entries unused for this many days
    pub retention_days: u32,

    /// Seconds between background sweeps
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: 7,
            sweep_interval_secs: 300,
        }
    }
}

impl CacheConfig {
    /// Retention window as a chrono duration
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    /// Sweep interval as a std duration
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
