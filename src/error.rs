//! Error types for genrepo
//!
//! Infrastructure code uses `GenrepoResult<T>`. Request resolution reports
//! its outcome through `ResolveError`, which carries the status code handed
//! back to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for genrepo operations
pub type GenrepoResult<T> = Result<T, GenrepoError>;

/// Errors from configuration, persistence and process plumbing
#[derive(Error, Debug)]
pub enum GenrepoError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Result store errors
    #[error("Result store {path} is unreadable: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Result store {path} has schema version {found}, newest supported is {supported}")]
    StoreVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GenrepoError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Run: genrepo config show"),
            Self::StoreCorrupt { .. } => Some("Move the result store aside; it is rebuilt on demand"),
            Self::StoreVersion { .. } => Some("Upgrade genrepo to read this result store"),
            _ => None,
        }
    }
}

/// Why a single resolution request failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Missing or invalid parameter, disallowed arch alias, unknown distro
    #[error("{0}")]
    BadRequest(String),

    /// A ref or commit prefix matched more than one distinct object
    #[error("{0}")]
    AmbiguousRef(String),

    /// Everything resolved but no build holds the platform subpath
    #[error("no repo found for ref {reference} on platform {platform}")]
    NotFound { reference: String, platform: String },

    /// An external command (git, repo tools) exited unsuccessfully
    #[error("{tool} failed")]
    ExternalTool { tool: String, detail: String },
}

impl ResolveError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn external(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Status code reported to the caller
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::AmbiguousRef(_) => 412,
            Self::NotFound { .. } => 404,
            Self::ExternalTool { .. } => 500,
        }
    }

    /// Whether a cached answer may stand in for this failure
    pub fn allows_stale_fallback(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::ExternalTool { .. })
    }

    /// Message body for the caller, prefixed the way every error response is
    pub fn message(&self) -> String {
        format!("Error: {}", self)
    }
}
