//! Cache keys and remote URL normalization

use crate::platform::PlatformTriple;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one logical "repo for this platform and ref" request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub distro: String,
    pub releasever: String,
    pub arch: String,
    pub url: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl CacheKey {
    /// Build a key from a normalized platform; the URL is normalized here
    pub fn new(platform: &PlatformTriple, url: &str, reference: &str) -> Self {
        Self {
            distro: platform.distro.clone(),
            releasever: platform.releasever.clone(),
            arch: platform.arch.clone(),
            url: normalize_url(url),
            reference: reference.to_string(),
        }
    }

    /// Same key with its URL normalized (used when upgrading old stores)
    pub fn normalized(self) -> Self {
        Self {
            url: normalize_url(&self.url),
            ..self
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} {}@{}",
            self.distro, self.releasever, self.arch, self.url, self.reference
        )
    }
}

/// Split scp-style `[user@]host:path` into authority and path.
///
/// Only applies when the colon comes before any slash, as git does.
fn scp_parts(url: &str) -> Option<(&str, &str)> {
    let (authority, path) = url.split_once(':')?;
    if authority.is_empty() || authority.contains('/') || path.is_empty() {
        return None;
    }
    Some((authority, path))
}

/// Drop every trailing `/` and `.git`.
fn strip_suffixes(url: &str) -> &str {
    let mut rest = url;
    loop {
        let trimmed = rest.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        if trimmed.len() == rest.len() {
            return rest;
        }
        rest = trimmed;
    }
}

/// Canonical form of a remote URL.
///
/// Trailing `.git` and `/` are dropped and scp-style `user@host:path` becomes
/// `git+ssh://user@host/path`. Applying it twice changes nothing.
pub fn normalize_url(url: &str) -> String {
    // Suffixes go first so the scheme check sees what the next pass would see
    let url = strip_suffixes(url.trim());
    if url.contains("://") {
        return url.to_string();
    }
    match scp_parts(url) {
        Some((authority, path)) => {
            format!("git+ssh://{}/{}", authority, path.trim_start_matches('/'))
        }
        None => url.to_string(),
    }
}
