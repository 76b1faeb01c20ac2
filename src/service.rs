//! Request handling
//!
//! [`Genrepo`] validates a request, resolves the ref, dispatches on the
//! distro family and applies the result cache policy:
//!
//! - refs that are full commit hashes never read or write the cache
//! - any successful answer is recorded
//! - a failed lookup is answered from the cache only when the caller set
//!   `allow_stale` and the failure is `NotFound` or `ExternalTool`

use crate::audit::AuditLog;
use crate::cache::{CacheKey, ResultCache};
use crate::config::schema::Config;
use crate::error::ResolveError;
use crate::platform::{check_arch_alias, DistroFamily, PlatformTriple};
use crate::refs::{is_full_hash, GitLsRemote, RefResolver};
use crate::repo::{DebRepoBuilder, RepoPathResolver};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// One lookup request.
///
/// The ref may arrive as `ref`, `commit` or `branch`, checked in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveRequest {
    pub distro: String,
    pub releasever: String,
    pub arch: String,
    pub url: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(alias = "allow-old", alias = "allow_old")]
    pub allow_stale: bool,
}

impl ResolveRequest {
    pub fn new(
        distro: impl Into<String>,
        releasever: impl Into<String>,
        arch: impl Into<String>,
        url: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            distro: distro.into(),
            releasever: releasever.into(),
            arch: arch.into(),
            url: url.into(),
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    pub fn allow_stale(mut self, allow: bool) -> Self {
        self.allow_stale = allow;
        self
    }

    /// First non-empty of `ref`, `commit`, `branch`
    pub fn requested_ref(&self) -> Option<&str> {
        [&self.reference, &self.commit, &self.branch]
            .into_iter()
            .filter_map(|r| r.as_deref())
            .find(|r| !r.trim().is_empty())
    }
}

/// Outcome handed back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Repository URL on success, `Error: ...` otherwise
    pub message: String,
    /// HTTP-style status code
    pub status: u16,
}

impl Response {
    pub fn success(url: impl Into<String>, status: u16) -> Self {
        Self {
            message: url.into(),
            status,
        }
    }

    pub fn failure(error: &ResolveError) -> Self {
        Self {
            message: error.message(),
            status: error.status(),
        }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The repository lookup service
pub struct Genrepo {
    refs: RefResolver,
    rpm: RepoPathResolver,
    deb: DebRepoBuilder,
    cache: Arc<ResultCache>,
    audit: AuditLog,
}

impl Genrepo {
    pub fn new(
        refs: RefResolver,
        rpm: RepoPathResolver,
        deb: DebRepoBuilder,
        cache: Arc<ResultCache>,
        audit: AuditLog,
    ) -> Self {
        Self {
            refs,
            rpm,
            deb,
            cache,
            audit,
        }
    }

    /// Wire up the production collaborators from configuration
    pub fn from_config(config: &Config, cache: Arc<ResultCache>) -> Self {
        Self::new(
            RefResolver::new(Arc::new(GitLsRemote::new(&config.git.program))),
            RepoPathResolver::from_config(&config.rpm),
            DebRepoBuilder::from_config(&config.deb),
            cache,
            AuditLog::new(config),
        )
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Answer one request; every failure becomes an error response
    pub async fn resolve(&self, request: &ResolveRequest) -> Response {
        match self.try_resolve(request).await {
            Ok(response) => response,
            Err(e) => {
                if let ResolveError::ExternalTool { tool, detail } = &e {
                    warn!("{} failed: {}", tool, detail);
                }
                Response::failure(&e)
            }
        }
    }

    async fn try_resolve(&self, request: &ResolveRequest) -> Result<Response, ResolveError> {
        let (family, reference) = validate(request)?;
        let platform =
            PlatformTriple::normalize(&request.distro, &request.releasever, &request.arch)?;

        let key = if is_full_hash(reference) {
            None
        } else {
            Some(CacheKey::new(&platform, &request.url, reference))
        };

        match self.lookup(family, &platform, &request.url, reference).await {
            Ok((url, status)) => {
                info!("{} {} on {} -> {}", request.url, reference, platform, url);
                if let Some(key) = key {
                    if let Err(e) = self.cache.put(key, url.as_str()).await {
                        warn!("Failed to record result: {}", e);
                    }
                }
                Ok(Response::success(url, status))
            }
            Err(err) => {
                if request.allow_stale && err.allows_stale_fallback() {
                    if let Some(key) = key {
                        if let Some(url) = self.stale_result(&key, &err).await {
                            return Ok(Response::success(url, 200));
                        }
                    }
                }
                Err(err)
            }
        }
    }

    async fn lookup(
        &self,
        family: DistroFamily,
        platform: &PlatformTriple,
        url: &str,
        reference: &str,
    ) -> Result<(String, u16), ResolveError> {
        let commit = self.refs.resolve(url, reference).await?;
        match family {
            DistroFamily::Rpm => self
                .rpm
                .resolve(platform, &commit, reference)
                .await
                .map(|url| (url, 200)),
            DistroFamily::Deb => {
                let outcome = self.deb.resolve(platform, &commit, reference).await?;
                let status = outcome.status();
                Ok((outcome.into_url(), status))
            }
        }
    }

    async fn stale_result(&self, key: &CacheKey, cause: &ResolveError) -> Option<String> {
        let entry = self.cache.get(key).await?;

        warn!(
            "Serving stale result for {} (cached {}): {}",
            key, entry.created_at, cause
        );
        self.audit
            .log(
                "resolve.stale_served",
                &serde_json::json!({
                    "key": key,
                    "result": entry.result,
                    "created_at": entry.created_at,
                    "status": cause.status(),
                }),
            )
            .await;
        Some(entry.result)
    }
}

/// Check request parameters in the order callers see errors
fn validate(request: &ResolveRequest) -> Result<(DistroFamily, &str), ResolveError> {
    check_arch_alias(&request.arch)?;

    for (name, value) in [
        ("distro", &request.distro),
        ("releasever", &request.releasever),
        ("arch", &request.arch),
        ("url", &request.url),
    ] {
        if value.trim().is_empty() {
            return Err(ResolveError::bad_request(format!(
                "missing or empty required parameter \"{}\"",
                name
            )));
        }
    }

    let family = DistroFamily::of(&request.distro).ok_or_else(|| {
        ResolveError::bad_request(format!("unknown distro \"{}\"", request.distro))
    })?;

    let reference = request
        .requested_ref()
        .ok_or_else(|| ResolveError::bad_request("missing or empty parameter \"ref\""))?;

    if request.url.starts_with('-') {
        return Err(ResolveError::bad_request(format!(
            "bad url \"{}\"",
            request.url
        )));
    }

    Ok((family, reference))
}
