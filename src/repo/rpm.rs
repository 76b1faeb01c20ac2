//! Yum repository lookup

use crate::builds::BuildLocator;
use crate::config::schema::RpmConfig;
use crate::error::ResolveError;
use crate::platform::PlatformTriple;
use crate::repo::join_url;
use tokio::fs;
use tracing::debug;

/// Finds the yum repository URL for a commit and platform
#[derive(Debug, Clone)]
pub struct RepoPathResolver {
    locator: BuildLocator,
    http_base: String,
}

impl RepoPathResolver {
    pub fn new(locator: BuildLocator, http_base: impl Into<String>) -> Self {
        Self {
            locator,
            http_base: http_base.into(),
        }
    }

    pub fn from_config(config: &RpmConfig) -> Self {
        Self::new(
            BuildLocator::new(&config.build_root, config.layout),
            &config.http_base,
        )
    }

    /// URL of the newest build of `commit` that has output for `platform`.
    ///
    /// Existence is probed live on every call; build trees fill in after the
    /// build directory first appears. `requested_ref` is only used in the
    /// `NotFound` diagnostic.
    pub async fn resolve(
        &self,
        platform: &PlatformTriple,
        commit: &str,
        requested_ref: &str,
    ) -> Result<String, ResolveError> {
        let subpath = platform.subpath();

        for build in self.locator.locate(commit).await? {
            let candidate = build.path_in(self.locator.root()).join(&subpath);
            if fs::try_exists(&candidate).await.unwrap_or(false) {
                let url = join_url(
                    &self.http_base,
                    &format!("{}/{}", build.relative_path, subpath),
                );
                debug!("Build {} has {} output", build.relative_path, subpath);
                return Ok(url);
            }
            debug!("Build {} has no {} output", build.relative_path, subpath);
        }

        Err(ResolveError::NotFound {
            reference: requested_ref.to_string(),
            platform: subpath,
        })
    }
}
