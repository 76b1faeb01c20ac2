//! Apt repository assembly
//!
//! Build outputs for debian-family platforms are loose `.deb` files. The
//! first request for a build assembles an apt repository from them under the
//! repo root; later requests reuse it as long as its package pool still
//! holds every package.

use crate::builds::{BuildDirectory, BuildLocator};
use crate::config::schema::DebConfig;
use crate::error::ResolveError;
use crate::platform::PlatformTriple;
use crate::repo::tools::{CommandRepoTools, RepoTools};
use crate::repo::join_url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of a successful deb lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebOutcome {
    /// An existing complete repository was found
    Reused(String),
    /// The repository was assembled by this request
    Assembled(String),
}

impl DebOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Reused(url) | Self::Assembled(url) => url,
        }
    }

    /// 200 for a reused repository, 201 for a newly assembled one
    pub fn status(&self) -> u16 {
        match self {
            Self::Reused(_) => 200,
            Self::Assembled(_) => 201,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            Self::Reused(url) | Self::Assembled(url) => url,
        }
    }
}

/// Builds and locates apt repositories for deb builds
pub struct DebRepoBuilder {
    locator: BuildLocator,
    repo_root: PathBuf,
    http_base: String,
    tools: Arc<dyn RepoTools>,
    // Held across check and assembly so two requests never build the
    // same repository at once
    assembly: Mutex<()>,
}

impl DebRepoBuilder {
    pub fn new(
        locator: BuildLocator,
        repo_root: impl Into<PathBuf>,
        http_base: impl Into<String>,
        tools: Arc<dyn RepoTools>,
    ) -> Self {
        Self {
            locator,
            repo_root: repo_root.into(),
            http_base: http_base.into(),
            tools,
            assembly: Mutex::new(()),
        }
    }

    pub fn from_config(config: &DebConfig) -> Self {
        Self::new(
            BuildLocator::new(&config.build_root, config.layout),
            &config.repo_root,
            &config.http_base,
            Arc::new(CommandRepoTools::from_config(config)),
        )
    }

    /// Repository URL for the newest build of `commit` with packages for
    /// `platform`, assembling the repository if needed.
    pub async fn resolve(
        &self,
        platform: &PlatformTriple,
        commit: &str,
        requested_ref: &str,
    ) -> Result<DebOutcome, ResolveError> {
        let subpath = platform.subpath();

        for build in self.locator.locate(commit).await? {
            let artifacts =
                find_packages(build.path_in(self.locator.root()).join(&subpath)).await?;
            if artifacts.is_empty() {
                debug!("Build {} has no {} packages", build.relative_path, subpath);
                continue;
            }
            return self.provide(&build, platform, &artifacts).await;
        }

        Err(ResolveError::NotFound {
            reference: requested_ref.to_string(),
            platform: subpath,
        })
    }

    async fn provide(
        &self,
        build: &BuildDirectory,
        platform: &PlatformTriple,
        artifacts: &[PathBuf],
    ) -> Result<DebOutcome, ResolveError> {
        let relative = format!("{}/{}", build.relative_path, platform.subpath());
        let repo_dir = self.repo_root.join(&relative);
        let url = join_url(&self.http_base, &relative);

        let _guard = self.assembly.lock().await;

        let pooled = count_pool_packages(repo_dir.clone()).await?;
        if pooled == artifacts.len() {
            debug!("Reusing repository {}", repo_dir.display());
            return Ok(DebOutcome::Reused(url));
        }

        if fs::try_exists(&repo_dir).await.unwrap_or(false) {
            warn!(
                "Repository {} holds {} of {} packages, rebuilding",
                repo_dir.display(),
                pooled,
                artifacts.len()
            );
            fs::remove_dir_all(&repo_dir)
                .await
                .map_err(|e| ResolveError::external("repository cleanup", e.to_string()))?;
        }

        self.assemble(&repo_dir, platform, artifacts).await?;
        info!(
            "Assembled repository {} with {} package(s)",
            repo_dir.display(),
            artifacts.len()
        );
        Ok(DebOutcome::Assembled(url))
    }

    async fn assemble(
        &self,
        repo_dir: &Path,
        platform: &PlatformTriple,
        artifacts: &[PathBuf],
    ) -> Result<(), ResolveError> {
        fs::create_dir_all(repo_dir)
            .await
            .map_err(|e| ResolveError::external("repository setup", e.to_string()))?;

        let label = platform.releasever.as_str();
        self.tools
            .generate_repository(repo_dir, &platform.distro, &platform.releasever, label)
            .await?;
        for artifact in artifacts {
            self.tools.include_package(repo_dir, label, artifact).await?;
        }

        let pooled = count_pool_packages(repo_dir.to_path_buf()).await?;
        if pooled != artifacts.len() {
            return Err(ResolveError::external(
                "package pool check",
                format!("pool holds {} packages, expected {}", pooled, artifacts.len()),
            ));
        }
        Ok(())
    }
}

fn is_package(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "deb")
}

/// Every `.deb` below `dir`, sorted by path
fn scan_packages(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_package(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    found.sort();
    found
}

/// Number of `.deb` files in the repository's package pool
fn scan_pool(repo_dir: &Path) -> usize {
    WalkDir::new(repo_dir.join("pool"))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_package(entry.path()))
        .count()
}

async fn find_packages(dir: PathBuf) -> Result<Vec<PathBuf>, ResolveError> {
    tokio::task::spawn_blocking(move || scan_packages(&dir))
        .await
        .map_err(|e| ResolveError::external("package scan", e.to_string()))
}

async fn count_pool_packages(repo_dir: PathBuf) -> Result<usize, ResolveError> {
    tokio::task::spawn_blocking(move || scan_pool(&repo_dir))
        .await
        .map_err(|e| ResolveError::external("package pool scan", e.to_string()))
}
