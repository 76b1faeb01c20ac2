//! External repository tools
//!
//! The apt repository generator and package includer are opaque commands
//! configured as argv templates. Placeholders: `{distro}`, `{release}`,
//! `{label}`, `{repo_root}`, `{artifact}`.

use crate::config::schema::DebConfig;
use crate::error::ResolveError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Repository assembly operations
#[async_trait]
pub trait RepoTools: Send + Sync {
    /// Create an empty repository for `distro`/`release` in `repo_root`
    async fn generate_repository(
        &self,
        repo_root: &Path,
        distro: &str,
        release: &str,
        label: &str,
    ) -> Result<(), ResolveError>;

    /// Add one package file to the repository
    async fn include_package(
        &self,
        repo_root: &Path,
        label: &str,
        artifact: &Path,
    ) -> Result<(), ResolveError>;
}

/// Runs the configured commands
#[derive(Debug, Clone)]
pub struct CommandRepoTools {
    generate: Vec<String>,
    include: Vec<String>,
}

impl CommandRepoTools {
    pub fn new(generate: Vec<String>, include: Vec<String>) -> Self {
        Self { generate, include }
    }

    pub fn from_config(config: &DebConfig) -> Self {
        Self::new(
            config.generate_command.clone(),
            config.include_command.clone(),
        )
    }

    /// Execute an expanded argv; any non-zero exit is a failure
    async fn exec(&self, argv: Vec<String>, cwd: &Path) -> Result<(), ResolveError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ResolveError::external("repository tool", "command not configured"))?;
        debug!("Executing: {} {:?} in {}", program, args, cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                warn!("Failed to start {}: {}", program, e);
                ResolveError::external(program.clone(), e.to_string())
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "{} exited with {:?}: {}",
                program,
                output.status.code(),
                stderr.trim()
            );
            Err(ResolveError::external(program.clone(), stderr.trim().to_string()))
        }
    }
}

/// Substitute `{name}` placeholders in every argument
fn expand(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        })
        .collect()
}

#[async_trait]
impl RepoTools for CommandRepoTools {
    async fn generate_repository(
        &self,
        repo_root: &Path,
        distro: &str,
        release: &str,
        label: &str,
    ) -> Result<(), ResolveError> {
        let root = repo_root.to_string_lossy();
        let argv = expand(
            &self.generate,
            &[
                ("distro", distro),
                ("release", release),
                ("label", label),
                ("repo_root", &root),
            ],
        );
        self.exec(argv, repo_root).await
    }

    async fn include_package(
        &self,
        repo_root: &Path,
        label: &str,
        artifact: &Path,
    ) -> Result<(), ResolveError> {
        let root = repo_root.to_string_lossy();
        let artifact = artifact.to_string_lossy();
        let argv = expand(
            &self.include,
            &[("repo_root", &root), ("label", label), ("artifact", &artifact)],
        );
        self.exec(argv, repo_root).await
    }
}
