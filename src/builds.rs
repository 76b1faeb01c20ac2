//! Build directory discovery
//!
//! Finds the build output directories for a commit id or prefix below a
//! build root that holds one directory per project. Two naming layouts are
//! supported (see [`BuildLayout`]).

use crate::config::BuildLayout;
use crate::error::ResolveError;
use crate::refs::COMMIT_ID_LEN;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// One build output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirectory {
    /// Project directory the build lives under
    pub project: String,
    /// Commit portion of the directory name
    pub commit: String,
    /// Build sequence (empty when the name carries none)
    pub sequence: String,
    /// `/`-separated path relative to the build root
    pub relative_path: String,
}

impl BuildDirectory {
    /// Absolute path below `root`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }
}

/// Split `{commit}-{sequence}` on the last dash
fn split_build_name(name: &str) -> (&str, &str) {
    name.rsplit_once('-').unwrap_or((name, ""))
}

/// The part of a commit name that identifies the commit
fn commit_portion(commit: &str) -> String {
    commit
        .get(..COMMIT_ID_LEN)
        .unwrap_or(commit)
        .to_ascii_lowercase()
}

/// Numbers in numeric order above anything non-numeric, the raw text
/// breaking ties (`010` vs `10`)
fn compare_sequence(a: &str, b: &str) -> Ordering {
    let key = |s: &str| (s.parse::<u64>().ok(), s.to_string());
    key(a).cmp(&key(b))
}

/// Most recent build first, project name breaking ties
fn newest_first(a: &BuildDirectory, b: &BuildDirectory) -> Ordering {
    compare_sequence(&b.sequence, &a.sequence).then_with(|| b.project.cmp(&a.project))
}

/// Names of subdirectories of `dir`; a missing or unreadable directory is empty
async fn subdirectories(dir: &Path) -> Vec<String> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return vec![],
        Err(e) => {
            warn!("Skipping unreadable directory {}: {}", dir.display(), e);
            return vec![];
        }
    };

    let mut names = vec![];
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let is_dir = fs::metadata(entry.path())
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if is_dir {
                    if let Some(name) = entry.file_name().to_str() {
                        names.push(name.to_string());
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error listing {}: {}", dir.display(), e);
                break;
            }
        }
    }
    names
}

/// Locates build directories by commit prefix
#[derive(Debug, Clone)]
pub struct BuildLocator {
    root: PathBuf,
    layout: BuildLayout,
}

impl BuildLocator {
    pub fn new(root: impl Into<PathBuf>, layout: BuildLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Build root being scanned
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every build whose commit starts with `prefix`.
    ///
    /// Fails with `AmbiguousRef` when the matches span more than one commit.
    /// Otherwise the builds come back newest first so callers can stop at
    /// the first one holding the output they need.
    pub async fn locate(&self, prefix: &str) -> Result<Vec<BuildDirectory>, ResolveError> {
        if prefix.is_empty() {
            return Ok(vec![]);
        }

        let mut builds = match self.layout {
            BuildLayout::Suffixed => self.scan_suffixed(prefix).await,
            BuildLayout::Nested => self.scan_nested(prefix).await,
        };

        let commits: BTreeSet<String> = builds.iter().map(|b| commit_portion(&b.commit)).collect();
        if commits.len() > 1 {
            debug!("Prefix {} matches commits {:?}", prefix, commits);
            return Err(ResolveError::AmbiguousRef(format!(
                "Ref \"{}\" matches multiple commits",
                prefix
            )));
        }

        builds.sort_by(newest_first);
        debug!(
            "Found {} build(s) for {} under {}",
            builds.len(),
            prefix,
            self.root.display()
        );
        Ok(builds)
    }

    /// `{project}/commit/{commit}-{sequence}`
    async fn scan_suffixed(&self, prefix: &str) -> Vec<BuildDirectory> {
        let mut builds = vec![];
        for project in subdirectories(&self.root).await {
            let commit_dir = self.root.join(&project).join("commit");
            for name in subdirectories(&commit_dir).await {
                if !name.starts_with(prefix) {
                    continue;
                }
                let (commit, sequence) = split_build_name(&name);
                builds.push(BuildDirectory {
                    relative_path: format!("{}/commit/{}", project, name),
                    project: project.clone(),
                    commit: commit.to_string(),
                    sequence: sequence.to_string(),
                });
            }
        }
        builds
    }

    /// `{project}/{commit}/commit/{sequence}`
    async fn scan_nested(&self, prefix: &str) -> Vec<BuildDirectory> {
        let mut builds = vec![];
        for project in subdirectories(&self.root).await {
            let project_dir = self.root.join(&project);
            for commit in subdirectories(&project_dir).await {
                if !commit.starts_with(prefix) {
                    continue;
                }
                let sequences_dir = project_dir.join(&commit).join("commit");
                for sequence in subdirectories(&sequences_dir).await {
                    builds.push(BuildDirectory {
                        relative_path: format!("{}/{}/commit/{}", project, commit, sequence),
                        project: project.clone(),
                        commit: commit.clone(),
                        sequence,
                    });
                }
            }
        }
        builds
    }
}
