//! Remote ref resolution
//!
//! Maps a branch, tag or commit prefix to a commit id using the remote's ref
//! advertisement. Nothing here touches shared state; retries are the
//! caller's business.

use crate::error::ResolveError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Length of a full hexadecimal commit id
pub const COMMIT_ID_LEN: usize = 40;

/// One line of a remote ref advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub object_id: String,
    pub name: String,
}

impl RemoteRef {
    pub fn new(object_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            name: name.into(),
        }
    }
}

/// Source of a remote's ref advertisement
#[async_trait]
pub trait RefLister: Send + Sync {
    /// List every ref the remote advertises
    async fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>, ResolveError>;
}

/// Lists refs by running `git ls-remote`
pub struct GitLsRemote {
    program: String,
}

impl GitLsRemote {
    /// Create a lister that runs the given git executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitLsRemote {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl RefLister for GitLsRemote {
    async fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>, ResolveError> {
        debug!("Executing: {} ls-remote {}", self.program, url);

        let output = Command::new(&self.program)
            .args(["ls-remote", "--", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ResolveError::external("git ls-remote", e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::external(
                "git ls-remote",
                format!("exit {:?}: {}", output.status.code(), stderr.trim()),
            ));
        }

        Ok(parse_ls_remote(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `<object id> <ref name>` lines, skipping anything malformed
pub fn parse_ls_remote(output: &str) -> Vec<RemoteRef> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let object_id = parts.next()?;
            let name = parts.next()?;
            Some(RemoteRef::new(object_id, name))
        })
        .collect()
}

/// Whether `reference` is already a full 40-character hex commit id
pub fn is_full_hash(reference: &str) -> bool {
    reference.len() == COMMIT_ID_LEN && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// Object ids the advertisement associates with `reference`.
///
/// A branch matches `refs/heads/{ref}`. A tag matches through its peeled
/// `refs/tags/{ref}^{}` line; lightweight tags have no peeled line and match
/// `refs/tags/{ref}` directly.
pub fn matching_objects(refs: &[RemoteRef], reference: &str) -> BTreeSet<String> {
    let head = format!("refs/heads/{}", reference);
    let tag = format!("refs/tags/{}", reference);
    let peeled = format!("{}^{{}}", tag);
    let has_peeled = refs.iter().any(|r| r.name == peeled);

    refs.iter()
        .filter(|r| r.name == head || r.name == peeled || (!has_peeled && r.name == tag))
        .map(|r| r.object_id.clone())
        .collect()
}

/// Resolves refs against a remote
#[derive(Clone)]
pub struct RefResolver {
    lister: Arc<dyn RefLister>,
}

impl RefResolver {
    pub fn new(lister: Arc<dyn RefLister>) -> Self {
        Self { lister }
    }

    /// Resolve `reference` on the remote at `url` to a commit id.
    ///
    /// Zero matches pass the ref through unchanged so callers can treat it
    /// as a commit prefix. A full hash is returned without querying.
    pub async fn resolve(&self, url: &str, reference: &str) -> Result<String, ResolveError> {
        if is_full_hash(reference) {
            return Ok(reference.to_ascii_lowercase());
        }

        let refs = self.lister.list_refs(url).await?;
        let matches = matching_objects(&refs, reference);

        match matches.len() {
            0 => {
                debug!("Ref {} not advertised by {}, using it as a commit prefix", reference, url);
                Ok(reference.to_string())
            }
            1 => {
                let commit = matches.into_iter().next().unwrap_or_default();
                debug!("Resolved {} on {} to {}", reference, url, commit);
                Ok(commit)
            }
            _ => Err(ResolveError::AmbiguousRef(format!(
                "Ref \"{}\" matches multiple objects",
                reference
            ))),
        }
    }
}
