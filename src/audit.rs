//! Audit trail for the result store
//!
//! One JSON object per line in `{state dir}/audit.log`:
//! `{"timestamp", "event", "data"}`. Events are `cache.cleared`,
//! `cache.swept` and `resolve.stale_served`.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Honors `general.audit_log` and writes under the state dir
    pub fn new(config: &Config) -> Self {
        Self::at(config.general.audit_log, ConfigManager::audit_log_path())
    }

    pub fn at(enabled: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            path: path.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::at(false, PathBuf::new())
    }

    /// Append `event`. A write failure is a warning; a lookup or store
    /// command never fails because its audit line was lost.
    pub async fn log(&self, event: &str, data: &Value) {
        if !self.enabled {
            return;
        }

        let line = format!(
            "{}\n",
            json!({
                "timestamp": Utc::now().to_rfc3339(),
                "event": event,
                "data": data,
            })
        );
        if let Err(e) = self.append(line.as_bytes()).await {
            warn!("Lost audit event {} ({}): {}", event, self.path.display(), e);
        }
    }

    async fn append(&self, line: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_json_line() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(true, dir.path().join("audit.log"));

        audit
            .log(
                "resolve.stale_served",
                &serde_json::json!({"ref": "mybranch", "status": 404}),
            )
            .await;

        let content = tokio::fs::read_to_string(&audit.path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "resolve.stale_served");
        assert_eq!(parsed["data"]["ref"], "mybranch");
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn appends_multiple_lines() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(true, dir.path().join("nested/audit.log"));

        audit.log("cache.swept", &serde_json::json!({"removed": 1})).await;
        audit.log("cache.cleared", &serde_json::json!({"removed": 3})).await;

        let content = tokio::fs::read_to_string(&audit.path).await.unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::at(false, dir.path().join("audit.log"));

        audit.log("should.not.appear", &serde_json::json!({})).await;

        assert!(!audit.path.exists());
    }
}
