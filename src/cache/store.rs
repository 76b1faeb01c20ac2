//! Persistent result store
//!
//! Keeps the last successful answer for each [`CacheKey`] in memory and in a
//! JSON document on disk. A single async mutex serializes every operation
//! that reads or writes the map, and the file is rewritten (write to a temp
//! file, then rename) before a mutating call returns.

use crate::cache::clock::Clock;
use crate::cache::key::CacheKey;
use crate::error::{GenrepoError, GenrepoResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Current on-disk schema version.
///
/// Version 1 stored URLs exactly as requested; version 2 stores them
/// normalized.
pub const STORE_VERSION: u32 = 2;

/// A cached answer with its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// URL (or other payload) that answered the request
    pub result: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: CacheKey,
    #[serde(flatten)]
    entry: CacheEntry,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default = "legacy_version")]
    version: u32,
    #[serde(default)]
    entries: Vec<StoredEntry>,
}

fn legacy_version() -> u32 {
    1
}

/// Rekey entries from an older schema, keeping the most recently used entry
/// when two keys collapse into one.
fn migrate(entries: Vec<StoredEntry>) -> HashMap<CacheKey, CacheEntry> {
    let mut map: HashMap<CacheKey, CacheEntry> = HashMap::with_capacity(entries.len());
    for stored in entries {
        let key = stored.key.normalized();
        match map.get(&key) {
            Some(existing) if existing.last_accessed_at >= stored.entry.last_accessed_at => {}
            _ => {
                map.insert(key, stored.entry);
            }
        }
    }
    map
}

/// Persistent, lock-guarded map of request keys to prior answers
pub struct ResultCache {
    path: PathBuf,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Open the store at `path`, upgrading an older schema in place.
    ///
    /// A missing file is an empty store. An unreadable file or one written
    /// by a newer version is an error: the caller should not serve requests
    /// without its cache.
    pub async fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> GenrepoResult<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).await.map_err(|e| {
                GenrepoError::io(format!("reading result store {}", path.display()), e)
            })?;
            let file: StoreFile =
                serde_json::from_str(&content).map_err(|e| GenrepoError::StoreCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            if file.version > STORE_VERSION {
                return Err(GenrepoError::StoreVersion {
                    path,
                    found: file.version,
                    supported: STORE_VERSION,
                });
            }

            if file.version < STORE_VERSION {
                let before = file.entries.len();
                let migrated = migrate(file.entries);
                persist(&path, &migrated).await?;
                info!(
                    "Upgraded result store {} from version {} to {} ({} -> {} entries)",
                    path.display(),
                    file.version,
                    STORE_VERSION,
                    before,
                    migrated.len()
                );
                migrated
            } else {
                file.entries
                    .into_iter()
                    .map(|stored| (stored.key, stored.entry))
                    .collect()
            }
        } else {
            debug!("Result store {} not found, starting empty", path.display());
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            clock,
        })
    }

    /// Store file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up `key`, extending its retention on a hit.
    ///
    /// `created_at` is left alone. A miss changes nothing. A failed flush is
    /// logged and the hit is still returned; the touch reaches disk with the
    /// next successful write.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        let entry = entries.get_mut(key)?;
        entry.last_accessed_at = now;
        let entry = entry.clone();

        if let Err(e) = persist(&self.path, &entries).await {
            warn!("Could not record access to {}: {}", key, e);
        }
        Some(entry)
    }

    /// Insert or overwrite the answer for `key`; durable once this returns.
    ///
    /// If the write fails the previous answer is restored in memory.
    pub async fn put(&self, key: CacheKey, result: impl Into<String>) -> GenrepoResult<CacheEntry> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let entry = CacheEntry {
            result: result.into(),
            created_at: now,
            last_accessed_at: now,
        };

        debug!("Caching {} -> {}", key, entry.result);
        let previous = entries.insert(key.clone(), entry.clone());
        if let Err(e) = persist(&self.path, &entries).await {
            match previous {
                Some(previous) => entries.insert(key, previous),
                None => entries.remove(&key),
            };
            return Err(e);
        }
        Ok(entry)
    }

    /// Drop every entry, returning how many there were
    pub async fn clear_all(&self) -> GenrepoResult<usize> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        persist(&self.path, &entries).await?;
        info!("Cleared {} cached result(s)", removed);
        Ok(removed)
    }

    /// Remove entries not used within `window`, returning how many went.
    ///
    /// An entry last used exactly `window` ago survives.
    pub async fn sweep(&self, window: Duration) -> GenrepoResult<usize> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();
        let before = entries.len();

        entries.retain(|_, entry| now - entry.last_accessed_at <= window);

        let removed = before - entries.len();
        if removed > 0 {
            persist(&self.path, &entries).await?;
        }
        Ok(removed)
    }

    /// Snapshot of every entry, most recently used first. Does not touch.
    pub async fn entries(&self) -> Vec<(CacheKey, CacheEntry)> {
        let entries = self.entries.lock().await;
        let mut list: Vec<_> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        list.sort_by(|a, b| {
            b.1.last_accessed_at
                .cmp(&a.1.last_accessed_at)
                .then_with(|| a.0.cmp(&b.0))
        });
        list
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `interval` for the life of the runtime
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: std::time::Duration,
        window: Duration,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.sweep(window).await {
                    Ok(0) => debug!("Result sweep found nothing stale"),
                    Ok(removed) => info!("Swept {} stale result(s)", removed),
                    Err(e) => warn!("Result sweep failed: {}", e),
                }
            }
        })
    }
}

/// Write the whole map to `path` via a temp file in the same directory
async fn persist(path: &Path, entries: &HashMap<CacheKey, CacheEntry>) -> GenrepoResult<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| GenrepoError::io(format!("creating directory {}", parent.display()), e))?;
    }

    let mut stored: Vec<StoredEntry> = entries
        .iter()
        .map(|(key, entry)| StoredEntry {
            key: key.clone(),
            entry: entry.clone(),
        })
        .collect();
    stored.sort_by(|a, b| a.key.cmp(&b.key));

    let file = StoreFile {
        version: STORE_VERSION,
        entries: stored,
    };
    let content = serde_json::to_string_pretty(&file)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.json".to_string());
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    let write = async {
        let mut out = fs::File::create(&tmp).await?;
        out.write_all(content.as_bytes()).await?;
        out.sync_all().await?;
        fs::rename(&tmp, path).await
    };

    if let Err(e) = write.await {
        let _ = fs::remove_file(&tmp).await;
        return Err(GenrepoError::io(
            format!("writing result store {}", path.display()),
            e,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::platform::PlatformTriple;
    use tempfile::TempDir;

    fn key(reference: &str) -> CacheKey {
        let platform = PlatformTriple::normalize("rhel", "6", "x86_64").unwrap();
        CacheKey::new(&platform, "git@example.com:proj.git", reference)
    }

    async fn open(dir: &TempDir) -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResultCache::open(dir.path().join("results.json"), clock.clone())
            .await
            .unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn put_then_get() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = open(&dir).await;

        let stored = cache.put(key("main"), "http://repo/a").await.unwrap();
        assert_eq!(stored.created_at, stored.last_accessed_at);

        let entry = cache.get(&key("main")).await.unwrap();
        assert_eq!(entry.result, "http://repo/a");
        assert_eq!(entry.created_at, entry.last_accessed_at);
    }

    #[tokio::test]
    async fn get_missing_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let (cache, _clock) = open(&dir).await;

        assert!(cache.get(&key("nope")).await.is_none());
        assert!(cache.is_empty().await);
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn get_touches_last_access_only() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;

        let stored = cache.put(key("main"), "u").await.unwrap();
        clock.advance(Duration::hours(3));

        let entry = cache.get(&key("main")).await.unwrap();
        assert_eq!(entry.created_at, stored.created_at);
        assert_eq!(entry.last_accessed_at, stored.created_at + Duration::hours(3));
    }

    #[tokio::test]
    async fn put_overwrites_and_resets_created() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;

        cache.put(key("main"), "old").await.unwrap();
        clock.advance(Duration::days(1));
        let fresh = cache.put(key("main"), "new").await.unwrap();

        let entry = cache.get(&key("main")).await.unwrap();
        assert_eq!(entry.result, "new");
        assert_eq!(entry.created_at, fresh.created_at);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_respects_window() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        let window = Duration::days(7);

        cache.put(key("old"), "a").await.unwrap();
        clock.advance(Duration::days(1));
        cache.put(key("edge"), "b").await.unwrap();
        clock.advance(Duration::days(1));
        cache.put(key("recent"), "c").await.unwrap();

        // old: 8 days, edge: exactly 7 days, recent: 6 days
        clock.advance(Duration::days(6));
        let before: HashMap<_, _> = cache.entries().await.into_iter().collect();

        assert_eq!(cache.sweep(window).await.unwrap(), 1);

        let after: HashMap<_, _> = cache.entries().await.into_iter().collect();
        assert!(!after.contains_key(&key("old")));
        assert_eq!(after.get(&key("edge")), before.get(&key("edge")));
        assert_eq!(after.get(&key("recent")), before.get(&key("recent")));
    }

    #[tokio::test]
    async fn touched_entries_survive_sweep() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;

        cache.put(key("main"), "a").await.unwrap();
        clock.advance(Duration::days(6));
        cache.get(&key("main")).await;
        clock.advance(Duration::days(6));

        assert_eq!(cache.sweep(Duration::days(7)).await.unwrap(), 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        cache.put(key("main"), "http://repo/a").await.unwrap();
        drop(cache);

        let reopened = ResultCache::open(dir.path().join("results.json"), clock)
            .await
            .unwrap();
        let entry = reopened.get(&key("main")).await.unwrap();
        assert_eq!(entry.result, "http://repo/a");
    }

    /// Put a non-empty directory where the store file goes so renames fail
    fn block_store_file(dir: &TempDir) {
        let path = dir.path().join("results.json");
        let _ = std::fs::remove_file(&path);
        std::fs::create_dir_all(path.join("blocked")).unwrap();
    }

    #[tokio::test]
    async fn get_returns_hit_when_flush_fails() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        let stored = cache.put(key("main"), "http://repo/a").await.unwrap();

        block_store_file(&dir);
        clock.advance(Duration::hours(1));

        let entry = cache.get(&key("main")).await.unwrap();
        assert_eq!(entry.result, "http://repo/a");
        assert_eq!(entry.last_accessed_at, stored.created_at + Duration::hours(1));
    }

    #[tokio::test]
    async fn failed_put_restores_previous_answer() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        let stored = cache.put(key("main"), "old").await.unwrap();

        block_store_file(&dir);
        clock.advance(Duration::hours(1));

        assert!(cache.put(key("main"), "new").await.is_err());
        assert!(cache.put(key("other"), "x").await.is_err());

        let list = cache.entries().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].1, stored);
    }

    #[tokio::test]
    async fn clear_all_persists_empty() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        cache.put(key("a"), "1").await.unwrap();
        cache.put(key("b"), "2").await.unwrap();

        assert_eq!(cache.clear_all().await.unwrap(), 2);
        drop(cache);

        let reopened = ResultCache::open(dir.path().join("results.json"), clock)
            .await
            .unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn entries_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        cache.put(key("a"), "1").await.unwrap();
        clock.advance(Duration::minutes(1));
        cache.put(key("b"), "2").await.unwrap();

        let list = cache.entries().await;
        assert_eq!(list[0].0.reference, "b");
        assert_eq!(list[1].0.reference, "a");
    }

    #[tokio::test]
    async fn upgrades_version_one_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let legacy = r#"{
            "entries": [
                {"key": {"distro": "rhel", "releasever": "6", "arch": "x86_64",
                         "url": "git@example.com:proj.git", "ref": "main"},
                 "result": "http://repo/old",
                 "created_at": "2024-01-01T00:00:00Z",
                 "last_accessed_at": "2024-01-01T00:00:00Z"},
                {"key": {"distro": "rhel", "releasever": "6", "arch": "x86_64",
                         "url": "git+ssh://git@example.com/proj", "ref": "main"},
                 "result": "http://repo/new",
                 "created_at": "2024-01-02T00:00:00Z",
                 "last_accessed_at": "2024-01-03T00:00:00Z"}
            ]
        }"#;
        std::fs::write(&path, legacy).unwrap();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResultCache::open(&path, clock).await.unwrap();

        assert_eq!(cache.len().await, 1);
        let list = cache.entries().await;
        assert_eq!(list[0].0.url, "git+ssh://git@example.com/proj");
        assert_eq!(list[0].1.result, "http://repo/new");

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["version"], 2);
    }

    #[tokio::test]
    async fn newer_version_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, r#"{"version": 3, "entries": []}"#).unwrap();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let err = ResultCache::open(&path, clock).await.err().unwrap();
        assert!(matches!(err, GenrepoError::StoreVersion { found: 3, .. }));
    }

    #[tokio::test]
    async fn corrupt_store_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "{ not json").unwrap();

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let err = ResultCache::open(&path, clock).await.err().unwrap();
        assert!(matches!(err, GenrepoError::StoreCorrupt { .. }));
    }

    #[tokio::test]
    async fn concurrent_puts_all_land() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        let cache = Arc::new(cache);

        let mut handles = vec![];
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.put(key(&format!("branch-{i}")), format!("u{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let reopened = ResultCache::open(dir.path().join("results.json"), clock)
            .await
            .unwrap();
        assert_eq!(reopened.len().await, 16);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn sweeper_evicts_in_background() {
        let dir = TempDir::new().unwrap();
        let (cache, clock) = open(&dir).await;
        let cache = Arc::new(cache);

        cache.put(key("main"), "u").await.unwrap();
        clock.advance(Duration::days(8));

        let handle = cache.spawn_sweeper(std::time::Duration::from_millis(10), Duration::days(7));
        for _ in 0..100 {
            if cache.is_empty().await {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(cache.is_empty().await);
    }
}
