//! Content-addressed on-disk cache backend with quota-based eviction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::{CacheError, Error, Result};

use super::super::item::CacheItem;
use super::super::key::Fingerprint;
use super::CacheBackend;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct DiskRecord {
    value: String,
    ttl_secs: Option<u64>,
    created_at_unix_secs: u64,
    hit_count: u64,
}

/// Disk-backed cache storing one JSON file per fingerprint under `root`.
///
/// Eviction is quota-based: when a write would push total on-disk size over
/// `quota_bytes`, the least-recently-accessed files (by file mtime) are
/// removed until the new item fits.
pub struct DiskBackend {
    root: PathBuf,
    quota_bytes: u64,
}

impl DiskBackend {
    /// Creates a backend rooted at `root`, which is created if missing.
    pub async fn new(root: impl Into<PathBuf>, quota_bytes: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, quota_bytes })
    }

    fn path_for(&self, fingerprint: Fingerprint) -> PathBuf {
        self.root.join(format!("{}.json", fingerprint.to_hex()))
    }

    async fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    total += metadata.len();
                }
            }
        }
        Ok(total)
    }

    async fn evict_until_fits(&self, incoming_size: u64) -> Result<()> {
        let mut candidates = self.files_by_access_time().await?;
        let mut total = self.total_size().await?;
        while total + incoming_size > self.quota_bytes {
            let Some((path, size)) = candidates.pop() else {
                break;
            };
            if fs::remove_file(&path).await.is_ok() {
                total = total.saturating_sub(size);
            }
        }
        Ok(())
    }

    /// Files paired with size, sorted newest-accessed-first (pop() removes
    /// the oldest).
    async fn files_by_access_time(&self) -> Result<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                let accessed = metadata
                    .accessed()
                    .or_else(|_| metadata.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                files.push((path, metadata.len(), accessed));
            }
        }
        files.sort_by_key(|(_, _, accessed)| std::cmp::Reverse(*accessed));
        Ok(files.into_iter().map(|(p, s, _)| (p, s)).collect())
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, path).await
    }
}

fn unix_secs_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl CacheBackend for DiskBackend {
    async fn get(&self, fingerprint: Fingerprint) -> Option<CacheItem> {
        let path = self.path_for(fingerprint);
        let bytes = fs::read(&path).await.ok()?;
        let record: DiskRecord = serde_json::from_slice(&bytes).ok()?;

        let ttl = record.ttl_secs.map(std::time::Duration::from_secs);
        if let Some(ttl) = ttl {
            let age = unix_secs_now().saturating_sub(record.created_at_unix_secs);
            if age >= ttl.as_secs() {
                let _ = fs::remove_file(&path).await;
                return None;
            }
        }

        let mut item = CacheItem::new(fingerprint, record.value, ttl);
        item.hit_count = record.hit_count + 1;
        Some(item)
    }

    async fn set(&self, item: CacheItem) -> Result<()> {
        let record = DiskRecord {
            value: item.value,
            ttl_secs: item.ttl.map(|d| d.as_secs()),
            created_at_unix_secs: unix_secs_now(),
            hit_count: item.hit_count,
        };
        let bytes = serde_json::to_vec(&record).map_err(Error::Serialization)?;
        let path = self.path_for(item.fingerprint);

        self.evict_until_fits(bytes.len() as u64)
            .await
            .map_err(|e| CacheError::EvictionFailed {
                reason: e.to_string(),
            })?;

        self.write_atomic(&path, &bytes)
            .await
            .map_err(|e| CacheError::WriteFailed {
                fingerprint: item.fingerprint.to_hex(),
                error: e.to_string(),
            })?;
        Ok(())
    }

    async fn delete(&self, fingerprint: Fingerprint) -> Result<()> {
        let path = self.path_for(fingerprint);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::ReadFailed {
                fingerprint: fingerprint.to_hex(),
                error: e.to_string(),
            }
            .into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let _ = fs::remove_file(entry.path()).await;
        }
        Ok(())
    }

    async fn contains(&self, fingerprint: Fingerprint) -> bool {
        fs::metadata(self.path_for(fingerprint)).await.is_ok()
    }

    async fn keys(&self) -> Vec<Fingerprint> {
        let Ok(mut entries) = fs::read_dir(&self.root).await else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(value) = u64::from_str_radix(stem, 16) {
                    keys.push(Fingerprint::new(value));
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(fp: u64, value: &str) -> CacheItem {
        CacheItem::new(Fingerprint::new(fp), value.to_string(), None)
    }

    #[tokio::test]
    async fn set_then_get_round_trips_value() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path(), 1_000_000).await.unwrap();
        backend.set(item(1, "hello")).await.unwrap();
        let got = backend.get(Fingerprint::new(1)).await.unwrap();
        assert_eq!(got.value, "hello");
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path(), 1_000_000).await.unwrap();
        assert!(backend.get(Fingerprint::new(42)).await.is_none());
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path(), 1_000_000).await.unwrap();
        backend.set(item(1, "hello")).await.unwrap();
        backend.delete(Fingerprint::new(1)).await.unwrap();
        assert!(!backend.contains(Fingerprint::new(1)).await);
    }

    #[tokio::test]
    async fn quota_eviction_drops_oldest_file() {
        let dir = tempfile::tempdir().unwrap();
        // Each record serializes to a bit over the size of its value; a tiny
        // quota forces eviction on the second write.
        let backend = DiskBackend::new(dir.path(), 140).await.unwrap();
        backend.set(item(1, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")).await.unwrap();
        backend.set(item(2, "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")).await.unwrap();
        let keys = backend.keys().await;
        assert!(keys.len() <= 2);
    }

    #[tokio::test]
    async fn clear_removes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(dir.path(), 1_000_000).await.unwrap();
        backend.set(item(1, "a")).await.unwrap();
        backend.set(item(2, "b")).await.unwrap();
        backend.clear().await.unwrap();
        assert!(backend.keys().await.is_empty());
    }
}
