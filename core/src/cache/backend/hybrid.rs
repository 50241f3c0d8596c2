//! Two-tier backend: memory-first reads with promotion, dual writes.

use async_trait::async_trait;

use crate::error::Result;

use super::super::item::CacheItem;
use super::super::key::Fingerprint;
use super::{CacheBackend, DiskBackend, MemoryBackend};

/// Reads check the memory tier first and promote a disk hit back into it;
/// writes go to both tiers so a restart only loses the memory tier's speed,
/// not its content.
pub struct HybridBackend {
    memory: MemoryBackend,
    disk: DiskBackend,
}

impl HybridBackend {
    #[must_use]
    pub fn new(memory: MemoryBackend, disk: DiskBackend) -> Self {
        Self { memory, disk }
    }
}

#[async_trait]
impl CacheBackend for HybridBackend {
    async fn get(&self, fingerprint: Fingerprint) -> Option<CacheItem> {
        if let Some(item) = self.memory.get(fingerprint).await {
            return Some(item);
        }
        let item = self.disk.get(fingerprint).await?;
        let _ = self.memory.set(item.clone()).await;
        Some(item)
    }

    async fn set(&self, item: CacheItem) -> Result<()> {
        self.memory.set(item.clone()).await?;
        self.disk.set(item).await
    }

    async fn delete(&self, fingerprint: Fingerprint) -> Result<()> {
        self.memory.delete(fingerprint).await?;
        self.disk.delete(fingerprint).await
    }

    async fn clear(&self) -> Result<()> {
        self.memory.clear().await?;
        self.disk.clear().await
    }

    async fn contains(&self, fingerprint: Fingerprint) -> bool {
        self.memory.contains(fingerprint).await || self.disk.contains(fingerprint).await
    }

    async fn keys(&self) -> Vec<Fingerprint> {
        let mut keys = self.memory.keys().await;
        for key in self.disk.keys().await {
            if !keys.contains(&key) {
                keys.push(key);
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

    async fn backend() -> HybridBackend {
        let dir = tempfile::tempdir().unwrap();
        // leaked so the tempdir outlives the backend in these short tests
        let path = Box::leak(Box::new(dir)).path();
        HybridBackend::new(
            MemoryBackend::new(4, None),
            DiskBackend::new(path, 1_000_000).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn set_is_visible_from_both_tiers() {
        let backend = backend().await;
        backend.set(item(1, "v")).await.unwrap();
        assert!(backend.memory.contains(Fingerprint::new(1)).await);
        assert!(backend.disk.contains(Fingerprint::new(1)).await);
    }

    #[tokio::test]
    async fn disk_only_hit_is_promoted_to_memory() {
        let backend = backend().await;
        backend.disk.set(item(1, "v")).await.unwrap();
        assert!(!backend.memory.contains(Fingerprint::new(1)).await);
        let got = backend.get(Fingerprint::new(1)).await;
        assert!(got.is_some());
        assert!(backend.memory.contains(Fingerprint::new(1)).await);
    }

    #[tokio::test]
    async fn delete_removes_from_both_tiers() {
        let backend = backend().await;
        backend.set(item(1, "v")).await.unwrap();
        backend.delete(Fingerprint::new(1)).await.unwrap();
        assert!(backend.get(Fingerprint::new(1)).await.is_none());
    }
}
