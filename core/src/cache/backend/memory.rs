//! Bounded in-memory cache backend with LRU eviction.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;

use crate::error::Result;

use super::super::item::CacheItem;
use super::super::key::Fingerprint;
use super::CacheBackend;

/// LRU-bounded, optionally TTL-expiring in-memory backend.
///
/// Critical sections are synchronous `parking_lot` locks held only around
/// the map operation itself, never across an `.await` point.
pub struct MemoryBackend {
    capacity: NonZeroUsize,
    ttl: Option<Duration>,
    entries: RwLock<LruCache<Fingerprint, CacheItem>>,
}

impl MemoryBackend {
    /// Creates a backend bounded to `capacity` entries with an optional TTL
    /// applied to every item written through it.
    #[must_use]
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            capacity,
            ttl,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries currently held, including not-yet-expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the backend currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, fingerprint: Fingerprint) -> Option<CacheItem> {
        let mut entries = self.entries.write();
        match entries.get_mut(&fingerprint) {
            Some(item) if item.is_expired() => {
                entries.pop(&fingerprint);
                None
            }
            Some(item) => {
                item.record_access();
                Some(item.clone())
            }
            None => None,
        }
    }

    async fn set(&self, mut item: CacheItem) -> Result<()> {
        if item.ttl.is_none() {
            item.ttl = self.ttl;
        }
        self.entries.write().put(item.fingerprint, item);
        Ok(())
    }

    async fn delete(&self, fingerprint: Fingerprint) -> Result<()> {
        self.entries.write().pop(&fingerprint);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn contains(&self, fingerprint: Fingerprint) -> bool {
        let mut entries = self.entries.write();
        match entries.peek(&fingerprint) {
            Some(item) if item.is_expired() => {
                entries.pop(&fingerprint);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    async fn keys(&self) -> Vec<Fingerprint> {
        self.entries.read().iter().map(|(fp, _)| *fp).collect()
    }
}
