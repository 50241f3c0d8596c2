//! Serializing wrapper for backends that need exclusive access per call.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

use super::super::item::CacheItem;
use super::super::key::Fingerprint;
use super::CacheBackend;

/// Wraps any [`CacheBackend`] behind a `tokio::sync::Mutex`, serializing
/// every call through it.
///
/// Backends built from an inherently concurrent data structure (the LRU and
/// disk backends) don't need this; it exists for composing backends that
/// are not internally safe to call concurrently, and for tests that want a
/// deterministic interleaving.
pub struct ThreadSafeBackend<B: CacheBackend> {
    inner: Mutex<B>,
}

impl<B: CacheBackend> ThreadSafeBackend<B> {
    #[must_use]
    pub fn new(inner: B) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }
}

#[async_trait]
impl<B: CacheBackend> CacheBackend for ThreadSafeBackend<B> {
    async fn get(&self, fingerprint: Fingerprint) -> Option<CacheItem> {
        let inner = self.inner.lock().await;
        inner.get(fingerprint).await
    }

    async fn set(&self, item: CacheItem) -> Result<()> {
        let inner = self.inner.lock().await;
        inner.set(item).await
    }

    async fn delete(&self, fingerprint: Fingerprint) -> Result<()> {
        let inner = self.inner.lock().await;
        inner.delete(fingerprint).await
    }

    async fn clear(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        inner.clear().await
    }

    async fn contains(&self, fingerprint: Fingerprint) -> bool {
        let inner = self.inner.lock().await;
        inner.contains(fingerprint).await
    }

    async fn keys(&self) -> Vec<Fingerprint> {
        let inner = self.inner.lock().await;
        inner.keys().await
    }
}
