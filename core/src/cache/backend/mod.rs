//! Pluggable cache storage backends.

mod disk;
mod hybrid;
mod memory;
mod thread_safe;

pub use disk::DiskBackend;
pub use hybrid::HybridBackend;
pub use memory::MemoryBackend;
pub use thread_safe::ThreadSafeBackend;

use async_trait::async_trait;

use super::item::CacheItem;
use super::key::Fingerprint;

/// Storage backend for cache items.
///
/// `get` never fails: backend errors are logged internally and surfaced as a
/// miss. `set`/`delete`/`clear` report failures so the caller can log them,
/// but per the error-handling design a cache failure is never fatal to the
/// request that triggered it.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Looks up a fingerprint; returns `None` on miss, expiry, or error.
    async fn get(&self, fingerprint: Fingerprint) -> Option<CacheItem>;

    /// Stores an item, replacing any existing entry for its fingerprint.
    async fn set(&self, item: CacheItem) -> crate::error::Result<()>;

    /// Removes an entry if present.
    async fn delete(&self, fingerprint: Fingerprint) -> crate::error::Result<()>;

    /// Removes every entry.
    async fn clear(&self) -> crate::error::Result<()>;

    /// Whether a live (non-expired) entry exists for the fingerprint.
    async fn contains(&self, fingerprint: Fingerprint) -> bool;

    /// Every fingerprint currently stored, in unspecified order.
    async fn keys(&self) -> Vec<Fingerprint>;
}
