//! Two-tier answer cache: a per-thread session tier and a cross-thread
//! global tier, with single-flight deduplication of concurrent computation
//! for the same fingerprint.

pub mod backend;
pub mod item;
pub mod key;
pub mod manager;

pub use backend::{CacheBackend, DiskBackend, HybridBackend, MemoryBackend, ThreadSafeBackend};
pub use item::CacheItem;
pub use key::{CacheRequest, Fingerprint, KeyStrategy};
pub use manager::CacheManager;
