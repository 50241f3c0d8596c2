//! Builds the in-process coordinator and cache manager each invocation
//! wires up against. Real LLM/embedding/graph provider integration is out
//! of scope for this workspace, so every run uses the deterministic fake
//! adapters from `ragcoord_core::external::fake`.

use std::path::PathBuf;
use std::sync::Arc;

use ragcoord_core::cache::{CacheManager, DiskBackend, HybridBackend, MemoryBackend};
use ragcoord_core::config::Config;
use ragcoord_core::external::fake::{FakeEmbeddingClient, FakeGraphStore, FakeLlmClient};
use ragcoord_core::{AgentCoordinator, EmbeddingClient, GraphStore, LlmClient};

/// Default directory the global cache tier persists to, relative to the
/// current working directory.
pub const DEFAULT_CACHE_DIR: &str = ".ragcoord-cache";

/// Everything a command needs to run a query or inspect the cache.
pub struct Runtime {
    pub coordinator: AgentCoordinator,
    pub cache: Arc<CacheManager>,
}

impl Runtime {
    /// Builds a coordinator backed by fake adapters and a cache manager
    /// whose global tier persists to `cache_dir` across invocations; the
    /// session tier stays memory-only since it never outlives the process
    /// anyway.
    pub async fn build(config: Config, cache_dir: PathBuf, llm_response: String) -> anyhow::Result<Self> {
        let ttl = config.cache.ttl_seconds.map(std::time::Duration::from_secs);
        let session = Box::new(MemoryBackend::new(config.cache.memory.capacity, ttl));
        let disk = DiskBackend::new(cache_dir, config.cache.disk.quota_bytes).await?;
        let global = Box::new(HybridBackend::new(
            MemoryBackend::new(config.cache.memory.capacity, ttl),
            disk,
        ));
        let cache = Arc::new(CacheManager::new(session, global, config.cache.key_strategy, ttl));

        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlmClient::new(llm_response));
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(FakeEmbeddingClient::default());
        let graph: Arc<dyn GraphStore> = Arc::new(FakeGraphStore::new());

        let coordinator = AgentCoordinator::new(config, cache.clone(), llm, embedder, graph);
        Ok(Self { coordinator, cache })
    }
}
