//! Runtime configuration for the retrieval-reasoning coordinator.
//!
//! Every option recognized by the coordinator is enumerated here with the
//! defaults from the configuration table; nothing else is read. Values load
//! from an optional TOML file and can be overridden by `RAGCOORD_`-prefixed
//! environment variables using double underscores to address nested fields
//! (e.g. `RAGCOORD_CACHE__MEMORY__CAPACITY`).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache subsystem settings.
    pub cache: CacheConfig,
    /// Retrieval planner settings.
    pub plan: PlanConfig,
    /// Thinking engine settings.
    pub thinking: ThinkingConfig,
    /// Retriever adapter settings.
    pub retriever: RetrieverConfig,
    /// Coordinator settings.
    pub coordinator: CoordinatorConfig,
    /// Chain-exploration retriever settings.
    pub chain_exploration: ChainExplorationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            plan: PlanConfig::default(),
            thinking: ThinkingConfig::default(),
            retriever: RetrieverConfig::default(),
            coordinator: CoordinatorConfig::default(),
            chain_exploration: ChainExplorationConfig::default(),
        }
    }
}

/// Cache memory/disk capacity, TTL, and key-strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// In-memory LRU backend settings.
    pub memory: MemoryCacheConfig,
    /// On-disk backend settings.
    pub disk: DiskCacheConfig,
    /// Optional entry TTL; when unset, entries never expire.
    pub ttl_seconds: Option<u64>,
    /// Which key strategy the cache manager fingerprints requests with.
    pub key_strategy: KeyStrategyKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory: MemoryCacheConfig::default(),
            disk: DiskCacheConfig::default(),
            ttl_seconds: None,
            key_strategy: KeyStrategyKind::ContextAware,
        }
    }
}

/// Memory backend capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    /// Maximum LRU entries held in memory.
    pub capacity: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

/// Disk backend quota.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskCacheConfig {
    /// Total bytes on disk before least-recently-accessed eviction kicks in.
    pub quota_bytes: u64,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            quota_bytes: 1024 * 1024 * 1024,
        }
    }
}

/// Which fingerprinting strategy the cache manager uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategyKind {
    /// Hash of normalized question text only.
    Simple,
    /// Hash of thread id and normalized question text.
    ContextAware,
    /// Hash of thread id, normalized question text, and sorted keyword lists.
    #[serde(rename = "context+keyword-aware")]
    ContextKeywordAware,
}

/// Threshold controlling when the thinking engine is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Plan complexity above which thinking is enabled.
    pub complexity_threshold: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 0.7,
        }
    }
}

/// Thinking engine bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingConfig {
    /// Maximum outbound search queries per run.
    pub max_search_iterations: u32,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            max_search_iterations: 5,
        }
    }
}

/// Per-retriever invocation timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Seconds allowed for a single retriever call.
    pub timeout_seconds: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self { timeout_seconds: 60 }
    }
}

/// Coordinator-wide timeout and worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Seconds allowed for the whole query.
    pub total_timeout_seconds: u64,
    /// Number of workers draining the retriever task queue.
    pub worker_pool_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            total_timeout_seconds: 300,
            worker_pool_size: 4,
        }
    }
}

/// Chain-exploration walk depth and seed limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainExplorationConfig {
    /// Maximum graph-walk hops.
    pub max_steps: u32,
    /// Maximum seed entities taken from extraction per task.
    pub seed_entity_limit: usize,
}

impl Default for ChainExplorationConfig {
    fn default() -> Self {
        Self {
            max_steps: 3,
            seed_entity_limit: 3,
        }
    }
}

impl Config {
    /// Parses a TOML document into a `Config`, filling unspecified fields
    /// with defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidInput(format!("invalid configuration: {e}")))
    }

    /// Applies `RAGCOORD_`-prefixed environment variable overrides on top of
    /// whatever was loaded from file or defaults.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_usize("RAGCOORD_CACHE__MEMORY__CAPACITY") {
            self.cache.memory.capacity = v;
        }
        if let Some(v) = env_u64("RAGCOORD_CACHE__DISK__QUOTA_BYTES") {
            self.cache.disk.quota_bytes = v;
        }
        if let Ok(raw) = std::env::var("RAGCOORD_CACHE__TTL_SECONDS") {
            self.cache.ttl_seconds = raw.parse().ok();
        }
        if let Ok(raw) = std::env::var("RAGCOORD_CACHE__KEY_STRATEGY") {
            self.cache.key_strategy = match raw.as_str() {
                "simple" => KeyStrategyKind::Simple,
                "context-aware" => KeyStrategyKind::ContextAware,
                "context+keyword-aware" => KeyStrategyKind::ContextKeywordAware,
                other => {
                    tracing::warn!("unrecognized RAGCOORD_CACHE__KEY_STRATEGY '{other}', keeping current value");
                    self.cache.key_strategy
                }
            };
        }
        if let Some(v) = env_f64("RAGCOORD_PLAN__COMPLEXITY_THRESHOLD") {
            self.plan.complexity_threshold = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_u32("RAGCOORD_THINKING__MAX_SEARCH_ITERATIONS") {
            self.thinking.max_search_iterations = v;
        }
        if let Some(v) = env_u64("RAGCOORD_RETRIEVER__TIMEOUT_SECONDS") {
            self.retriever.timeout_seconds = v;
        }
        if let Some(v) = env_u64("RAGCOORD_COORDINATOR__TOTAL_TIMEOUT_SECONDS") {
            self.coordinator.total_timeout_seconds = v;
        }
        if let Some(v) = env_usize("RAGCOORD_COORDINATOR__WORKER_POOL_SIZE") {
            self.coordinator.worker_pool_size = v;
        }
        if let Some(v) = env_u32("RAGCOORD_CHAIN_EXPLORATION__MAX_STEPS") {
            self.chain_exploration.max_steps = v;
        }
        if let Some(v) = env_usize("RAGCOORD_CHAIN_EXPLORATION__SEED_ENTITY_LIMIT") {
            self.chain_exploration.seed_entity_limit = v;
        }
        self
    }

    /// Validates cross-field invariants not expressible in the type system.
    pub fn validate(&self) -> Result<()> {
        if self.cache.memory.capacity == 0 {
            return Err(Error::InvalidInput(
                "cache.memory.capacity must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.plan.complexity_threshold) {
            return Err(Error::InvalidInput(
                "plan.complexity_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.thinking.max_search_iterations == 0 {
            return Err(Error::InvalidInput(
                "thinking.max_search_iterations must be greater than zero".to_string(),
            ));
        }
        if self.coordinator.worker_pool_size == 0 {
            return Err(Error::InvalidInput(
                "coordinator.worker_pool_size must be greater than zero".to_string(),
            ));
        }
        if self.chain_exploration.seed_entity_limit == 0 {
            return Err(Error::InvalidInput(
                "chain_exploration.seed_entity_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
