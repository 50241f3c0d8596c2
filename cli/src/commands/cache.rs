//! The `cache` command group: inspect and manage the persisted cache.

use clap::Subcommand;
use ragcoord_core::CacheRequest;
use serde::Serialize;

use crate::output::{Output, OutputFormat};
use crate::runtime::Runtime;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show the cache's effective configuration.
    Status,
    /// Evict both cache tiers entirely.
    Clear,
    /// Evict one cached answer, identified the same way the coordinator
    /// fingerprints it.
    Invalidate {
        /// The question whose cached answer should be evicted.
        question: String,
        /// Thread id used to scope the session tier, if any.
        #[arg(short, long)]
        thread_id: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub memory_capacity: usize,
    pub disk_quota_bytes: u64,
    pub ttl_seconds: Option<u64>,
    pub key_strategy: String,
    pub cache_dir: String,
}

#[derive(Debug, Serialize)]
pub struct CacheActionResult {
    pub action: String,
    pub ok: bool,
}

impl Output for CacheStatus {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "memory capacity: {} entries", self.memory_capacity)?;
        writeln!(writer, "disk quota: {} bytes", self.disk_quota_bytes)?;
        writeln!(
            writer,
            "ttl: {}",
            self.ttl_seconds.map_or_else(|| "none".to_string(), |s| format!("{s}s"))
        )?;
        writeln!(writer, "key strategy: {}", self.key_strategy)?;
        writeln!(writer, "cache dir: {}", self.cache_dir)?;
        Ok(())
    }
}

impl Output for CacheActionResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "{}: {}", self.action, if self.ok { "ok" } else { "failed" })?;
        Ok(())
    }
}

pub async fn handle_cache_command(
    command: CacheCommands,
    runtime: &Runtime,
    config: &ragcoord_core::Config,
    cache_dir: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        CacheCommands::Status => {
            let status = CacheStatus {
                memory_capacity: config.cache.memory.capacity,
                disk_quota_bytes: config.cache.disk.quota_bytes,
                ttl_seconds: config.cache.ttl_seconds,
                key_strategy: format!("{:?}", config.cache.key_strategy),
                cache_dir: cache_dir.to_string(),
            };
            format.print(&status)
        }
        CacheCommands::Clear => {
            runtime.cache.clear().await?;
            format.print(&CacheActionResult { action: "clear".to_string(), ok: true })
        }
        CacheCommands::Invalidate { question, thread_id } => {
            let request = match thread_id {
                Some(t) => CacheRequest::new(question.as_str()).with_thread_id(t),
                None => CacheRequest::new(question.as_str()),
            };
            runtime.cache.invalidate(&request).await?;
            format.print(&CacheActionResult { action: "invalidate".to_string(), ok: true })
        }
    }
}
