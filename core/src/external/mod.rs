//! Traits the coordinator consumes but never implements: the LLM provider,
//! the embedding provider, and the graph store. Production adapters live
//! outside this crate; [`fake`] provides deterministic in-process
//! implementations for tests and the CLI's offline mode.

pub mod embedding;
pub mod fake;
pub mod graph;
pub mod llm;

pub use embedding::EmbeddingClient;
pub use graph::{GraphRow, GraphStore, VectorMatch};
pub use llm::LlmClient;
