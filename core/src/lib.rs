#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::borrowed_box)]
#![allow(clippy::float_cmp)]
#![allow(clippy::ref_option)]

//! # Retrieval Coordinator
//!
//! Coordinates graph-backed retrieval-augmented question answering: a
//! planner decomposes a question into retrieval tasks, retriever adapters
//! execute them against a graph store, a thinking engine iteratively
//! refines the evidence gathered, and a synthesizer produces a cited
//! answer. A two-tier cache sits in front of the whole pipeline.
//!
//! ## Module Organization
//!
//! - [`cache`]: two-tier answer cache with single-flight deduplication
//! - [`circuit_breaker`]: trips on repeated graph-store failures
//! - [`config`]: runtime configuration, loaded from TOML and environment
//! - [`constants`]: fixed, non-configurable literals
//! - [`coordinator`]: ties planning, retrieval, thinking, and synthesis together
//! - [`error`]: the coordinator's error model and recoverability rules
//! - [`evidence`]: per-query evidence trail and contradiction detection
//! - [`external`]: LLM, embedding, and graph-store adapter traits plus fakes
//! - [`planner`]: turns a question into an ordered retrieval plan
//! - [`retrievers`]: one adapter per retrieval task kind
//! - [`retry`]: exponential backoff with jitter and a retry budget
//! - [`synthesizer`]: fuses retriever output into a final, cited answer
//! - [`tasks`]: retrieval task types emitted by the planner
//! - [`thinking`]: branching reasoning engine with hypothesis verification
//! - [`trace`]: append-only execution trace for one request
//! - [`tracing`]: structured logging setup and request correlation ids
//!
//! ## Error Handling
//!
//! Most functions return [`Result<T>`]:
//!
//! ```no_run
//! use ragcoord_core::Result;
//!
//! async fn example() -> Result<()> {
//!     // Operations that can fail
//!     // .await?
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod evidence;
pub mod external;
pub mod planner;
pub mod retrievers;
pub mod retry;
pub mod synthesizer;
pub mod tasks;
pub mod thinking;
pub mod trace;
pub mod tracing;

pub use cache::{CacheManager, CacheRequest};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats};
pub use config::Config;
pub use coordinator::{AgentCoordinator, CancellationToken, ProgressEvent, QueryMetrics, QueryOutcome};
pub use error::{CacheError, Error, Result, RetrieverError};
pub use evidence::{Contradiction, EvidenceSummary, EvidenceTracker};
pub use external::{EmbeddingClient, GraphStore, LlmClient};
pub use planner::{RetrievalPlan, RetrievalPlanner};
pub use retrievers::{ResultsByType, RetrievalResult};
pub use retry::{RetryConfig, RetryPolicy};
pub use synthesizer::Synthesizer;
pub use tasks::{Task, TaskKind};
pub use thinking::ThinkingEngine;
pub use trace::ExecutionTrace;
