//! Error types for the retrieval-reasoning coordinator.

pub mod cache;
pub mod retriever;

pub use cache::CacheError;
pub use retriever::RetrieverError;

/// Result type alias used throughout the coordinator.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for coordinator operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The planner's LLM response could not be parsed as a `RetrievalPlan`;
    /// the caller falls back to a default plan.
    #[error("retrieval plan parse failure: {0}")]
    PlannerParseFailure(String),

    /// A single retriever invocation failed.
    #[error("{0}")]
    RetrieverFailure(#[from] RetrieverError),

    /// An LLM call failed at a named stage of the pipeline.
    #[error("LLM failure at stage '{stage}': {cause}")]
    LLMFailure {
        /// The pipeline stage that issued the failing call (e.g. `"synthesis"`).
        stage: String,
        /// Human-readable cause of the failure.
        cause: String,
    },

    /// The graph store backing a retriever failed.
    #[error("graph store failure: {0}")]
    GraphStoreFailure(String),

    /// An operation exceeded its deadline and was cancelled.
    #[error("operation timed out")]
    Timeout,

    /// A cache backend operation failed.
    #[error("{0}")]
    CacheFailure(#[from] CacheError),

    /// The request was cancelled by the caller before completion.
    #[error("request cancelled")]
    Cancelled,

    /// The circuit breaker guarding the graph-store boundary is open.
    #[error("circuit breaker open")]
    CircuitBreakerOpen,

    /// An I/O operation failed (disk cache backend, config file reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `serde_json` (de)serialization operation failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A caller-supplied argument failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Classifies the error per the recovery table: `true` means the caller
    /// may retry or otherwise proceed past it without failing the whole
    /// request; `false` means it should surface as (or contribute to) a
    /// user-visible failure.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Recovered locally: default plan, task marked errored, cache
            // miss treated as a normal miss, circuit trips short-circuit
            // rather than fail the request outright.
            Error::PlannerParseFailure(_)
            | Error::RetrieverFailure(_)
            | Error::GraphStoreFailure(_)
            | Error::Timeout
            | Error::CacheFailure(_)
            | Error::CircuitBreakerOpen => true,
            // LLM failures are only recoverable away from the synthesis
            // stage; synthesis failures are fatal to the request.
            Error::LLMFailure { stage, .. } => stage != "synthesis",
            Error::Cancelled
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::InvalidInput(_) => false,
        }
    }

    /// Whether a run ending in this error must not write a cache entry.
    #[must_use]
    pub fn forbids_caching(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::LLMFailure { stage, .. } => stage == "synthesis",
            _ => false,
        }
    }
}
