//! Circuit breaker guarding the graph-store boundary.
//!
//! ## Circuit States
//!
//! - **Closed**: normal operation, all requests pass through.
//! - **Open**: too many failures detected, requests fail immediately.
//! - **Half-Open**: testing whether the graph store has recovered.
//!
//! Per the error-handling design, repeated `GraphStoreFailure`s across
//! retrievers trip this breaker and short-circuit subsequent retrievers for
//! the remainder of the request.
//!
//! ```no_run
//! use ragcoord_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> ragcoord_core::Result<()> {
//! let config = CircuitBreakerConfig::default();
//! let circuit_breaker = CircuitBreaker::new(config);
//!
//! let result = circuit_breaker.call(|| async {
//!     Ok::<_, ragcoord_core::Error>(())
//! }).await;
//! # Ok(())
//! # }
//! ```

mod states;
#[cfg(test)]
mod tests;

pub use states::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
