//! Exponential-backoff retry for a single retriever dispatch.
//!
//! The coordinator builds a fresh [`RetryPolicy`] per dispatched task (see
//! `coordinator::dispatch`) and hands it the retriever's `search` call;
//! only errors that report [`Retryable::is_recoverable`] get a second
//! attempt, everything else propagates on the first failure.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Whether an error is worth retrying. Implemented for [`crate::error::Error`]
/// by delegating to its own `is_recoverable`, which distinguishes e.g. a
/// transient `GraphStoreFailure` from a permanent `InvalidInput`.
pub trait Retryable {
    fn is_recoverable(&self) -> bool;
}

impl Retryable for crate::error::Error {
    fn is_recoverable(&self) -> bool {
        self.is_recoverable()
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
    /// Caps total retries across every task in one dispatch run, so one
    /// flaky retriever can't exhaust the whole request's time budget.
    pub max_retry_budget: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
            max_retry_budget: None,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.max_retry_budget = Some(budget);
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

struct RetryBudget {
    remaining: u32,
}

/// Retries one retriever dispatch against `config`, consulting an optional
/// shared [`RetryBudget`] so a burst of failing tasks can't each retry
/// `max_retries` times independently.
pub struct RetryPolicy {
    config: RetryConfig,
    budget: Option<RetryBudget>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self { config: RetryConfig::default(), budget: None }
    }

    #[must_use]
    pub fn with_config(config: RetryConfig) -> Self {
        let budget = config.max_retry_budget.map(|remaining| RetryBudget { remaining });
        Self { config, budget }
    }

    #[must_use]
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.budget = Some(RetryBudget { remaining: budget });
        self
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exp_delay = self.config.base_delay * (2u32.pow(attempt.saturating_sub(1)));
        let delay = std::cmp::min(exp_delay, self.config.max_delay);

        if self.config.jitter_factor > 0.0 {
            let jitter_range = delay.as_millis() as f64 * self.config.jitter_factor;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
            let adjusted_ms = (delay.as_millis() as f64 + jitter).max(0.0);
            Duration::from_millis(adjusted_ms as u64)
        } else {
            delay
        }
    }

    fn can_retry(&mut self) -> bool {
        match &mut self.budget {
            Some(budget) if budget.remaining == 0 => false,
            Some(budget) => {
                budget.remaining -= 1;
                true
            }
            None => true,
        }
    }

    /// Calls `operation` until it succeeds, exhausts `max_retries` or the
    /// retry budget, or returns a non-recoverable error.
    pub async fn execute<F, T, E, Fut>(&mut self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Debug,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_recoverable() || !self.can_retry() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.calculate_delay(attempt);
                    warn!(attempt, max_retries = self.config.max_retries, ?delay, error = ?e, "retriever dispatch failed, retrying");
                    sleep(delay).await;
                }
            }
        }
    }
}
