use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — retriever dispatches pass through.
    Closed,
    /// The graph store has failed repeatedly — dispatches fail immediately.
    Open,
    /// Testing whether the graph store has recovered.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive `GraphStoreFailure`s before the breaker opens (default: 5).
    pub failure_threshold: u32,
    /// How long to stay open before probing again (default: 30s).
    pub timeout: Duration,
    /// How long a half-open probe window stays open (default: 10s).
    pub half_open_test_period: Duration,
    /// Base delay for `calculate_backoff` (default: 100ms).
    pub base_delay: Duration,
    /// Cap for `calculate_backoff` (default: 1600ms).
    pub max_delay: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            half_open_test_period: Duration::from_secs(10),
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1600),
        }
    }
}

/// Circuit breaker statistics, surfaced for observability; not consulted by
/// the breaker's own transition logic.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    pub consecutive_failures: u32,
    pub circuit_opened_count: u32,
}

struct CircuitBreakerState {
    state: CircuitState,
    stats: CircuitBreakerStats,
    last_failure_time: Option<Instant>,
    half_open_started: Option<Instant>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            stats: CircuitBreakerStats::default(),
            last_failure_time: None,
            half_open_started: None,
        }
    }
}

/// Guards a single external boundary (the coordinator uses one instance for
/// its graph store) by failing fast once that boundary is unhealthy instead
/// of letting every retriever queue up against it.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Arc<RwLock<CircuitBreakerState>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        info!(
            threshold = config.failure_threshold,
            timeout = ?config.timeout,
            "initializing circuit breaker"
        );

        Self {
            config,
            state: Arc::new(RwLock::new(CircuitBreakerState::default())),
        }
    }

    /// Runs `operation` through the breaker, rejecting it with
    /// [`Error::CircuitBreakerOpen`] instead of invoking it while open.
    ///
    /// ```no_run
    /// # use ragcoord_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    /// # async fn example() -> ragcoord_core::Result<()> {
    /// let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
    /// cb.call(|| async { Ok::<_, ragcoord_core::Error>(()) }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let should_proceed = self.should_allow_request().await?;

        if !should_proceed {
            let mut state = self.state.write().await;
            state.stats.rejected_calls += 1;
            debug!("rejecting retriever dispatch - circuit is open");
            return Err(Error::CircuitBreakerOpen);
        }

        {
            let mut state = self.state.write().await;
            state.stats.total_calls += 1;
        }

        let result = operation().await;
        self.on_result(&result).await;
        result
    }

    async fn should_allow_request(&self) -> Result<bool> {
        let now = Instant::now();
        let mut state = self.state.write().await;

        match state.state {
            CircuitState::Closed => Ok(true),
            CircuitState::Open => {
                if let Some(last_failure) = state.last_failure_time {
                    if now.duration_since(last_failure) >= self.config.timeout {
                        info!("graph store breaker transitioning to half-open");
                        state.state = CircuitState::HalfOpen;
                        state.half_open_started = Some(now);
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                } else {
                    Ok(false)
                }
            }
            CircuitState::HalfOpen => Ok(true),
        }
    }

    async fn on_result<T>(&self, result: &Result<T>) {
        let mut state = self.state.write().await;

        match result {
            Ok(_) => {
                state.stats.successful_calls += 1;
                self.on_success(&mut state).await;
            }
            Err(e) => {
                if e.is_recoverable() {
                    state.stats.failed_calls += 1;
                    self.on_failure(&mut state).await;
                } else {
                    debug!(error = %e, "non-recoverable error, not affecting circuit");
                }
            }
        }
    }

    #[allow(clippy::unused_async)]
    async fn on_success(&self, state: &mut CircuitBreakerState) {
        match state.state {
            CircuitState::HalfOpen => {
                info!("graph store breaker closing after successful recovery probe");
                state.state = CircuitState::Closed;
                state.stats.consecutive_failures = 0;
                state.last_failure_time = None;
                state.half_open_started = None;
            }
            CircuitState::Closed => {
                if state.stats.consecutive_failures > 0 {
                    debug!(from = state.stats.consecutive_failures, "resetting consecutive failures");
                    state.stats.consecutive_failures = 0;
                }
            }
            CircuitState::Open => {
                warn!("unexpected success while the breaker was open");
            }
        }
    }

    #[allow(clippy::unused_async)]
    async fn on_failure(&self, state: &mut CircuitBreakerState) {
        state.stats.consecutive_failures += 1;
        state.last_failure_time = Some(Instant::now());

        debug!(
            consecutive = state.stats.consecutive_failures,
            threshold = self.config.failure_threshold,
            "graph store call failed"
        );

        match state.state {
            CircuitState::Closed => {
                if state.stats.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        consecutive = state.stats.consecutive_failures,
                        "opening circuit after repeated graph store failures"
                    );
                    state.state = CircuitState::Open;
                    state.stats.circuit_opened_count += 1;
                }
            }
            CircuitState::HalfOpen => {
                warn!("graph store still failing, reopening circuit");
                state.state = CircuitState::Open;
                state.stats.circuit_opened_count += 1;
                state.half_open_started = None;
            }
            CircuitState::Open => {}
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        self.state.read().await.stats.clone()
    }

    /// Exponential backoff for `attempt` (0-based), doubling from
    /// `base_delay` up to `max_delay`.
    #[must_use]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = self.config.base_delay.as_millis() as u64 * 2u64.pow(attempt);
        std::cmp::min(Duration::from_millis(delay), self.config.max_delay)
    }

    /// Forces the breaker back to `Closed`; used by tests and manual
    /// operator intervention.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        info!("circuit breaker reset to closed state");
        state.state = CircuitState::Closed;
        state.stats.consecutive_failures = 0;
        state.last_failure_time = None;
        state.half_open_started = None;
    }
}
