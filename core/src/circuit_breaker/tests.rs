//! Circuit breaker tests, scoped to the graph-store boundary the
//! coordinator actually guards with this breaker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::Error;

fn graph_store_breaker(failure_threshold: u32, timeout_secs: u64) -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold,
        timeout: Duration::from_secs(timeout_secs),
        half_open_test_period: Duration::from_secs(1),
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1600),
    })
}

fn graph_store_failure() -> Error {
    Error::GraphStoreFailure("neo4j connection refused".to_string())
}

#[tokio::test]
async fn starts_closed() {
    let cb = graph_store_breaker(5, 30);
    assert_eq!(cb.state().await, CircuitState::Closed);
}

#[tokio::test]
async fn one_failure_does_not_trip_it() {
    let cb = graph_store_breaker(5, 30);

    let result = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;

    assert!(result.is_err());
    assert_eq!(cb.state().await, CircuitState::Closed);
    let stats = cb.stats().await;
    assert_eq!(stats.consecutive_failures, 1);
    assert_eq!(stats.failed_calls, 1);
}

#[tokio::test]
async fn opens_after_consecutive_graph_store_failures() {
    let cb = graph_store_breaker(5, 30);

    for i in 0..5 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
        if i < 4 {
            assert_eq!(cb.state().await, CircuitState::Closed);
        }
    }

    assert_eq!(cb.state().await, CircuitState::Open);
    let stats = cb.stats().await;
    assert_eq!(stats.circuit_opened_count, 1);
    assert_eq!(stats.consecutive_failures, 5);
}

#[tokio::test]
async fn open_breaker_rejects_without_invoking_the_retriever() {
    let cb = graph_store_breaker(3, 30);
    for _ in 0..3 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
    }
    assert_eq!(cb.state().await, CircuitState::Open);

    let invoked = Arc::new(AtomicUsize::new(0));
    let invoked_clone = invoked.clone();
    let result = cb
        .call(|| async move {
            invoked_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<i32, Error>(42)
        })
        .await;

    assert!(matches!(result, Err(Error::CircuitBreakerOpen)));
    assert_eq!(invoked.load(Ordering::SeqCst), 0, "rejected call must short-circuit before dispatch");
    assert_eq!(cb.stats().await.rejected_calls, 1);
}

#[tokio::test]
async fn half_open_probe_closes_on_recovery() {
    let cb = graph_store_breaker(2, 1);
    for _ in 0..2 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
    }
    assert_eq!(cb.state().await, CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let result = cb.call(|| async { Ok::<i32, Error>(42) }).await;

    assert!(result.is_ok());
    assert_eq!(cb.state().await, CircuitState::Closed);
    assert_eq!(cb.stats().await.consecutive_failures, 0);
}

#[tokio::test]
async fn half_open_probe_failure_reopens_and_recounts() {
    let cb = graph_store_breaker(2, 1);
    for _ in 0..2 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
    }
    assert_eq!(cb.state().await, CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;

    assert_eq!(cb.state().await, CircuitState::Open);
    assert_eq!(cb.stats().await.circuit_opened_count, 2);
}

#[tokio::test]
async fn a_success_resets_the_consecutive_failure_streak() {
    let cb = graph_store_breaker(5, 30);

    for _ in 0..2 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
    }
    assert_eq!(cb.stats().await.consecutive_failures, 2);

    let _ = cb.call(|| async { Ok::<i32, Error>(42) }).await;

    assert_eq!(cb.stats().await.consecutive_failures, 0);
    assert_eq!(cb.state().await, CircuitState::Closed);
}

#[tokio::test]
async fn non_recoverable_errors_never_trip_the_breaker() {
    let cb = graph_store_breaker(3, 30);

    for _ in 0..5 {
        let _ = cb.call(|| async { Err::<i32, Error>(Error::InvalidInput("bad plan json".to_string())) }).await;
    }

    assert_eq!(cb.stats().await.consecutive_failures, 0);
    assert_eq!(cb.state().await, CircuitState::Closed);
}

#[tokio::test]
async fn backoff_doubles_up_to_the_configured_cap() {
    let cb = graph_store_breaker(5, 30);

    assert_eq!(cb.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(cb.calculate_backoff(1), Duration::from_millis(200));
    assert_eq!(cb.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(cb.calculate_backoff(3), Duration::from_millis(800));
    assert_eq!(cb.calculate_backoff(4), Duration::from_millis(1600));
    assert_eq!(cb.calculate_backoff(5), Duration::from_millis(1600));
}

#[tokio::test]
async fn reset_forces_the_breaker_back_to_closed() {
    let cb = graph_store_breaker(2, 30);
    for _ in 0..2 {
        let _ = cb.call(|| async { Err::<i32, Error>(graph_store_failure()) }).await;
    }
    assert_eq!(cb.state().await, CircuitState::Open);

    cb.reset().await;

    assert_eq!(cb.state().await, CircuitState::Closed);
    assert_eq!(cb.stats().await.consecutive_failures, 0);
}

#[tokio::test]
async fn concurrent_dispatches_tally_consistently() {
    let cb = Arc::new(graph_store_breaker(10, 30));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let cb = cb.clone();
            tokio::spawn(async move {
                let outcome = if i % 2 == 0 { Ok(i) } else { Err(graph_store_failure()) };
                cb.call(|| async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    outcome
                })
                .await
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.await;
    }

    let stats = cb.stats().await;
    assert_eq!(stats.total_calls, 20);
    assert_eq!(stats.successful_calls, 10);
    assert_eq!(stats.failed_calls, 10);
}
