#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use alerts::error::ErrorKind;
use alerts::rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiter};
use alerts::test_utils::clock::MockClock;
use alerts_config::shared::RateLimitConfig;
use alerts_telemetry::tracing::init_test_tracing;

fn limiter(max_requests: u32, window_ms: u64) -> (RateLimiter<MemoryRateLimitStore, MockClock>, MockClock) {
    let clock = MockClock::new();
    let limiter = RateLimiter::with_store(
        RateLimitConfig::new(max_requests, window_ms),
        MemoryRateLimitStore::new(),
        clock.clone(),
    )
    .unwrap();

    (limiter, clock)
}

#[tokio::test(flavor = "multi_thread")]
async fn first_request_is_always_accepted() {
    init_test_tracing();
    let (limiter, _clock) = limiter(1, 60_000);

    let result = limiter.check("203.0.113.7").await.unwrap();

    assert!(result.success);
    assert_eq!(result.remaining, 0);
    assert_eq!(result.limit, 1);
    assert_eq!(result.retry_after_ms, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejects_once_the_window_is_full_and_reports_retry_after() {
    init_test_tracing();
    let (limiter, clock) = limiter(3, 60_000);

    for expected_remaining in [2, 1, 0] {
        let result = limiter.check("client").await.unwrap();
        assert!(result.success);
        assert_eq!(result.remaining, expected_remaining);
        clock.advance_millis(1_000);
    }

    let rejected = limiter.check("client").await.unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.remaining, 0);
    // The first request was 3s ago, so it leaves the window in 57s.
    assert_eq!(rejected.retry_after_ms, Some(57_000));
    assert_eq!(rejected.retry_after_secs(), Some(57));
    assert_eq!(
        rejected.ensure_accepted().unwrap_err().kind(),
        ErrorKind::RateLimitExceeded
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_requests_are_not_recorded() {
    init_test_tracing();
    let (limiter, clock) = limiter(2, 10_000);

    assert!(limiter.check("client").await.unwrap().success);
    assert!(limiter.check("client").await.unwrap().success);

    // Hammering while blocked must not extend the block.
    for _ in 0..5 {
        clock.advance_millis(1_000);
        assert!(!limiter.check("client").await.unwrap().success);
    }

    clock.advance_millis(5_000);
    let result = limiter.check("client").await.unwrap();
    assert!(result.success);
    assert_eq!(result.remaining, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn window_slides_instead_of_resetting() {
    init_test_tracing();
    let (limiter, clock) = limiter(2, 10_000);

    assert!(limiter.check("client").await.unwrap().success);
    clock.advance_millis(6_000);
    assert!(limiter.check("client").await.unwrap().success);
    clock.advance_millis(3_000);
    assert!(!limiter.check("client").await.unwrap().success);

    // At exactly one window after the first request it is no longer counted.
    clock.advance_millis(1_000);
    let result = limiter.check("client").await.unwrap();
    assert!(result.success);

    // The second request is still inside the window.
    let rejected = limiter.check("client").await.unwrap();
    assert!(!rejected.success);
    assert_eq!(rejected.retry_after_ms, Some(6_000));
}

#[tokio::test(flavor = "multi_thread")]
async fn identifiers_are_limited_independently() {
    init_test_tracing();
    let (limiter, _clock) = limiter(1, 60_000);

    assert!(limiter.check("a").await.unwrap().success);
    assert!(!limiter.check("a").await.unwrap().success);
    assert!(limiter.check("b").await.unwrap().success);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_checks_never_exceed_the_limit() {
    init_test_tracing();
    let (limiter, _clock) = limiter(10, 60_000);
    let limiter = Arc::new(limiter);

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let limiter = limiter.clone();
        tasks.push(tokio::spawn(async move {
            limiter.check("shared").await.unwrap().success
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn sweep_evicts_only_idle_identifiers() {
    init_test_tracing();
    let (limiter, clock) = limiter(5, 10_000);

    limiter.check("idle").await.unwrap();
    clock.advance_millis(8_000);
    limiter.check("active").await.unwrap();
    clock.advance_millis(2_000);

    assert_eq!(limiter.sweep().await.unwrap(), 1);
    assert_eq!(limiter.store().len().await.unwrap(), 1);

    // An evicted identifier starts over with a full allowance.
    let result = limiter.check("idle").await.unwrap();
    assert!(result.success);
    assert_eq!(result.remaining, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_config_is_rejected() {
    init_test_tracing();

    let err = RateLimiter::new(RateLimitConfig::new(0, 1_000)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_runs_until_shutdown() {
    init_test_tracing();
    let clock = MockClock::new();
    let config = RateLimitConfig {
        sweep_interval_ms: 1_000,
        ..RateLimitConfig::new(5, 10_000)
    };
    let limiter =
        RateLimiter::with_store(config, MemoryRateLimitStore::new(), clock.clone()).unwrap();

    limiter.init();
    limiter.init();
    assert!(limiter.is_running());

    limiter.check("client").await.unwrap();
    clock.advance_millis(10_000);

    // Let the sweeper tick with the paused runtime clock.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(limiter.store().len().await.unwrap(), 0);

    limiter.shutdown().await;
    assert!(!limiter.is_running());

    // Checks keep working without the sweeper.
    assert!(limiter.check("client").await.unwrap().success);
    limiter.shutdown().await;
}
