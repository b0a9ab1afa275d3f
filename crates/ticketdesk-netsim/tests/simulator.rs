//! Behavioural tests for `NetworkSimulator::wrap`.
//!
//! Paused Tokio time makes the simulated sleeps instant while still letting
//! us measure how much virtual time each call consumed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ticketdesk_netsim::{
    ConnectivityFlag, DelayRange, FaultAware, FaultKind, NetworkConfig, NetworkFault,
    NetworkSimulator, SeededRandom, SequenceRandom,
};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

/// An application error enum that opts into fault handling.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Network(#[from] NetworkFault),
}

impl FaultAware for AppError {
    fn as_network_fault(&self) -> Option<&NetworkFault> {
        match self {
            AppError::Network(fault) => Some(fault),
            AppError::Validation(_) => None,
        }
    }
}

fn config(error_rate: f64, timeout_rate: f64, delay: DelayRange) -> NetworkConfig {
    NetworkConfig {
        enabled: true,
        error_rate,
        delay_range: delay,
        timeout_rate,
        timeout_delay_ms: 10_000,
    }
}

fn counting_op(
    counter: &Arc<AtomicUsize>,
) -> impl FnOnce() -> std::future::Ready<Result<u32, AppError>> + use<> {
    let counter = counter.clone();
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(7))
    }
}

/// Virtual timers fire on millisecond granularity.
fn assert_close(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(1),
        "elapsed {elapsed:?}, expected {expected:?}"
    );
}

fn fault_of(err: AppError) -> NetworkFault {
    match err {
        AppError::Network(fault) => fault,
        other => panic!("expected a network fault, got {other}"),
    }
}

// =========================================================================
// Rates
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wrap_zero_rates_always_succeeds() {
    let sim = NetworkSimulator::new(config(0.0, 0.0, DelayRange::new(0, 50)))
        .with_random(SeededRandom::new(7));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..1000 {
        let value = sim.wrap("ping", counting_op(&calls)).await.unwrap();
        assert_eq!(value, 7);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1000);
    assert_eq!(sim.stats().injected_faults, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_full_error_rate_never_invokes_operation() {
    let sim = NetworkSimulator::new(config(1.0, 0.0, DelayRange::new(0, 0)))
        .with_random(SeededRandom::new(11));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..200 {
        let fault = fault_of(sim.wrap("ping", counting_op(&calls)).await.unwrap_err());
        assert!(FaultKind::INJECTABLE.contains(&fault.kind));
        assert_eq!(fault.label, "ping");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(sim.stats().injected_faults, 200);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_delay_stays_within_range() {
    let sim = NetworkSimulator::new(config(0.0, 0.0, DelayRange::new(300, 1500)))
        .with_random(SeededRandom::new(3));
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..50 {
        let started = Instant::now();
        sim.wrap("ping", counting_op(&calls)).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(1501), "{elapsed:?}");
    }
}

// =========================================================================
// Scripted branches
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wrap_scripted_delay_value() {
    // delay sample 0.5 of 100..300 → 200 ms; timeout and error draws miss.
    let sim = NetworkSimulator::new(config(0.5, 0.5, DelayRange::new(100, 300)))
        .with_random(SequenceRandom::new([0.5, 0.9, 0.9]));
    let calls = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    sim.wrap("ping", counting_op(&calls)).await.unwrap();

    assert_close(started.elapsed(), Duration::from_millis(200));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_scripted_timeout_waits_then_fails() {
    let sim = NetworkSimulator::new(config(0.0, 0.5, DelayRange::new(0, 0)))
        .with_random(SequenceRandom::new([0.0, 0.1]));
    let calls = Arc::new(AtomicUsize::new(0));

    let started = Instant::now();
    let fault = fault_of(sim.wrap("tickets.list", counting_op(&calls)).await.unwrap_err());

    assert_eq!(fault.kind, FaultKind::Timeout);
    assert_eq!(fault.label, "tickets.list");
    assert_close(started.elapsed(), Duration::from_secs(10));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_scripted_fault_kind() {
    // delay, timeout miss, error hit, kind sample 6.5/8 → RateLimited.
    let sim = NetworkSimulator::new(config(0.5, 0.0, DelayRange::new(0, 0)))
        .with_random(SequenceRandom::new([0.0, 0.9, 0.1, 6.5 / 8.0]));
    let calls = Arc::new(AtomicUsize::new(0));

    let fault = fault_of(sim.wrap("login", counting_op(&calls)).await.unwrap_err());

    assert_eq!(fault.kind, FaultKind::RateLimited);
    assert_eq!(fault.kind.status(), Some(429));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Pass-through and wrapping
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wrap_offline_fails_without_invoking() {
    let online = ConnectivityFlag::new(false);
    let sim = NetworkSimulator::new(NetworkConfig::reliable()).with_connectivity(online.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let fault = fault_of(sim.wrap("ping", counting_op(&calls)).await.unwrap_err());
    assert_eq!(fault.kind, FaultKind::Offline);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    online.set_online(true);
    assert_eq!(sim.wrap("ping", counting_op(&calls)).await.unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_non_fault_error_becomes_unknown() {
    let sim = NetworkSimulator::new(NetworkConfig::reliable());

    let err = sim
        .wrap("tickets.create", || async {
            Err::<(), _>(AppError::Validation("title is empty".into()))
        })
        .await
        .unwrap_err();

    let fault = fault_of(err);
    assert_eq!(fault.kind, FaultKind::UnknownNetworkError);
    assert_eq!(fault.message, "validation failed: title is empty");
}

#[tokio::test(start_paused = true)]
async fn test_wrap_fault_error_passes_through_unchanged() {
    let sim = NetworkSimulator::new(NetworkConfig::reliable());
    let original = NetworkFault::with_message(FaultKind::Forbidden, "inner", "nope");

    let err = sim
        .wrap("outer", || {
            let original = original.clone();
            async move { Err::<(), AppError>(original.into()) }
        })
        .await
        .unwrap_err();

    assert_eq!(fault_of(err), original);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_disabled_is_transparent() {
    let sim = NetworkSimulator::new(config(1.0, 1.0, DelayRange::new(5000, 5000)));
    sim.set_enabled(false);

    let started = Instant::now();
    let err = sim
        .wrap("ping", || async {
            Err::<(), _>(AppError::Validation("raw".into()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(msg) if msg == "raw"));
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(sim.stats().calls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wrap_reads_config_changes_between_calls() {
    let sim = NetworkSimulator::new(NetworkConfig::reliable());
    let panel = sim.clone();
    let calls = Arc::new(AtomicUsize::new(0));

    sim.wrap("ping", counting_op(&calls)).await.unwrap();
    panel.update_config(ticketdesk_netsim::NetworkConfigPatch {
        error_rate: Some(1.0),
        ..Default::default()
    });

    assert!(sim.wrap("ping", counting_op(&calls)).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
