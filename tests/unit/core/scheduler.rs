//! Unit tests for the refresh scheduler state machine

use std::sync::Arc;
use std::time::Duration;

use stockwatch::config::RefreshConfig;
use stockwatch::core::refresh::CycleError;
use stockwatch::core::scheduler::{
    RefreshError, RefreshSchedule, RefreshScheduler, RefreshState, TriggerOutcome,
};
use stockwatch::metrics::Metrics;
use stockwatch::models::indicators::MacdCrossover;
use stockwatch::services::error::SourceError;

use crate::support::{
    flat_then_drop, flat_then_rise, pipeline, FakeProvider, FakeSymbols, GatedProvider,
    SlowProvider,
};

fn slow(delay: Duration) -> Arc<SlowProvider> {
    Arc::new(SlowProvider {
        inner: FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()),
        delay,
        slow_symbol: "RELIANCE.NS".into(),
    })
}

fn hourly() -> RefreshSchedule {
    RefreshSchedule::every(Duration::from_secs(3600)).unwrap()
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_trigger_while_fetching_is_dropped() {
    let gated = Arc::new(GatedProvider::new(
        FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()),
    ));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let metrics = Arc::new(Metrics::new().unwrap());
    let scheduler = RefreshScheduler::new(
        pipeline(gated.clone(), symbols),
        hourly(),
        Some(metrics.clone()),
    );

    assert_eq!(scheduler.request_refresh(), TriggerOutcome::Accepted);
    gated.entered.notified().await;

    assert!(scheduler.is_fetching());
    assert_eq!(scheduler.status().state, RefreshState::Fetching);
    assert_eq!(scheduler.request_refresh(), TriggerOutcome::Dropped);
    assert!(matches!(
        scheduler.refresh_now().await,
        Err(RefreshError::InFlight)
    ));

    gated.open();
    wait_until(|| !scheduler.is_fetching()).await;

    let status = scheduler.status();
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.cycles_completed, 1);
    assert_eq!(scheduler.snapshot().cycle, 1);
    // dropped triggers were not queued
    assert_eq!(gated.inner.calls(), 1);
    assert_eq!(metrics.refresh_triggers_dropped_total.get(), 2);
}

#[tokio::test]
async fn test_total_failure_keeps_previous_snapshot() {
    let provider = Arc::new(FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(pipeline(provider.clone(), symbols), hourly(), None);

    let first = scheduler.refresh_now().await.unwrap();
    assert_eq!(first.cycle, 1);

    provider.fail("RELIANCE.NS", SourceError::Unavailable("connection refused".into()));
    let err = scheduler.refresh_now().await.unwrap_err();
    assert!(matches!(
        err,
        RefreshError::Cycle(CycleError::SourceUnreachable { .. })
    ));

    let status = scheduler.status();
    assert_eq!(status.state, RefreshState::Error);
    assert!(status.last_error.unwrap().contains("connection refused"));
    let visible = scheduler.snapshot();
    assert_eq!(visible.cycle, 1);
    assert!(visible.get("RELIANCE.NS").unwrap().is_ok());

    // next good cycle clears the error
    provider.set("RELIANCE.NS", &flat_then_rise());
    let recovered = scheduler.refresh_now().await.unwrap();
    assert_eq!(recovered.cycle, 2);
    let status = scheduler.status();
    assert_eq!(status.state, RefreshState::Idle);
    assert!(status.last_error.is_none());
    assert_eq!(status.cycles_completed, 2);
}

#[tokio::test]
async fn test_crossover_across_consecutive_cycles() {
    let provider = Arc::new(FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(pipeline(provider.clone(), symbols), hourly(), None);

    let crossover = |snap: &stockwatch::core::snapshot::Snapshot| {
        snap.get("RELIANCE.NS").unwrap().values().unwrap().macd_crossover
    };

    let first = scheduler.refresh_now().await.unwrap();
    assert_eq!(crossover(&first), MacdCrossover::Above);

    provider.set("RELIANCE.NS", &flat_then_drop());
    let second = scheduler.refresh_now().await.unwrap();
    assert_eq!(crossover(&second), MacdCrossover::Bearish);

    let third = scheduler.refresh_now().await.unwrap();
    assert_eq!(crossover(&third), MacdCrossover::Below);

    provider.set("RELIANCE.NS", &flat_then_rise());
    let fourth = scheduler.refresh_now().await.unwrap();
    assert_eq!(crossover(&fourth), MacdCrossover::Bullish);
}

#[tokio::test]
async fn test_start_runs_initial_cycle_and_pause_stops_timer() {
    let provider = Arc::new(FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(
        pipeline(provider.clone(), symbols),
        RefreshSchedule::every(Duration::from_millis(50)).unwrap(),
        None,
    );

    scheduler.start().await;
    assert!(scheduler.is_running().await);
    wait_until(|| scheduler.status().cycles_completed >= 2).await;

    scheduler.set_auto_refresh(false);
    assert!(!scheduler.status().auto_refresh);
    tokio::time::sleep(Duration::from_millis(120)).await;
    let calls = provider.calls();
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(provider.calls(), calls);

    // manual refresh still works while paused
    let before = scheduler.snapshot().cycle;
    let snap = scheduler.refresh_now().await.unwrap();
    assert_eq!(snap.cycle, before + 1);

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);
}

#[tokio::test]
async fn test_interval_period_does_not_stretch_with_cycle_time() {
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(
        pipeline(slow(Duration::from_millis(80)), symbols),
        RefreshSchedule::every(Duration::from_millis(100)).unwrap(),
        None,
    );

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(1_050)).await;
    scheduler.stop().await;

    // one cycle per 100ms tick, not one per 180ms
    let completed = scheduler.status().cycles_completed;
    assert!(completed >= 8, "only {} cycles completed", completed);
}

#[tokio::test]
async fn test_timer_tick_during_running_cycle_is_dropped() {
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let metrics = Arc::new(Metrics::new().unwrap());
    let scheduler = RefreshScheduler::new(
        pipeline(slow(Duration::from_millis(120)), symbols),
        RefreshSchedule::every(Duration::from_millis(50)).unwrap(),
        Some(metrics.clone()),
    );

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    scheduler.stop().await;

    assert!(metrics.refresh_triggers_dropped_total.get() >= 1);
    assert!(scheduler.status().cycles_completed >= 2);
}

#[tokio::test]
async fn test_cancelled_refresh_returns_to_idle() {
    let gated = Arc::new(GatedProvider::new(
        FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()),
    ));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(pipeline(gated.clone(), symbols), hourly(), None);

    let cancelled = tokio::time::timeout(Duration::from_millis(50), scheduler.refresh_now()).await;
    assert!(cancelled.is_err());
    assert!(!scheduler.is_fetching());
    assert_eq!(scheduler.status().state, RefreshState::Idle);
    assert_eq!(scheduler.snapshot().cycle, 0);

    gated.open();
    assert_eq!(scheduler.refresh_now().await.unwrap().cycle, 1);
}

#[tokio::test]
async fn test_stop_lets_running_cycle_finish() {
    let gated = Arc::new(GatedProvider::new(
        FakeProvider::new().with("RELIANCE.NS", &flat_then_rise()),
    ));
    let symbols = Arc::new(FakeSymbols::new(&["RELIANCE"]));
    let scheduler = RefreshScheduler::new(pipeline(gated.clone(), symbols), hourly(), None);

    scheduler.start().await;
    gated.entered.notified().await;
    scheduler.stop().await;
    assert!(!scheduler.is_running().await);
    assert_eq!(scheduler.status().state, RefreshState::Fetching);

    gated.open();
    wait_until(|| !scheduler.is_fetching()).await;
    let status = scheduler.status();
    assert_eq!(status.state, RefreshState::Idle);
    assert_eq!(status.cycles_completed, 1);
    assert_eq!(scheduler.snapshot().cycle, 1);
}

#[test]
fn test_schedule_from_config() {
    let interval = RefreshSchedule::from_config(&RefreshConfig {
        interval: Duration::from_secs(30),
        cron: None,
    })
    .unwrap();
    assert_eq!(interval.next_delay(), Duration::from_secs(30));

    let cron = RefreshSchedule::from_config(&RefreshConfig {
        interval: Duration::from_secs(30),
        cron: Some("*/5 * * * * *".into()),
    })
    .unwrap();
    assert!(matches!(cron, RefreshSchedule::Cron(_)));
    assert!(cron.next_delay() <= Duration::from_secs(5));
}

#[test]
fn test_schedule_rejects_bad_input() {
    assert!(RefreshSchedule::cron("every tuesday").is_err());
    assert!(RefreshSchedule::every(Duration::ZERO).is_err());
}
