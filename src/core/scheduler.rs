//! Timer- and request-driven refresh scheduler
//!
//! At most one cycle runs at a time. Whoever claims the in-flight flag runs
//! the cycle; any trigger that finds it taken is dropped, never queued.

use chrono::{DateTime, Utc};
use cron::Schedule;
use parking_lot::Mutex;
use serde::Serialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::RefreshConfig;
use crate::core::refresh::{CycleError, RefreshPipeline};
use crate::core::snapshot::{Published, Snapshot};
use crate::metrics::Metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Fetching,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: RefreshState,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub auto_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerOutcome {
    Accepted,
    /// A cycle was already in flight
    Dropped,
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh is already in flight")]
    InFlight,
    #[error(transparent)]
    Cycle(#[from] CycleError),
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("refresh interval must be positive")]
    ZeroInterval,
}

/// When timer triggers fire
#[derive(Debug, Clone)]
pub enum RefreshSchedule {
    Interval(Duration),
    Cron(Box<Schedule>),
}

impl RefreshSchedule {
    pub fn every(interval: Duration) -> Result<Self, ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(RefreshSchedule::Interval(interval))
    }

    /// Cron format: second minute hour day month weekday
    pub fn cron(expr: &str) -> Result<Self, ScheduleError> {
        let schedule = Schedule::from_str(expr).map_err(|e| ScheduleError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(RefreshSchedule::Cron(Box::new(schedule)))
    }

    pub fn from_config(config: &RefreshConfig) -> Result<Self, ScheduleError> {
        match &config.cron {
            Some(expr) => Self::cron(expr),
            None => Self::every(config.interval),
        }
    }

    /// Time until the next timer trigger
    pub fn next_delay(&self) -> Duration {
        match self {
            RefreshSchedule::Interval(interval) => *interval,
            RefreshSchedule::Cron(schedule) => {
                let now = Utc::now();
                match schedule.after(&now).next() {
                    Some(next) => (next - now).to_std().unwrap_or_default(),
                    // No more scheduled times, check again later
                    None => Duration::from_secs(60),
                }
            }
        }
    }
}

struct StatusInner {
    state: RefreshState,
    last_error: Option<String>,
    last_attempt: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    cycles_completed: u64,
}

struct Shared {
    pipeline: RefreshPipeline,
    snapshot: Published<Snapshot>,
    status: Mutex<StatusInner>,
    in_flight: AtomicBool,
    auto_refresh: AtomicBool,
    metrics: Option<Arc<Metrics>>,
}

/// Clears the in-flight flag when the claimed cycle ends, even on panic or
/// cancellation. A cycle that never reached its outcome leaves `Idle` behind.
struct InFlightGuard(Arc<Shared>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        {
            let mut status = self.0.status.lock();
            if status.state == RefreshState::Fetching {
                status.state = RefreshState::Idle;
            }
        }
        self.0.in_flight.store(false, Ordering::Release);
    }
}

impl Shared {
    fn try_claim(self: &Arc<Self>) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(self.clone()))
    }

    fn record_dropped(&self, trigger: &str) {
        debug!(trigger, "Refresh already in flight, trigger dropped");
        if let Some(m) = &self.metrics {
            m.refresh_triggers_dropped_total.inc();
        }
    }

    /// Claim and run a cycle on its own task so the trigger source never waits.
    fn trigger(self: &Arc<Self>, trigger: &str) -> TriggerOutcome {
        let Some(claim) = self.try_claim() else {
            self.record_dropped(trigger);
            return TriggerOutcome::Dropped;
        };
        let shared = self.clone();
        tokio::spawn(async move {
            let _ = shared.run_cycle(claim).await;
        });
        TriggerOutcome::Accepted
    }

    fn timer_tick(self: &Arc<Self>) {
        if !self.auto_refresh.load(Ordering::Acquire) {
            debug!("Auto-refresh paused, skipping timer trigger");
            return;
        }
        self.trigger("timer");
    }

    /// Run one cycle; the caller holds the in-flight claim.
    async fn run_cycle(&self, _claim: InFlightGuard) -> Result<Arc<Snapshot>, CycleError> {
        {
            let mut status = self.status.lock();
            status.state = RefreshState::Fetching;
            status.last_attempt = Some(Utc::now());
        }
        let started = Instant::now();

        let previous = self.snapshot.load();
        let outcome = self.pipeline.run_cycle(&previous).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(next) => {
                let rows = next.results.len();
                let cycle = next.cycle;
                self.snapshot.publish(next);
                let published = self.snapshot.load();
                {
                    let mut status = self.status.lock();
                    status.state = RefreshState::Idle;
                    status.last_error = None;
                    status.last_success = Some(published.generated_at);
                    status.cycles_completed += 1;
                }
                if let Some(m) = &self.metrics {
                    m.refresh_cycles_total.with_label_values(&["success"]).inc();
                    m.refresh_duration_seconds.observe(elapsed.as_secs_f64());
                    m.snapshot_symbols.set(rows as i64);
                }
                info!(cycle, rows, elapsed_ms = elapsed.as_millis() as u64, "Snapshot published");
                Ok(published)
            }
            Err(e) => {
                {
                    let mut status = self.status.lock();
                    status.state = RefreshState::Error;
                    status.last_error = Some(e.to_string());
                }
                if let Some(m) = &self.metrics {
                    m.refresh_cycles_total.with_label_values(&["failure"]).inc();
                    m.refresh_duration_seconds.observe(elapsed.as_secs_f64());
                }
                error!(error = %e, "Refresh cycle failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

/// Owns the refresh loop and the published snapshot
pub struct RefreshScheduler {
    shared: Arc<Shared>,
    schedule: RefreshSchedule,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RefreshScheduler {
    pub fn new(
        pipeline: RefreshPipeline,
        schedule: RefreshSchedule,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pipeline,
                snapshot: Published::new(Snapshot::empty()),
                status: Mutex::new(StatusInner {
                    state: RefreshState::Idle,
                    last_error: None,
                    last_attempt: None,
                    last_success: None,
                    cycles_completed: 0,
                }),
                in_flight: AtomicBool::new(false),
                auto_refresh: AtomicBool::new(true),
                metrics,
            }),
            schedule,
            handle: Arc::new(RwLock::new(None)),
        }
    }

    pub fn pipeline(&self) -> &RefreshPipeline {
        &self.shared.pipeline
    }

    pub fn schedule(&self) -> &RefreshSchedule {
        &self.schedule
    }

    /// Start the timer loop; the first cycle runs immediately.
    ///
    /// Interval ticks keep a fixed period measured from start, not from the
    /// end of the previous cycle. A tick that lands on a running cycle is
    /// dropped.
    pub async fn start(&self) {
        let mut handle = self.handle.write().await;
        if handle.is_some() {
            debug!("RefreshScheduler: already running");
            return;
        }

        let shared = self.shared.clone();
        let schedule = self.schedule.clone();
        *handle = Some(tokio::spawn(async move {
            info!(schedule = ?schedule, "RefreshScheduler: started");
            shared.trigger("startup");

            match schedule {
                RefreshSchedule::Interval(period) => {
                    let mut ticker = time::interval_at(time::Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        ticker.tick().await;
                        shared.timer_tick();
                    }
                }
                RefreshSchedule::Cron(_) => loop {
                    time::sleep(schedule.next_delay()).await;
                    shared.timer_tick();
                },
            }
        }));
    }

    /// Stop the timer loop. A cycle already running finishes on its own task.
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("RefreshScheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.is_some()
    }

    /// Manual trigger; the cycle runs in the background.
    pub fn request_refresh(&self) -> TriggerOutcome {
        self.shared.trigger("manual")
    }

    /// Run one cycle on the caller's task and wait for it
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let Some(claim) = self.shared.try_claim() else {
            self.shared.record_dropped("manual");
            return Err(RefreshError::InFlight);
        };
        Ok(self.shared.run_cycle(claim).await?)
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshot.load()
    }

    pub fn status(&self) -> SchedulerStatus {
        let status = self.shared.status.lock();
        SchedulerStatus {
            state: status.state,
            last_error: status.last_error.clone(),
            last_attempt: status.last_attempt,
            last_success: status.last_success,
            cycles_completed: status.cycles_completed,
            auto_refresh: self.auto_refresh(),
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Pause or resume timer triggers; manual requests still run.
    pub fn set_auto_refresh(&self, enabled: bool) {
        self.shared.auto_refresh.store(enabled, Ordering::Release);
        info!(enabled, "Auto-refresh toggled");
    }

    pub fn auto_refresh(&self) -> bool {
        self.shared.auto_refresh.load(Ordering::Acquire)
    }
}
