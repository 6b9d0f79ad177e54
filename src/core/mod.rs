//! Core application primitives (refresh loop, snapshot handoff, HTTP surface)

pub mod bootstrap;
pub mod http;
pub mod refresh;
pub mod scheduler;
pub mod snapshot;

pub use http::{create_router, start_server, AppState};
pub use refresh::{CycleError, RefreshPipeline, RefreshSettings};
pub use scheduler::{
    RefreshError, RefreshSchedule, RefreshScheduler, RefreshState, SchedulerStatus, TriggerOutcome,
};
pub use snapshot::{Published, Snapshot};
