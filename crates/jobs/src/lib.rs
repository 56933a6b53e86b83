// crates/jobs/src/lib.rs
//! Asynchronous job orchestration for the remote-control daemon.
//!
//! A [`JobEngine`] dispatches daemon-side async jobs, tracks them in a
//! [`JobQueue`], polls each one from its own monitor task and publishes
//! every status snapshot. Batches chain per-item jobs under one parent.
//! [`StatusFanout`] and [`PaneRefreshDistributor`] carry snapshots to the
//! indicator and to every pane, which reconcile their listings in place.

pub mod batch;
pub mod fanout;
mod monitor;
pub mod pane;
pub mod queue;
pub mod runner;
pub mod types;

pub use batch::{BatchHandle, BatchKind, BatchOutcome};
pub use fanout::{FanoutFeeds, Notice, NoticeKind, StatusFanout, FANOUT_CAPACITY};
pub use pane::{sort_items, watch_pane, PaneListing, PaneRefreshDistributor, SortMode, PANE_QUEUE_CAPACITY};
pub use queue::JobQueue;
pub use runner::JobEngine;
pub use types::{is_internal_category, EngineConfig, Job, JobRequest, StopPolicy, JOB_UPDATE_CAPACITY};
