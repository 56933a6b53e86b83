// crates/jobs/src/types.rs
//! Types for the job engine.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use rcview_client::Command;
use rcview_types::{JobInfo, RefreshItem};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of a job's private update queue.
pub const JOB_UPDATE_CAPACITY: usize = 10;

/// Categories with these prefixes are UI bookkeeping and never counted as
/// running jobs.
const INTERNAL_PREFIXES: [&str; 2] = ["UI:", "_"];

pub fn is_internal_category(category: &str) -> bool {
    INTERNAL_PREFIXES.iter().any(|p| category.starts_with(p))
}

/// What the monitor does once it has delivered a terminal snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopPolicy {
    /// Remove the job from the queue and announce the final snapshot.
    Remove,
    /// Just exit; the caller attaches a refresh payload and stops the job.
    Hold,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between two `/job/status` polls of one job.
    pub poll_interval: Duration,
    /// How often a blocked caller drains a job's private queue.
    pub await_tick: Duration,
    /// Capacity of the global status queue.
    pub status_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            await_tick: Duration::from_secs(1),
            status_capacity: 100,
        }
    }
}

/// An asynchronous command about to be dispatched.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub category: String,
    pub description: String,
    pub endpoint: String,
    pub command: Command,
    pub group: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl JobRequest {
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        endpoint: impl Into<String>,
        command: Command,
    ) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            endpoint: endpoint.into(),
            command,
            group: None,
            cancel: None,
        }
    }

    /// Tag the job with an existing group instead of its own `job/<id>`.
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Share a cancellation token, e.g. the one of a parent batch.
    pub fn cancel_with(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A unit of asynchronous work tracked by the engine.
///
/// Shared as `Arc<Job>` between the queue, its monitor and whoever awaits it.
pub struct Job {
    id: i64,
    category: String,
    description: String,
    group: String,
    cancel: CancellationToken,
    updates_tx: Mutex<Option<mpsc::Sender<JobInfo>>>,
    updates_rx: tokio::sync::Mutex<mpsc::Receiver<JobInfo>>,
    refresh: OnceLock<Vec<RefreshItem>>,
}

impl Job {
    pub fn new(category: impl Into<String>, description: impl Into<String>, id: i64) -> Self {
        let (tx, rx) = mpsc::channel(JOB_UPDATE_CAPACITY);
        Self {
            id,
            category: category.into(),
            description: description.into(),
            group: format!("job/{id}"),
            cancel: CancellationToken::new(),
            updates_tx: Mutex::new(Some(tx)),
            updates_rx: tokio::sync::Mutex::new(rx),
            refresh: OnceLock::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn is_internal(&self) -> bool {
        is_internal_category(&self.category)
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Attach the refresh payload. Only the first call wins.
    pub fn attach_refresh(&self, items: Vec<RefreshItem>) -> bool {
        self.refresh.set(items).is_ok()
    }

    pub fn refresh_items(&self) -> Vec<RefreshItem> {
        self.refresh.get().cloned().unwrap_or_default()
    }

    /// A snapshot carrying only this job's identity.
    pub fn blank_info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            category: self.category.clone(),
            description: self.description.clone(),
            group: self.group.clone(),
            ..Default::default()
        }
    }

    /// The snapshot synthesized when the job's token fires.
    pub fn cancelled_info(&self) -> JobInfo {
        JobInfo {
            error: format!("{} cancelled", self.description),
            cancelled: true,
            ..self.blank_info()
        }
    }

    /// Non-blocking push into the private queue. `false` when the queue is
    /// full or already closed.
    pub fn publish(&self, info: JobInfo) -> bool {
        match self.updates_tx.lock() {
            Ok(tx) => tx.as_ref().is_some_and(|tx| tx.try_send(info).is_ok()),
            Err(e) => {
                tracing::error!("Mutex poisoned publishing job update: {e}");
                false
            }
        }
    }

    /// Drop the sending side; waiters see the end of the queue after
    /// draining what was delivered.
    pub fn close_updates(&self) {
        match self.updates_tx.lock() {
            Ok(mut tx) => {
                tx.take();
            }
            Err(e) => tracing::error!("Mutex poisoned closing job updates: {e}"),
        }
    }

    /// Next snapshot from the private queue, `None` once it is closed and drained.
    pub async fn next_update(&self) -> Option<JobInfo> {
        self.updates_rx.lock().await.recv().await
    }

    pub(crate) async fn lock_updates(
        &self,
    ) -> tokio::sync::MutexGuard<'_, mpsc::Receiver<JobInfo>> {
        self.updates_rx.lock().await
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("group", &self.group)
            .field("description", &self.description)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
