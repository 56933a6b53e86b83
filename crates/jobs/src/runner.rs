// crates/jobs/src/runner.rs
//! The job engine: dispatch, registration, monitoring and teardown of
//! asynchronous daemon jobs.

use std::sync::Arc;

use rcview_client::{command, Command, Dispatch, RcError, RcResponse};
use rcview_types::JobInfo;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::monitor;
use crate::queue::JobQueue;
use crate::types::{EngineConfig, Job, JobRequest, StopPolicy};

struct Inner {
    dispatcher: Arc<dyn Dispatch>,
    queue: JobQueue,
    status_tx: mpsc::Sender<JobInfo>,
    config: EngineConfig,
}

/// Central engine shared by every component that starts daemon jobs.
///
/// Cheap to clone. Every snapshot produced by a monitor or a stop is pushed
/// (drop-if-full) into the status queue returned by [`JobEngine::new`].
#[derive(Clone)]
pub struct JobEngine {
    inner: Arc<Inner>,
}

impl JobEngine {
    pub fn new(dispatcher: Arc<dyn Dispatch>, config: EngineConfig) -> (Self, mpsc::Receiver<JobInfo>) {
        let (status_tx, status_rx) = mpsc::channel(config.status_capacity.max(1));
        let engine = Self {
            inner: Arc::new(Inner {
                dispatcher,
                queue: JobQueue::new(),
                status_tx,
                config,
            }),
        };
        (engine, status_rx)
    }

    pub fn queue(&self) -> &JobQueue {
        &self.inner.queue
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Synchronous call straight through the dispatcher.
    pub async fn send(
        &self,
        command: &Command,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<RcResponse, RcError> {
        self.inner.dispatcher.send(command, endpoint, cancel).await
    }

    /// Start `request` as a daemon-side async job and build its [`Job`].
    ///
    /// The job is neither registered nor monitored.
    pub async fn dispatch(&self, request: JobRequest) -> Result<Arc<Job>, RcError> {
        let JobRequest {
            category,
            description,
            endpoint,
            mut command,
            group,
            cancel,
        } = request;

        command.insert("_async".to_string(), Value::Bool(true));
        if let Some(group) = &group {
            command.insert("_group".to_string(), Value::String(group.clone()));
        }

        let cancel = cancel.unwrap_or_default();
        let reply = self.send(&command, &endpoint, &cancel).await?.json()?;

        if let Some(error) = reply.get("error").and_then(Value::as_str) {
            return Err(RcError::Protocol(error.to_string()));
        }
        let id = reply
            .get("jobid")
            .and_then(Value::as_i64)
            .ok_or_else(|| RcError::Protocol(format!("{endpoint}: reply carried no job id")))?;

        tracing::debug!(%category, id, %endpoint, "dispatched async job");

        let mut job = Job::new(category, description, id).with_cancel(cancel);
        if let Some(group) = group {
            job = job.with_group(group);
        }
        Ok(Arc::new(job))
    }

    /// Dispatch, register and monitor a job that is removed once it finishes.
    pub async fn submit(&self, request: JobRequest) -> Result<Arc<Job>, RcError> {
        let job = self.dispatch(request).await?;
        self.register(&job);
        self.monitor(Arc::clone(&job), StopPolicy::Remove);
        Ok(job)
    }

    pub fn register(&self, job: &Arc<Job>) -> bool {
        self.inner.queue.register(Arc::clone(job))
    }

    /// Spawn the polling task for `job`.
    pub fn monitor(&self, job: Arc<Job>, policy: StopPolicy) -> JoinHandle<()> {
        tokio::spawn(monitor::run(self.clone(), job, policy))
    }

    /// Block until the job's first terminal snapshot.
    ///
    /// Finished without error is `Ok`; a daemon error is [`RcError::Remote`],
    /// a cancellation [`RcError::Cancelled`]. A queue that closes before any
    /// terminal snapshot arrived is a [`RcError::Protocol`] failure.
    pub async fn await_reply(&self, job: &Job) -> Result<JobInfo, RcError> {
        let mut updates = job.lock_updates().await;
        let mut tick = tokio::time::interval(self.inner.config.await_tick);

        loop {
            tick.tick().await;
            loop {
                match updates.try_recv() {
                    Ok(info) if info.cancelled => return Err(RcError::Cancelled(info.error)),
                    Ok(info) if info.is_error() => return Err(RcError::Remote(info.error)),
                    Ok(info) if info.finished => return Ok(info),
                    Ok(_) => {}
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        return Err(RcError::Protocol(format!(
                            "{}: job ended without a result",
                            job.description()
                        )))
                    }
                }
            }
        }
    }

    /// Remove `job` from the queue and announce its final snapshot.
    ///
    /// Unless `force`, the daemon is first asked to stop the remote job
    /// (fire-and-forget). Safe to call for a job that was already removed.
    pub fn stop_job(&self, job: &Job, error: &str, force: bool) {
        if !force {
            let engine = self.clone();
            let stop = command(json!({ "jobid": job.id() }));
            let id = job.id();
            tokio::spawn(async move {
                if let Err(e) = engine.send(&stop, "/job/stop", &CancellationToken::new()).await {
                    tracing::debug!(id, error = %e, "job stop request failed");
                }
            });
        }

        let removed = self.inner.queue.remove(job);
        if removed {
            tracing::debug!(category = %job.category(), id = job.id(), "job removed");
        }

        let info = JobInfo {
            finished: true,
            success: error.is_empty(),
            error: error.to_string(),
            cancelled: !error.is_empty() && job.is_cancelled(),
            job_count: self.inner.queue.running_count(),
            refresh: job.refresh_items(),
            ..job.blank_info()
        };
        self.broadcast(info);
    }

    /// Cancel every job of `category`.
    pub fn cancel_category(&self, category: &str) -> usize {
        let n = self.inner.queue.cancel_category(category);
        tracing::info!(%category, cancelled = n, "category cancelled");
        n
    }

    /// Cancel every job sharing `group`, e.g. one batch and its sub-jobs.
    pub fn cancel_group(&self, group: &str) -> usize {
        let n = self.inner.queue.cancel_group(group);
        tracing::info!(%group, cancelled = n, "group cancelled");
        n
    }

    /// Non-blocking push into the global status queue.
    pub(crate) fn broadcast(&self, info: JobInfo) -> bool {
        match self.inner.status_tx.try_send(info) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(info)) => {
                tracing::trace!(category = %info.category, id = info.id, "status queue full, dropping snapshot");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
