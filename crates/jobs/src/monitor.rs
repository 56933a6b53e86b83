// crates/jobs/src/monitor.rs
//! Per-job polling task.

use std::sync::Arc;

use rcview_client::{command, Command, RcError};
use rcview_types::{JobInfo, JobStatusReply, TransferStats};
use serde_json::json;
use tokio::time::MissedTickBehavior;

use crate::runner::JobEngine;
use crate::types::{Job, StopPolicy};

/// Poll `job` until a terminal snapshot reaches its private queue.
///
/// Every snapshot also goes to the engine's status queue. Once the job's
/// token fires no more polls are made; the cancellation snapshot is offered
/// again on each tick until the private queue accepts it.
pub(crate) async fn run(engine: JobEngine, job: Arc<Job>, policy: StopPolicy) {
    let query = command(json!({ "jobid": job.id(), "group": job.group() }));
    let mut ticker = tokio::time::interval(engine.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    tracing::debug!(category = %job.category(), id = job.id(), group = %job.group(), "monitor started");

    let mut cancelled: Option<JobInfo> = None;
    loop {
        let info = match &cancelled {
            Some(info) => info.clone(),
            None => poll(&engine, &job, &query).await,
        };
        let terminal = info.is_terminal();
        let delivered = job.publish(info.clone());
        if info.cancelled && cancelled.is_none() {
            cancelled = Some(info.clone());
        }
        engine.broadcast(info.clone());

        if delivered && terminal {
            if policy == StopPolicy::Remove {
                engine.stop_job(&job, &info.error, false);
            }
            break;
        }

        if cancelled.is_some() {
            ticker.tick().await;
            continue;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            _ = job.cancel_token().cancelled() => {
                cancelled = Some(with_count(&engine, job.cancelled_info()));
            }
        }
    }

    job.close_updates();
    tracing::debug!(category = %job.category(), id = job.id(), "monitor stopped");
}

/// One round of `/job/status` plus `/core/stats`, folded into a snapshot.
async fn poll(engine: &JobEngine, job: &Job, query: &Command) -> JobInfo {
    let mut info = job.blank_info();

    match fetch(engine, job, query, &mut info).await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => return with_count(engine, job.cancelled_info()),
        Err(e) => {
            tracing::warn!(category = %job.category(), id = job.id(), error = %e, "job poll failed");
            info.error = e.to_string();
        }
    }

    with_count(engine, info)
}

async fn fetch(engine: &JobEngine, job: &Job, query: &Command, info: &mut JobInfo) -> Result<(), RcError> {
    let token = job.cancel_token();

    let status: JobStatusReply = engine.send(query, "/job/status", token).await?.decode()?;
    info.apply_status(status);

    let stats: TransferStats = engine.send(query, "/core/stats", token).await?.decode()?;
    if let Some(transfer) = stats.for_group(job.group()) {
        info.current_transfer = transfer.clone();
    }
    Ok(())
}

fn with_count(engine: &JobEngine, mut info: JobInfo) -> JobInfo {
    info.job_count = engine.queue().running_count();
    info
}
