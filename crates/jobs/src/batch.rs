// crates/jobs/src/batch.rs
//! Sequential multi-item copy, move and delete.
//!
//! A batch is a parent job (never monitored) whose group and token are
//! shared by one sub-job per item. Items run strictly one after another; the
//! first failure or a cancellation ends the batch.

use std::sync::Arc;

use rcview_client::{command, Command};
use rcview_types::{base_name, join_remote, ListItem, RefreshItem};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::runner::JobEngine;
use crate::types::{Job, JobRequest, StopPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Copy,
    Move,
    Delete,
}

impl BatchKind {
    /// Category of the parent job.
    pub fn category(self) -> &'static str {
        match self {
            BatchKind::Copy => "Copy",
            BatchKind::Move => "Move",
            BatchKind::Delete => "Delete",
        }
    }

    /// Internal category of the per-item jobs.
    pub fn item_category(self) -> String {
        format!("_{}", self.category())
    }

    pub fn verb(self) -> &'static str {
        match self {
            BatchKind::Copy => "Copying",
            BatchKind::Move => "Moving",
            BatchKind::Delete => "Deleting",
        }
    }

    fn endpoint(self, is_dir: bool) -> &'static str {
        match (self, is_dir) {
            (BatchKind::Copy, true) => "/sync/copy",
            (BatchKind::Copy, false) => "/operations/copyfile",
            (BatchKind::Move, true) => "/sync/move",
            (BatchKind::Move, false) => "/operations/movefile",
            (BatchKind::Delete, true) => "/operations/purge",
            (BatchKind::Delete, false) => "/operations/deletefile",
        }
    }
}

/// How a batch ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items whose sub-job finished without error.
    pub completed: usize,
    /// Items for which a sub-job was dispatched.
    pub attempted: usize,
    pub error: Option<String>,
}

pub struct BatchHandle {
    pub parent: Arc<Job>,
    pub task: JoinHandle<BatchOutcome>,
}

#[derive(Deserialize)]
struct StatReply {
    item: Option<ListItem>,
}

impl JobEngine {
    /// Start a batch over `items`. `None` when there is nothing to do.
    ///
    /// `dst_fs` and `dst_path` are ignored for [`BatchKind::Delete`].
    pub fn run_batch(
        &self,
        kind: BatchKind,
        items: Vec<ListItem>,
        dst_fs: &str,
        dst_path: &str,
    ) -> Option<BatchHandle> {
        if items.is_empty() {
            return None;
        }

        let category = kind.category();
        let parent = self.queue().register_next(category, |id| {
            Job::new(category, kind.verb(), id).with_group(format!("{category}/{id}"))
        })?;

        tracing::info!(batch = %parent.group(), items = items.len(), "batch started");

        let engine = self.clone();
        let batch = Batch {
            kind,
            parent: Arc::clone(&parent),
            dst_fs: dst_fs.to_string(),
            dst_path: dst_path.to_string(),
        };
        let task = tokio::spawn(async move { batch.run(&engine, items).await });

        Some(BatchHandle { parent, task })
    }
}

struct Batch {
    kind: BatchKind,
    parent: Arc<Job>,
    dst_fs: String,
    dst_path: String,
}

impl Batch {
    async fn run(self, engine: &JobEngine, items: Vec<ListItem>) -> BatchOutcome {
        let total = items.len();
        let mut outcome = BatchOutcome::default();

        for (i, item) in items.iter().enumerate() {
            if self.parent.is_cancelled() {
                outcome.error = Some(format!("{} cancelled", self.parent.description()));
                break;
            }

            outcome.attempted += 1;
            match self.run_item(engine, item, i + 1, total).await {
                Ok(()) => outcome.completed += 1,
                Err(error) => {
                    tracing::warn!(batch = %self.parent.group(), item = %item.path, %error, "batch item failed");
                    outcome.error = Some(error);
                    break;
                }
            }
        }

        let error = outcome.error.clone().unwrap_or_default();
        engine.stop_job(&self.parent, &error, true);

        tracing::info!(
            batch = %self.parent.group(),
            completed = outcome.completed,
            attempted = outcome.attempted,
            failed = outcome.error.is_some(),
            "batch finished"
        );
        outcome
    }

    async fn run_item(&self, engine: &JobEngine, item: &ListItem, index: usize, total: usize) -> Result<(), String> {
        let request = JobRequest::new(
            self.kind.item_category(),
            self.describe(item, index, total),
            self.kind.endpoint(item.is_dir),
            self.command_for(item),
        )
        .in_group(self.parent.group())
        .cancel_with(self.parent.cancel_token().clone());

        let job = engine.dispatch(request).await.map_err(|e| e.to_string())?;
        engine.register(&job);
        engine.monitor(Arc::clone(&job), StopPolicy::Hold);

        let info = match engine.await_reply(&job).await {
            Ok(info) => info,
            Err(e) => {
                let error = e.to_string();
                engine.stop_job(&job, &error, false);
                return Err(error);
            }
        };

        job.attach_refresh(self.refresh_for(engine, item).await);
        engine.stop_job(&job, &info.error, false);
        Ok(())
    }

    fn describe(&self, item: &ListItem, index: usize, total: usize) -> String {
        let name = base_name(&item.path);
        match self.kind {
            BatchKind::Delete => format!("({index}/{total}) {} {name}", self.kind.verb()),
            _ => format!(
                "({index}/{total}) {} {name} -> {}{}",
                self.kind.verb(),
                self.dst_fs,
                self.dst_path
            ),
        }
    }

    fn destination(&self, item: &ListItem) -> String {
        join_remote(&self.dst_path, &item.name)
    }

    fn command_for(&self, item: &ListItem) -> Command {
        match (self.kind, item.is_dir) {
            (BatchKind::Delete, _) => command(json!({ "fs": item.fs, "remote": item.path })),
            (_, true) => command(json!({
                "srcFs": format!("{}{}", item.fs, item.path),
                "dstFs": format!("{}{}", self.dst_fs, self.destination(item)),
            })),
            (_, false) => command(json!({
                "srcFs": item.fs,
                "srcRemote": item.path,
                "dstFs": self.dst_fs,
                "dstRemote": self.destination(item),
            })),
        }
    }

    async fn refresh_for(&self, engine: &JobEngine, item: &ListItem) -> Vec<RefreshItem> {
        let mut refresh = Vec::new();

        if matches!(self.kind, BatchKind::Delete | BatchKind::Move) {
            refresh.push(RefreshItem::remove(item.clone()));
        }

        if matches!(self.kind, BatchKind::Copy | BatchKind::Move) {
            let mut dest = item.clone();
            dest.fs = self.dst_fs.clone();
            dest.path = self.destination(item);
            if !dest.has_known_size() {
                self.resolve_size(engine, &mut dest).await;
            }
            refresh.push(RefreshItem::add(dest));
        }

        refresh
    }

    async fn resolve_size(&self, engine: &JobEngine, dest: &mut ListItem) {
        let query = command(json!({ "fs": dest.fs, "remote": dest.path }));
        let reply = engine
            .send(&query, "/operations/stat", self.parent.cancel_token())
            .await
            .and_then(|res| res.decode::<StatReply>());

        match reply {
            Ok(StatReply { item: Some(stat) }) => dest.size = stat.size,
            Ok(StatReply { item: None }) => {
                tracing::warn!(fs = %dest.fs, path = %dest.path, "stat found no entry, size unknown")
            }
            Err(e) => tracing::warn!(fs = %dest.fs, path = %dest.path, error = %e, "stat failed, size unknown"),
        }
    }
}
