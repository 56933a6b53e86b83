// crates/operations/src/explorer.rs
//! File-browser operations of one explorer pane.
//!
//! Every async call runs as an internal `UI:Explorer:<pane>` job, so it is
//! monitored like any other job but never counted as user work.

use rcview_client::{command, Command, RcError};
use rcview_jobs::{JobEngine, JobRequest, StopPolicy};
use rcview_types::{base_name, join_remote, parent_dir, About, FsDetail, JobInfo, ListItem, RefreshItem};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// One directory as returned by [`Explorer::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub fs: String,
    pub path: String,
    pub items: Vec<ListItem>,
}

#[derive(Deserialize)]
struct ListOutput {
    #[serde(default)]
    list: Vec<ListItem>,
}

#[derive(Deserialize)]
struct StatReply {
    item: Option<ListItem>,
}

pub struct Explorer {
    engine: JobEngine,
    pane: String,
    cancel: CancellationToken,
}

impl Explorer {
    /// `cancel` bounds the synchronous calls (stat, about, remotes).
    pub fn new(engine: JobEngine, pane: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            engine,
            pane: pane.into(),
            cancel,
        }
    }

    pub fn category(&self) -> String {
        format!("UI:Explorer:{}", self.pane)
    }

    async fn run(&self, description: String, endpoint: &str, command: Command) -> Result<JobInfo, RcError> {
        let job = self
            .engine
            .submit(JobRequest::new(self.category(), description, endpoint, command))
            .await?;
        self.engine.await_reply(&job).await
    }

    /// Entries of `path` on `fs`, annotated with their remote.
    pub async fn list(&self, fs: &str, path: &str) -> Result<Listing, RcError> {
        let path = clean_path(path);
        let info = self
            .run(
                format!("Listing {fs}{path}"),
                "/operations/list",
                command(json!({ "fs": fs, "remote": path })),
            )
            .await?;

        let output: ListOutput = info.decode_output()?;
        let items = output.list.into_iter().map(|item| item.on_remote(fs)).collect();

        tracing::debug!(pane = %self.pane, %fs, %path, "listed directory");
        Ok(Listing {
            fs: fs.to_string(),
            path,
            items,
        })
    }

    /// Metadata of a single entry. Not found is [`RcError::Protocol`].
    pub async fn stat(&self, fs: &str, remote: &str) -> Result<ListItem, RcError> {
        let reply: StatReply = self
            .engine
            .send(&command(json!({ "fs": fs, "remote": remote })), "/operations/stat", &self.cancel)
            .await?
            .decode()?;

        reply
            .item
            .map(|item| item.on_remote(fs))
            .ok_or_else(|| RcError::Protocol(format!("{fs}{remote}: no such entry")))
    }

    /// Create `name` under `dir` and announce it to the panes.
    ///
    /// The job is held by its monitor until the new entry has been stat'ed,
    /// so its final snapshot carries the entry as an `Add` refresh.
    pub async fn mkdir(&self, fs: &str, dir: &str, name: &str) -> Result<ListItem, RcError> {
        let remote = join_remote(&clean_path(dir), name);
        let job = self
            .engine
            .dispatch(JobRequest::new(
                self.category(),
                format!("Creating directory {name}"),
                "/operations/mkdir",
                command(json!({ "fs": fs, "remote": remote })),
            ))
            .await?;
        self.engine.register(&job);
        self.engine.monitor(job.clone(), StopPolicy::Hold);

        let info = match self.engine.await_reply(&job).await {
            Ok(info) => info,
            Err(e) => {
                self.engine.stop_job(&job, &e.to_string(), false);
                return Err(e);
            }
        };

        let created = match self.stat(fs, &remote).await {
            Ok(item) => item,
            Err(e) => {
                self.engine.stop_job(&job, &e.to_string(), false);
                return Err(e);
            }
        };

        job.attach_refresh(vec![RefreshItem::add(created.clone())]);
        self.engine.stop_job(&job, &info.error, false);
        Ok(created)
    }

    /// Shareable URL for `item` inside `dir`.
    pub async fn public_link(&self, fs: &str, dir: &str, item: &ListItem) -> Result<String, RcError> {
        let info = self
            .run(
                "Generating public link".to_string(),
                "/operations/publiclink",
                command(json!({ "fs": fs, "remote": join_remote(&clean_path(dir), &item.name) })),
            )
            .await?;

        info.output_str("url")
            .map(str::to_string)
            .ok_or_else(|| RcError::Protocol("Public link could not be generated".to_string()))
    }

    pub async fn fsinfo(&self, fs: &str) -> Result<FsDetail, RcError> {
        let info = self
            .run(
                "Getting fs information".to_string(),
                "/operations/fsinfo",
                command(json!({ "fs": fs })),
            )
            .await?;
        Ok(info.decode_output()?)
    }

    pub async fn about(&self, fs: &str) -> Result<About, RcError> {
        crate::remote::about(&self.engine, fs, &self.cancel).await
    }

    pub async fn list_remotes(&self) -> Result<Vec<String>, RcError> {
        crate::remote::list_remotes(&self.engine, &self.cancel).await
    }
}

/// Normalise a remote path: no empty, `.` or trailing components, `..`
/// resolved. The remote root is `""`.
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Where navigation from `path` leads.
///
/// Entering (`back == false`) returns `(path/dir, dir)`. Going back returns
/// the parent and its name; going back from a top-level directory or the
/// root yields `("", "")`.
pub fn list_path(path: &str, dir: &str, back: bool) -> (String, String) {
    let path = clean_path(path);
    if back {
        if !path.contains('/') {
            return (String::new(), String::new());
        }
        let parent = parent_dir(&path).to_string();
        let name = base_name(&parent).to_string();
        return (parent, name);
    }
    (clean_path(&join_remote(&path, dir)), dir.to_string())
}
