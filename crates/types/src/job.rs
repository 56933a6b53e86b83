// crates/types/src/job.rs
//! Job status snapshots and the daemon replies they are assembled from.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listing::RefreshItem;

/// Per-transfer statistics as reported in the `transferring` list of `/core/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferStat {
    pub name: String,
    pub size: i64,
    pub bytes: i64,
    pub eta: Option<i64>,
    pub group: String,
    pub percentage: i64,
    pub speed: f64,
    pub speed_avg: f64,
}

/// Reply of `/job/status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStatusReply {
    pub id: i64,
    pub group: String,
    pub duration: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub finished: bool,
    pub success: bool,
    pub error: String,
    pub output: Value,
}

/// The part of `/core/stats` the job monitor cares about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransferStats {
    pub transferring: Option<Vec<TransferStat>>,
}

impl TransferStats {
    /// The first in-flight transfer tagged with `group`, if any.
    pub fn for_group(&self, group: &str) -> Option<&TransferStat> {
        self.transferring
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|t| t.group == group)
    }
}

/// One point-in-time observation of a job.
///
/// Snapshots are never updated in place; a later status is a new value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: i64,
    pub category: String,
    pub description: String,
    pub group: String,
    pub duration: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub finished: bool,
    pub success: bool,
    /// Empty when the job has not failed.
    pub error: String,
    /// Set when `error` was synthesized from a cancellation.
    pub cancelled: bool,
    pub output: Value,
    pub current_transfer: TransferStat,
    /// Externally visible running-job count at the time of emission.
    pub job_count: i64,
    pub refresh: Vec<RefreshItem>,
}

impl JobInfo {
    /// A snapshot is terminal once the job finished or reported an error.
    pub fn is_terminal(&self) -> bool {
        self.finished || !self.error.is_empty()
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Fold a `/job/status` reply into this snapshot.
    pub fn apply_status(&mut self, reply: JobStatusReply) {
        self.duration = reply.duration;
        self.start_time = reply.start_time;
        self.end_time = reply.end_time;
        self.finished = reply.finished;
        self.success = reply.success;
        self.error = reply.error;
        self.output = reply.output;
        if !reply.group.is_empty() {
            self.group = reply.group;
        }
    }

    /// Decode the operation-specific `output` payload.
    pub fn decode_output<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.output.clone())
    }

    /// Look up a single string field of the `output` payload.
    pub fn output_str(&self, key: &str) -> Option<&str> {
        self.output.get(key).and_then(Value::as_str)
    }
}
