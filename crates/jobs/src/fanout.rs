// crates/jobs/src/fanout.rs
//! Fan-out of the global status queue to the indicator, the pane
//! distributor and the notice line.

use std::fmt;

use rcview_types::JobInfo;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of each queue fed by [`StatusFanout`].
pub const FANOUT_CAPACITY: usize = 10;

const SUBSYSTEM: &str = "Job Monitor";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Cancelled,
}

/// A user-facing message derived from a failed or cancelled job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subsystem: String,
    pub kind: NoticeKind,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NoticeKind::Error => write!(f, "{}: {}", self.subsystem, self.message),
            NoticeKind::Cancelled => write!(f, "Operation cancelled: {}", self.message),
        }
    }
}

/// Receiving ends handed to the front end.
pub struct FanoutFeeds {
    pub indicator: mpsc::Receiver<JobInfo>,
    pub panes: mpsc::Receiver<JobInfo>,
    pub notices: mpsc::Receiver<Notice>,
}

pub struct StatusFanout {
    indicator: mpsc::Sender<JobInfo>,
    panes: mpsc::Sender<JobInfo>,
    notices: mpsc::Sender<Notice>,
    last_error: Option<(String, String)>,
}

impl StatusFanout {
    pub fn new(capacity: usize) -> (Self, FanoutFeeds) {
        let capacity = capacity.max(1);
        let (indicator, indicator_rx) = mpsc::channel(capacity);
        let (panes, panes_rx) = mpsc::channel(capacity);
        let (notices, notices_rx) = mpsc::channel(capacity);
        (
            Self {
                indicator,
                panes,
                notices,
                last_error: None,
            },
            FanoutFeeds {
                indicator: indicator_rx,
                panes: panes_rx,
                notices: notices_rx,
            },
        )
    }

    /// Offer one snapshot to every consumer, dropping where full.
    ///
    /// Errors are keyed by job group, so a job reporting the same error
    /// twice (last poll, then final stop) or a batch item and its batch
    /// failing with the same text produce a single notice.
    pub fn forward(&mut self, info: JobInfo) {
        if info.is_error() {
            let key = (info.group.clone(), info.error.clone());
            if self.last_error.as_ref() != Some(&key) {
                let notice = Notice {
                    subsystem: SUBSYSTEM.to_string(),
                    kind: if info.cancelled {
                        NoticeKind::Cancelled
                    } else {
                        NoticeKind::Error
                    },
                    message: info.error.clone(),
                };
                let _ = self.notices.try_send(notice);
                self.last_error = Some(key);
            }
        }

        let _ = self.indicator.try_send(info.clone());
        let _ = self.panes.try_send(info);
    }

    /// Drain `status` until the engine side goes away.
    pub fn spawn(mut self, mut status: mpsc::Receiver<JobInfo>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(info) = status.recv().await {
                self.forward(info);
            }
            tracing::debug!("status fan-out stopped");
        })
    }
}
