// crates/cli/src/app.rs
//! Wiring of the session, the job engine and the status fan-out.

use std::sync::Arc;

use anyhow::{Context, Result};
use rcview_client::SessionRegistry;
use rcview_jobs::{
    watch_pane, FanoutFeeds, JobEngine, Notice, PaneListing, PaneRefreshDistributor, StatusFanout,
    FANOUT_CAPACITY,
};
use rcview_operations::{Config, Explorer, Mounts};
use rcview_types::JobInfo;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Cli;

/// Everything a command needs, built once per process.
pub struct App {
    pub session: Arc<SessionRegistry>,
    pub engine: JobEngine,
    pub distributor: Arc<PaneRefreshDistributor>,
    pub user_info: String,
    indicator: Option<mpsc::Receiver<JobInfo>>,
    notices: Option<mpsc::Receiver<Notice>>,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Log in and start the background fan-out tasks.
    pub async fn start(cli: &Cli) -> Result<Self> {
        let session = Arc::new(SessionRegistry::new());
        let conn = &cli.connection;
        let user_info = session
            .login(&conn.host, &conn.user, &conn.password)
            .await
            .with_context(|| format!("logging in to {}", conn.host))?;

        let (engine, status) = JobEngine::new(session.clone(), cli.engine_config());
        let (fanout, feeds) = StatusFanout::new(FANOUT_CAPACITY);
        let FanoutFeeds {
            indicator,
            panes,
            notices,
        } = feeds;

        let distributor = Arc::new(PaneRefreshDistributor::new());
        let tasks = vec![fanout.spawn(status), distributor.clone().spawn(panes)];

        Ok(Self {
            session,
            engine,
            distributor,
            user_info,
            indicator: Some(indicator),
            notices: Some(notices),
            tasks,
        })
    }

    pub fn explorer(&self, pane: &str) -> Explorer {
        Explorer::new(self.engine.clone(), pane, self.session.session_token())
    }

    pub fn mounts(&self) -> Mounts {
        Mounts::new(self.engine.clone(), self.session.session_token())
    }

    pub fn config(&self) -> Config {
        Config::new(self.engine.clone(), self.session.session_token())
    }

    /// The indicator feed; only the first caller gets it.
    pub fn take_indicator(&mut self) -> Option<mpsc::Receiver<JobInfo>> {
        self.indicator.take()
    }

    pub fn take_notices(&mut self) -> Option<mpsc::Receiver<Notice>> {
        self.notices.take()
    }

    /// Subscribe `listing` as pane `pane` and keep it reconciled with
    /// finished jobs. Redraw requests arrive on the returned receiver.
    pub fn watch(
        &mut self,
        pane: &str,
        listing: Arc<tokio::sync::Mutex<PaneListing>>,
    ) -> mpsc::Receiver<String> {
        let (redraw_tx, redraw_rx) = mpsc::channel(FANOUT_CAPACITY);
        let feed = self.distributor.subscribe(pane);
        self.tasks.push(watch_pane(pane, listing, feed, redraw_tx));
        redraw_rx
    }

    /// Cancel calls bound to the session and stop background tasks.
    pub fn shutdown(self) {
        self.session.renew_session_token();
        for task in self.tasks {
            task.abort();
        }
        tracing::debug!("app shut down");
    }
}
