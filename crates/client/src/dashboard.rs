// crates/client/src/dashboard.rs
//! Perpetual connectivity and dashboard polling.
//!
//! Both loops publish with `try_send` into small bounded queues: a slow
//! consumer only ever misses intermediate states, it never stalls polling.

use std::sync::Arc;
use std::time::Duration;

use rcview_types::{DashboardInfo, DashboardStats};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{Command, Dispatch};
use crate::session::SessionRegistry;

/// Receivers fed by [`spawn_connectivity`].
pub struct ConnectivityFeeds {
    /// For the status-bar connection indicator.
    pub indicator: mpsc::Receiver<bool>,
    /// Drives [`spawn_dashboard`].
    pub dashboard: mpsc::Receiver<bool>,
}

/// Dial the current daemon every `interval` until `cancel` fires.
pub fn spawn_connectivity(
    session: Arc<SessionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) -> (ConnectivityFeeds, JoinHandle<()>) {
    let (indicator_tx, indicator) = mpsc::channel(1);
    let (dashboard_tx, dashboard) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        loop {
            let connected = session.dial().await;
            let _ = indicator_tx.try_send(connected);
            let _ = dashboard_tx.try_send(connected);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::debug!("connectivity poller stopped");
    });

    (
        ConnectivityFeeds {
            indicator,
            dashboard,
        },
        handle,
    )
}

#[derive(Deserialize)]
struct BandwidthReply {
    rate: Option<String>,
}

/// Refresh daemon stats on every connectivity tick.
///
/// The last known version, stats and bandwidth are kept when a fetch fails,
/// so a transient error does not blank the dashboard.
pub fn spawn_dashboard(
    session: Arc<SessionRegistry>,
    mut connectivity: mpsc::Receiver<bool>,
    cancel: CancellationToken,
) -> (mpsc::Receiver<DashboardInfo>, JoinHandle<()>) {
    let (info_tx, info_rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut last = DashboardInfo::default();

        loop {
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                tick = connectivity.recv() => match tick {
                    Some(connected) => connected,
                    None => break,
                },
            };

            last.connected = connected;
            if connected {
                refresh(&session, &cancel, &mut last).await;
            }

            let _ = info_tx.try_send(last.clone());
        }
        tracing::debug!("dashboard poller stopped");
    });

    (info_rx, handle)
}

async fn refresh(session: &SessionRegistry, cancel: &CancellationToken, info: &mut DashboardInfo) {
    match session.version(false).await {
        Ok(version) => info.version = Some(version.label()),
        Err(e) => tracing::debug!(error = %e, "dashboard version fetch failed"),
    }

    match session.send(&Command::new(), "/core/stats", cancel).await {
        Ok(res) => match res.decode::<DashboardStats>() {
            Ok(stats) => info.stats = Some(stats),
            Err(e) => tracing::debug!(error = %e, "dashboard stats decode failed"),
        },
        Err(e) => tracing::debug!(error = %e, "dashboard stats fetch failed"),
    }

    match session.send(&Command::new(), "/core/bwlimit", cancel).await {
        Ok(res) => match res.decode::<BandwidthReply>() {
            Ok(reply) => info.bandwidth = reply.rate,
            Err(e) => tracing::debug!(error = %e, "bandwidth decode failed"),
        },
        Err(e) => tracing::debug!(error = %e, "bandwidth fetch failed"),
    }
}
