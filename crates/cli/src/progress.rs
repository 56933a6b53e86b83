// crates/cli/src/progress.rs
//! Terminal presentation of job status, listings and the dashboard.

use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use rcview_jobs::{Notice, PaneListing};
use rcview_types::{DashboardInfo, JobInfo, ListItem};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Byte count for display; negative counts clamp to zero.
pub fn bytes(count: f64) -> HumanBytes {
    HumanBytes(count.max(0.0) as u64)
}

fn size_label(item: &ListItem) -> String {
    if item.has_known_size() {
        bytes(item.size as f64).to_string()
    } else {
        "Unknown".to_string()
    }
}

/// One-line summary of a snapshot for the spinner.
pub fn status_line(info: &JobInfo) -> String {
    let jobs = match info.job_count {
        n if n <= 0 => String::new(),
        1 => "1 job running · ".to_string(),
        n => format!("{n} jobs running · "),
    };

    let transfer = &info.current_transfer;
    if transfer.name.is_empty() {
        return format!("{jobs}{}", info.description);
    }

    format!(
        "{jobs}{} {} {}% {}/s",
        info.description,
        transfer.name,
        transfer.percentage,
        bytes(transfer.speed)
    )
}

/// Follow the indicator feed until it closes.
pub fn spawn_indicator(pb: ProgressBar, mut feed: mpsc::Receiver<JobInfo>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(info) = feed.recv().await {
            pb.set_message(status_line(&info));
        }
    })
}

/// Print notices above the spinner.
pub fn spawn_notices(pb: ProgressBar, mut feed: mpsc::Receiver<Notice>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notice) = feed.recv().await {
            pb.println(format!("  \u{2717} {notice}"));
        }
    })
}

pub fn print_listing(listing: &PaneListing) {
    println!("{}{}", listing.fs, listing.path);
    for item in &listing.items {
        let name = if item.is_dir {
            format!("{}/", item.name)
        } else {
            item.name.clone()
        };
        println!(
            "  {:>9}  {:<16}  {}",
            size_label(item),
            item.display_modified(),
            name
        );
    }
}

pub fn dashboard_line(info: &DashboardInfo) -> String {
    if !info.connected {
        return "disconnected".to_string();
    }

    let mut line = format!("connected  {}", info.version.as_deref().unwrap_or("unknown version"));
    if let Some(stats) = &info.stats {
        line.push_str(&format!(
            "  transferred {}  {}/s  {} transfers  {} errors",
            bytes(stats.bytes as f64),
            bytes(stats.speed),
            stats.transfers,
            stats.errors
        ));
    }
    if let Some(rate) = &info.bandwidth {
        line.push_str(&format!("  limit {rate}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rcview_types::{DashboardStats, TransferStat};

    #[test]
    fn test_status_line_with_transfer() {
        let info = JobInfo {
            description: "(1/2) Copying a.iso -> dst:".to_string(),
            job_count: 2,
            current_transfer: TransferStat {
                name: "a.iso".to_string(),
                percentage: 40,
                speed: 2048.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            status_line(&info),
            "2 jobs running · (1/2) Copying a.iso -> dst: a.iso 40% 2.00 KiB/s"
        );
    }

    #[test]
    fn test_status_line_idle() {
        let info = JobInfo {
            description: "Listing r:".to_string(),
            ..Default::default()
        };
        assert_eq!(status_line(&info), "Listing r:");
    }

    #[test]
    fn test_size_label() {
        let dir = ListItem {
            name: "photos".to_string(),
            is_dir: true,
            ..Default::default()
        };
        assert_eq!(size_label(&dir), "Unknown");

        let file = ListItem {
            size: 1536,
            ..dir
        };
        assert_eq!(size_label(&file), "1.50 KiB");
        assert_eq!(bytes(-5.0).to_string(), "0 B");
    }

    #[test]
    fn test_dashboard_line() {
        assert_eq!(dashboard_line(&DashboardInfo::default()), "disconnected");

        let info = DashboardInfo {
            connected: true,
            version: Some("v1.66.0 (arm64)".to_string()),
            bandwidth: Some("10M".to_string()),
            stats: Some(DashboardStats {
                bytes: 1536,
                transfers: 3,
                ..Default::default()
            }),
        };
        assert_eq!(
            dashboard_line(&info),
            "connected  v1.66.0 (arm64)  transferred 1.50 KiB  0 B/s  3 transfers  0 errors  limit 10M"
        );
    }
}
