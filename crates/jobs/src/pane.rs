// crates/jobs/src/pane.rs
//! Pane subscribers and incremental reconciliation of cached listings.

use std::sync::{Arc, Mutex};

use rcview_types::{JobInfo, ListItem, RefreshAction};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of each pane's private refresh queue.
pub const PANE_QUEUE_CAPACITY: usize = 10;

struct Subscriber {
    pane: String,
    tx: mpsc::Sender<JobInfo>,
}

/// Re-broadcasts snapshots to every subscribed pane.
pub struct PaneRefreshDistributor {
    subscribers: Mutex<Vec<Subscriber>>,
    capacity: usize,
}

impl PaneRefreshDistributor {
    pub fn new() -> Self {
        Self::with_capacity(PANE_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register `pane`, replacing an earlier subscription of the same pane.
    pub fn subscribe(&self, pane: impl Into<String>) -> mpsc::Receiver<JobInfo> {
        let pane = pane.into();
        let (tx, rx) = mpsc::channel(self.capacity);
        match self.subscribers.lock() {
            Ok(mut subs) => {
                subs.retain(|s| s.pane != pane);
                subs.push(Subscriber { pane, tx });
            }
            Err(e) => tracing::error!("Mutex poisoned subscribing pane: {e}"),
        }
        rx
    }

    pub fn unsubscribe(&self, pane: &str) {
        match self.subscribers.lock() {
            Ok(mut subs) => subs.retain(|s| s.pane != pane),
            Err(e) => tracing::error!("Mutex poisoned unsubscribing pane: {e}"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subs) => subs.len(),
            Err(e) => {
                tracing::error!("Mutex poisoned reading pane subscribers: {e}");
                0
            }
        }
    }

    /// Offer `info` to every pane. Returns how many accepted it.
    pub fn distribute(&self, info: &JobInfo) -> usize {
        let mut subs = match self.subscribers.lock() {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!("Mutex poisoned distributing pane refresh: {e}");
                return 0;
            }
        };

        subs.retain(|s| !s.tx.is_closed());
        subs.iter()
            .filter(|s| s.tx.try_send(info.clone()).is_ok())
            .count()
    }

    /// Forward everything from `feed` until it closes.
    pub fn spawn(self: Arc<Self>, mut feed: mpsc::Receiver<JobInfo>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(info) = feed.recv().await {
                self.distribute(&info);
            }
            tracing::debug!("pane refresh distributor stopped");
        })
    }
}

impl Default for PaneRefreshDistributor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Name,
    Size,
    Modified,
}

/// Directories first, then by `mode`.
pub fn sort_items(items: &mut [ListItem], mode: SortMode, ascending: bool) {
    items.sort_by(|a, b| {
        b.is_dir.cmp(&a.is_dir).then_with(|| {
            let ord = match mode {
                SortMode::Name => a.name.cmp(&b.name),
                SortMode::Size => a.size.cmp(&b.size),
                SortMode::Modified => a.modified_unix.cmp(&b.modified_unix),
            }
            .then_with(|| a.name.cmp(&b.name));
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        })
    });
}

/// The cached listing a pane currently displays.
#[derive(Debug, Clone, Default)]
pub struct PaneListing {
    pub fs: String,
    pub path: String,
    pub items: Vec<ListItem>,
    pub sort: SortMode,
    pub ascending: bool,
}

impl PaneListing {
    pub fn new(fs: impl Into<String>, path: impl Into<String>, items: Vec<ListItem>) -> Self {
        let mut listing = Self {
            fs: fs.into(),
            path: path.into(),
            items,
            sort: SortMode::Name,
            ascending: true,
        };
        listing.resort();
        listing
    }

    pub fn set_sort(&mut self, sort: SortMode, ascending: bool) {
        self.sort = sort;
        self.ascending = ascending;
        self.resort();
    }

    fn resort(&mut self) {
        sort_items(&mut self.items, self.sort, self.ascending);
    }

    /// Whether `item` lives directly in the directory this pane shows.
    pub fn shows(&self, item: &ListItem) -> bool {
        item.fs == self.fs && item.parent_dir() == self.path.trim_end_matches('/')
    }

    fn position(&self, item: &ListItem) -> Option<usize> {
        self.items
            .iter()
            .position(|e| (!item.id.is_empty() && e.id == item.id) || e.name == item.name)
    }

    /// Apply the refresh payload of a finished job. Returns whether the
    /// listing changed.
    pub fn apply_refresh(&mut self, info: &JobInfo) -> bool {
        if !info.finished || info.is_error() {
            return false;
        }

        let mut changed = false;
        for refresh in &info.refresh {
            if !self.shows(&refresh.item) {
                continue;
            }
            match (refresh.action, self.position(&refresh.item)) {
                (RefreshAction::Add, Some(i)) => {
                    if refresh.item.has_known_size() && self.items[i].size != refresh.item.size {
                        self.items[i].size = refresh.item.size;
                        changed = true;
                    }
                }
                (RefreshAction::Add, None) => {
                    self.items.push(refresh.item.clone());
                    changed = true;
                }
                (RefreshAction::Remove, Some(i)) => {
                    self.items.remove(i);
                    changed = true;
                }
                (RefreshAction::Remove, None) => {}
            }
        }

        if changed {
            self.resort();
        }
        changed
    }
}

/// Reconcile `listing` with every snapshot on `feed`, asking for a redraw of
/// `pane` whenever it changed.
pub fn watch_pane(
    pane: impl Into<String>,
    listing: Arc<tokio::sync::Mutex<PaneListing>>,
    mut feed: mpsc::Receiver<JobInfo>,
    redraw: mpsc::Sender<String>,
) -> JoinHandle<()> {
    let pane = pane.into();
    tokio::spawn(async move {
        while let Some(info) = feed.recv().await {
            let changed = listing.lock().await.apply_refresh(&info);
            if changed {
                tracing::debug!(%pane, job = info.id, "pane reconciled");
                let _ = redraw.try_send(pane.clone());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rcview_types::RefreshItem;

    fn entry(path: &str, size: i64, is_dir: bool) -> ListItem {
        ListItem {
            name: rcview_types::base_name(path).to_string(),
            path: path.to_string(),
            size,
            is_dir,
            fs: "r:".to_string(),
            ..Default::default()
        }
    }

    fn finished(refresh: Vec<RefreshItem>) -> JobInfo {
        JobInfo {
            finished: true,
            success: true,
            refresh,
            ..Default::default()
        }
    }

    fn names(listing: &PaneListing) -> Vec<&str> {
        listing.items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_sort_directories_first() {
        let mut items = vec![entry("b.txt", 5, false), entry("z", 0, true), entry("a.txt", 9, false)];
        sort_items(&mut items, SortMode::Size, false);
        let sorted: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(sorted, vec!["z", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_add_inserts_sorted() {
        let mut pane = PaneListing::new("r:", "docs", vec![entry("docs/b.txt", 1, false)]);
        assert!(pane.apply_refresh(&finished(vec![RefreshItem::add(entry("docs/a.txt", 2, false))])));
        assert_eq!(names(&pane), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_add_patches_existing_size() {
        let mut pane = PaneListing::new("r:", "", vec![entry("a.txt", -1, false)]);
        assert!(pane.apply_refresh(&finished(vec![RefreshItem::add(entry("a.txt", 42, false))])));
        assert_eq!(pane.items.len(), 1);
        assert_eq!(pane.items[0].size, 42);
    }

    #[test]
    fn test_remove_deletes_match() {
        let mut pane = PaneListing::new("r:", "docs/", vec![entry("docs/a.txt", 1, false)]);
        assert!(pane.apply_refresh(&finished(vec![RefreshItem::remove(entry("docs/a.txt", 1, false))])));
        assert!(pane.items.is_empty());
    }

    #[test]
    fn test_other_directory_left_unchanged() {
        let mut pane = PaneListing::new("r:", "docs", vec![entry("docs/a.txt", 1, false)]);
        let refresh = vec![
            RefreshItem::add(entry("music/x.mp3", 3, false)),
            RefreshItem::remove(entry("a.txt", 1, false)),
        ];
        assert!(!pane.apply_refresh(&finished(refresh)));
        assert_eq!(names(&pane), vec!["a.txt"]);
    }

    #[test]
    fn test_unfinished_or_failed_snapshots_ignored() {
        let mut pane = PaneListing::new("r:", "", vec![]);
        let add = vec![RefreshItem::add(entry("a.txt", 1, false))];

        let running = JobInfo {
            refresh: add.clone(),
            ..Default::default()
        };
        assert!(!pane.apply_refresh(&running));

        let failed = JobInfo {
            error: "boom".to_string(),
            ..finished(add)
        };
        assert!(!pane.apply_refresh(&failed));
        assert!(pane.items.is_empty());
    }

    #[test]
    fn test_distribute_without_subscribers() {
        let distributor = PaneRefreshDistributor::new();
        assert_eq!(distributor.distribute(&JobInfo::default()), 0);
    }

    #[test]
    fn test_distribute_prunes_closed_panes() {
        let distributor = PaneRefreshDistributor::new();
        let mut left = distributor.subscribe("left");
        let right = distributor.subscribe("right");
        drop(right);

        assert_eq!(distributor.distribute(&JobInfo::default()), 1);
        assert_eq!(distributor.subscriber_count(), 1);
        assert!(left.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_watch_pane_requests_redraw() {
        let listing = Arc::new(tokio::sync::Mutex::new(PaneListing::new("r:", "", vec![])));
        let (feed_tx, feed_rx) = mpsc::channel(PANE_QUEUE_CAPACITY);
        let (redraw_tx, mut redraw_rx) = mpsc::channel(1);
        let task = watch_pane("left", listing.clone(), feed_rx, redraw_tx);

        feed_tx
            .send(finished(vec![RefreshItem::add(entry("new.txt", 7, false))]))
            .await
            .unwrap();
        assert_eq!(redraw_rx.recv().await.as_deref(), Some("left"));

        drop(feed_tx);
        task.await.unwrap();
        assert_eq!(listing.lock().await.items.len(), 1);
    }
}
