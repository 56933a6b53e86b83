// crates/jobs/src/queue.rs
//! Registry of live jobs keyed by category then id.
//!
//! Ids are scoped per category and grow monotonically while a category has
//! live jobs. The running counter only tracks non-internal categories.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::{is_internal_category, Job};

#[derive(Default)]
pub struct JobQueue {
    jobs: RwLock<HashMap<String, BTreeMap<i64, Arc<Job>>>>,
    running: AtomicI64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job. Returns `false` when `(category, id)` is already taken,
    /// in which case neither the registry nor the counter changes.
    pub fn register(&self, job: Arc<Job>) -> bool {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned registering job: {e}");
                return false;
            }
        };

        let bucket = jobs.entry(job.category().to_string()).or_default();
        if bucket.contains_key(&job.id()) {
            tracing::warn!(category = %job.category(), id = job.id(), "job id already registered");
            return false;
        }

        if !job.is_internal() {
            self.running.fetch_add(1, Ordering::SeqCst);
        }
        bucket.insert(job.id(), job);
        true
    }

    /// Allocate the next id of `category` and register the job built for it,
    /// atomically with respect to other registrations.
    pub fn register_next(&self, category: &str, build: impl FnOnce(i64) -> Job) -> Option<Arc<Job>> {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned registering job: {e}");
                return None;
            }
        };

        let bucket = jobs.entry(category.to_string()).or_default();
        let id = next_in(bucket);
        let job = Arc::new(build(id));
        if !job.is_internal() {
            self.running.fetch_add(1, Ordering::SeqCst);
        }
        bucket.insert(id, Arc::clone(&job));
        Some(job)
    }

    /// Remove exactly this job. Returns whether it was present.
    pub fn remove(&self, job: &Job) -> bool {
        let mut jobs = match self.jobs.write() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!("RwLock poisoned removing job: {e}");
                return false;
            }
        };

        let Some(bucket) = jobs.get_mut(job.category()) else {
            return false;
        };
        let same = bucket
            .get(&job.id())
            .is_some_and(|queued| std::ptr::eq(Arc::as_ptr(queued), job));
        if !same {
            return false;
        }

        bucket.remove(&job.id());
        if bucket.is_empty() {
            jobs.remove(job.category());
        }
        if !job.is_internal() {
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
        true
    }

    /// Job with the highest id in `category`.
    pub fn latest(&self, category: &str) -> Option<Arc<Job>> {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .get(category)
                .and_then(|bucket| bucket.values().next_back().cloned()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                None
            }
        }
    }

    /// One past the highest live id of `category`, `0` when it has none.
    pub fn next_id(&self, category: &str) -> i64 {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(category).map(next_in).unwrap_or(0),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                0
            }
        }
    }

    pub fn get(&self, category: &str, id: i64) -> Option<Arc<Job>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(category).and_then(|b| b.get(&id).cloned()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                None
            }
        }
    }

    /// Jobs of one category in id order.
    pub fn jobs_in(&self, category: &str) -> Vec<Arc<Job>> {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .get(category)
                .map(|b| b.values().cloned().collect())
                .unwrap_or_default(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        }
    }

    /// Non-internal jobs grouped by category, both sorted.
    pub fn visible(&self) -> Vec<(String, Vec<Arc<Job>>)> {
        let jobs = match self.jobs.read() {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                return Vec::new();
            }
        };

        let mut visible: Vec<(String, Vec<Arc<Job>>)> = jobs
            .iter()
            .filter(|(category, bucket)| !is_internal_category(category) && !bucket.is_empty())
            .map(|(category, bucket)| (category.clone(), bucket.values().cloned().collect()))
            .collect();
        visible.sort_by(|a, b| a.0.cmp(&b.0));
        visible
    }

    /// Cancel every job of `category`. Returns how many were signalled.
    pub fn cancel_category(&self, category: &str) -> usize {
        let jobs = self.jobs_in(category);
        for job in &jobs {
            job.cancel();
        }
        jobs.len()
    }

    /// Cancel every job tagged with `group`, across categories.
    pub fn cancel_group(&self, group: &str) -> usize {
        let matching: Vec<Arc<Job>> = match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .flat_map(|bucket| bucket.values())
                .filter(|job| job.group() == group)
                .cloned()
                .collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                return 0;
            }
        };
        for job in &matching {
            job.cancel();
        }
        matching.len()
    }

    /// Number of live jobs in non-internal categories.
    pub fn running_count(&self) -> i64 {
        self.running.load(Ordering::SeqCst)
    }
}

fn next_in(bucket: &BTreeMap<i64, Arc<Job>>) -> i64 {
    bucket.keys().next_back().map(|id| id + 1).unwrap_or(0)
}
