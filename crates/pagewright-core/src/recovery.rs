//! Periodic page snapshots for crash recovery.
//!
//! The timer is cooperative: the host calls [`RecoveryManager::tick`] from its
//! event loop and a snapshot is captured whenever the interval has elapsed. Only
//! the currently open page has a running timer.

use crate::snapshot::{Reconstruction, Snapshot, reconstruct};
use std::collections::{HashMap, VecDeque};

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Default snapshot interval in seconds.
pub const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 30;

/// Default number of snapshots kept per page.
pub const DEFAULT_RETAINED_SNAPSHOTS: usize = 5;

/// A captured page state.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCapture {
    pub snapshot: Snapshot,
    pub page_id: String,
    pub object_count: usize,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl PageCapture {
    /// Capture `snapshot` for `page_id`, stamped with the current time.
    pub fn new(page_id: impl Into<String>, snapshot: Snapshot) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            object_count: snapshot.len(),
            snapshot,
            page_id: page_id.into(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone)]
struct Timer {
    page_id: String,
    next_due: Instant,
}

/// Keeps recent snapshots of pages and restores them on request.
#[derive(Debug)]
pub struct RecoveryManager {
    interval: Duration,
    retain: usize,
    timer: Option<Timer>,
    snapshots: HashMap<String, VecDeque<PageCapture>>,
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            DEFAULT_RETAINED_SNAPSHOTS,
        )
    }
}

impl RecoveryManager {
    /// Create a manager. At least one snapshot per page is always kept.
    pub fn new(interval: Duration, retain: usize) -> Self {
        Self {
            interval,
            retain: retain.max(1),
            timer: None,
            snapshots: HashMap::new(),
        }
    }

    /// Get the snapshot interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the snapshot timer for `page_id`, stopping any other page's timer.
    pub fn start_snapshots(&mut self, page_id: impl Into<String>, now: Instant) {
        let page_id = page_id.into();
        if let Some(previous) = &self.timer {
            if previous.page_id != page_id {
                log::debug!("Stopping snapshots of page {}", previous.page_id);
            }
        }
        log::debug!("Starting snapshots of page {} every {:?}", page_id, self.interval);
        self.timer = Some(Timer {
            page_id,
            next_due: now + self.interval,
        });
    }

    /// Stop the snapshot timer.
    pub fn stop_snapshots(&mut self) {
        if let Some(timer) = self.timer.take() {
            log::debug!("Stopping snapshots of page {}", timer.page_id);
        }
    }

    /// The page whose timer is running.
    pub fn active_page(&self) -> Option<&str> {
        self.timer.as_ref().map(|t| t.page_id.as_str())
    }

    /// Advance the timer. Captures the active page when due; returns true if a
    /// snapshot was stored. A failed capture is retried on the next interval.
    pub fn tick<F>(&mut self, now: Instant, capture: F) -> bool
    where
        F: FnOnce(&str) -> Option<PageCapture>,
    {
        let Some(timer) = &mut self.timer else {
            return false;
        };
        if now < timer.next_due {
            return false;
        }
        timer.next_due = now + self.interval;
        let page_id = timer.page_id.clone();
        self.take_snapshot(&page_id, capture)
    }

    /// Capture `page_id` right away.
    pub fn take_snapshot<F>(&mut self, page_id: &str, capture: F) -> bool
    where
        F: FnOnce(&str) -> Option<PageCapture>,
    {
        match capture(page_id) {
            Some(captured) if captured.page_id == page_id => {
                log::debug!(
                    "Snapshot of page {} ({} objects)",
                    page_id,
                    captured.object_count
                );
                self.record(captured);
                true
            }
            Some(captured) => {
                log::warn!(
                    "Discarding snapshot of page {} taken for page {}",
                    captured.page_id,
                    page_id
                );
                false
            }
            None => {
                log::warn!("Snapshot of page {} failed, will retry", page_id);
                false
            }
        }
    }

    /// Store a capture, dropping the oldest beyond the retention limit.
    pub fn record(&mut self, capture: PageCapture) {
        let history = self.snapshots.entry(capture.page_id.clone()).or_default();
        history.push_back(capture);
        while history.len() > self.retain {
            history.pop_front();
        }
    }

    /// Most recent capture of a page.
    pub fn latest(&self, page_id: &str) -> Option<&PageCapture> {
        self.snapshots.get(page_id)?.back()
    }

    /// Captures of a page, oldest first.
    pub fn history(&self, page_id: &str) -> impl Iterator<Item = &PageCapture> {
        self.snapshots.get(page_id).into_iter().flatten()
    }

    /// Reconstruct the latest capture of `page_id` and hand it to `apply`.
    ///
    /// Returns `None` when the page has no capture.
    pub fn recover_page<F, T>(&self, page_id: &str, apply: F) -> Option<T>
    where
        F: FnOnce(Reconstruction) -> T,
    {
        let Some(latest) = self.latest(page_id) else {
            log::warn!("No snapshot to recover page {} from", page_id);
            return None;
        };
        let reconstruction = reconstruct(&latest.snapshot);
        log::info!(
            "Recovering page {} from snapshot at {} ({} objects)",
            page_id,
            latest.timestamp,
            reconstruction.objects.len()
        );
        Some(apply(reconstruction))
    }

    /// Drop every capture of a page.
    pub fn forget(&mut self, page_id: &str) {
        self.snapshots.remove(page_id);
        if self.active_page() == Some(page_id) {
            self.stop_snapshots();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SerializedObject;
    use serde_json::json;

    fn capture_of(page_id: &str, objects: usize) -> PageCapture {
        let mut snapshot = Snapshot::empty("white");
        for i in 0..objects {
            snapshot
                .objects
                .push(SerializedObject::from_value(json!({"type": "rect", "id": format!("o{i}")})));
        }
        PageCapture::new(page_id, snapshot)
    }

    #[test]
    fn test_tick_waits_for_interval() {
        let mut manager = RecoveryManager::new(Duration::from_secs(30), 5);
        let start = Instant::now();
        manager.start_snapshots("p1", start);

        assert!(!manager.tick(start + Duration::from_secs(10), |id| Some(capture_of(id, 1))));
        assert!(manager.latest("p1").is_none());

        assert!(manager.tick(start + Duration::from_secs(31), |id| Some(capture_of(id, 2))));
        assert_eq!(manager.latest("p1").unwrap().object_count, 2);

        // Rescheduled from the tick that fired.
        assert!(!manager.tick(start + Duration::from_secs(40), |id| Some(capture_of(id, 3))));
    }

    #[test]
    fn test_switching_pages_moves_the_timer() {
        let mut manager = RecoveryManager::default();
        let now = Instant::now();
        manager.start_snapshots("p1", now);
        manager.start_snapshots("p2", now);
        assert_eq!(manager.active_page(), Some("p2"));

        let later = now + manager.interval();
        assert!(manager.tick(later, |id| Some(capture_of(id, 1))));
        assert!(manager.latest("p1").is_none());
        assert!(manager.latest("p2").is_some());

        manager.stop_snapshots();
        assert!(!manager.tick(later + manager.interval(), |id| Some(capture_of(id, 1))));
    }

    #[test]
    fn test_failed_capture_is_skipped() {
        let mut manager = RecoveryManager::default();
        assert!(!manager.take_snapshot("p1", |_| None));
        assert!(!manager.take_snapshot("p1", |_| Some(capture_of("other", 1))));
        assert!(manager.latest("p1").is_none());
        assert!(manager.latest("other").is_none());
    }

    #[test]
    fn test_retention() {
        let mut manager = RecoveryManager::new(Duration::from_secs(1), 2);
        for count in 1..=4 {
            manager.take_snapshot("p1", |id| Some(capture_of(id, count)));
        }
        let counts: Vec<usize> = manager.history("p1").map(|c| c.object_count).collect();
        assert_eq!(counts, vec![3, 4]);
    }

    #[test]
    fn test_recover_page_reconstructs_latest() {
        let mut manager = RecoveryManager::default();
        manager.take_snapshot("p1", |id| Some(capture_of(id, 1)));
        manager.take_snapshot("p1", |id| Some(capture_of(id, 3)));

        let ids = manager
            .recover_page("p1", |rebuilt| {
                rebuilt
                    .objects
                    .iter()
                    .map(|o| o.id().as_str().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(ids, vec!["o0", "o1", "o2"]);
        assert!(manager.recover_page("missing", |_| ()).is_none());
    }

    #[test]
    fn test_forget_drops_page() {
        let mut manager = RecoveryManager::default();
        manager.start_snapshots("p1", Instant::now());
        manager.take_snapshot("p1", |id| Some(capture_of(id, 1)));
        manager.forget("p1");
        assert!(manager.latest("p1").is_none());
        assert!(manager.active_page().is_none());
    }
}
