//! Sliding-window activity tracking per source.
//!
//! Anomaly and behavioral scoring work from measured request history, so
//! the engine keeps real timestamps per source instead of synthetic
//! counters. The tracker is owned by the caller of the detector and
//! verifier; the scoring code itself only ever sees a snapshot.

use dashmap::DashMap;
use std::collections::VecDeque;

use crate::types::now_millis;

/// Snapshot of one source's recent activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivitySnapshot {
    /// Requests observed inside the window, including the current one.
    pub recent_requests: u32,

    /// Mean spacing between consecutive requests in the window, present
    /// once at least two were observed.
    pub mean_interval_ms: Option<u64>,
}

/// Rolling per-key request history, bounded per key and windowed in time.
pub struct ActivityTracker {
    window_ms: u64,
    max_samples: usize,
    samples: DashMap<String, VecDeque<u64>>,
}

impl ActivityTracker {
    pub fn new(window_ms: u64, max_samples: usize) -> Self {
        Self {
            window_ms,
            max_samples: max_samples.max(2),
            samples: DashMap::new(),
        }
    }

    /// Record a hit for `key` and return the updated snapshot.
    pub fn record(&self, key: &str) -> ActivitySnapshot {
        let now = now_millis();
        let mut samples = self.samples.entry(key.to_string()).or_default();
        samples.push_back(now);
        Self::trim(&mut samples, now, self.window_ms, self.max_samples);
        Self::summarize(&samples)
    }

    /// Snapshot without recording a hit.
    pub fn snapshot(&self, key: &str) -> ActivitySnapshot {
        let now = now_millis();
        match self.samples.get_mut(key).as_deref_mut() {
            Some(samples) => {
                Self::trim(samples, now, self.window_ms, self.max_samples);
                Self::summarize(samples)
            }
            None => ActivitySnapshot::default(),
        }
    }

    /// Drop keys whose whole history fell out of the window.
    pub fn prune(&self) {
        let cutoff = now_millis().saturating_sub(self.window_ms);
        self.samples
            .retain(|_, samples| samples.back().is_some_and(|last| *last >= cutoff));
    }

    pub fn tracked_sources(&self) -> usize {
        self.samples.len()
    }

    fn trim(samples: &mut VecDeque<u64>, now: u64, window_ms: u64, max_samples: usize) {
        let cutoff = now.saturating_sub(window_ms);
        while samples.front().is_some_and(|t| *t < cutoff) {
            samples.pop_front();
        }
        while samples.len() > max_samples {
            samples.pop_front();
        }
    }

    fn summarize(samples: &VecDeque<u64>) -> ActivitySnapshot {
        let count = samples.len();
        let mean_interval_ms = match (samples.front(), samples.back()) {
            (Some(first), Some(last)) if count >= 2 => {
                Some((last - first) / (count as u64 - 1))
            }
            _ => None,
        };
        ActivitySnapshot {
            recent_requests: count as u32,
            mean_interval_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_hits_within_window() {
        let tracker = ActivityTracker::new(10_000, 64);
        for _ in 0..5 {
            tracker.record("ip:198.51.100.7");
        }
        let snapshot = tracker.snapshot("ip:198.51.100.7");
        assert_eq!(snapshot.recent_requests, 5);
        assert!(snapshot.mean_interval_ms.is_some());
    }

    #[test]
    fn unknown_key_reads_as_idle() {
        let tracker = ActivityTracker::new(10_000, 64);
        let snapshot = tracker.snapshot("ip:nobody");
        assert_eq!(snapshot.recent_requests, 0);
        assert_eq!(snapshot.mean_interval_ms, None);
    }

    #[test]
    fn old_samples_fall_out_of_the_window() {
        let tracker = ActivityTracker::new(50, 64);
        tracker.record("k");
        tracker.record("k");
        std::thread::sleep(std::time::Duration::from_millis(80));
        let snapshot = tracker.snapshot("k");
        assert_eq!(snapshot.recent_requests, 0);
    }

    #[test]
    fn per_key_history_is_bounded() {
        let tracker = ActivityTracker::new(60_000, 8);
        for _ in 0..50 {
            tracker.record("k");
        }
        assert!(tracker.snapshot("k").recent_requests <= 8);
    }

    #[test]
    fn prune_drops_idle_sources() {
        let tracker = ActivityTracker::new(50, 64);
        tracker.record("a");
        std::thread::sleep(std::time::Duration::from_millis(80));
        tracker.record("b");
        tracker.prune();
        assert_eq!(tracker.tracked_sources(), 1);
    }
}
