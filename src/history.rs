//! history.rs — In-memory snapshot series + run log for trend context and
//! debug endpoints. Volatile only; nothing is persisted across restarts.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::momentum::Trend;
use crate::snapshot::MetricSnapshot;

/// Bounded, chronologically ordered snapshot series. The scorer consumes
/// the whole series; `record` trims entries older than the caller's time
/// window relative to the newest snapshot.
#[derive(Debug)]
pub struct SnapshotHistory {
    inner: Mutex<VecDeque<MetricSnapshot>>,
    cap: usize,
}

impl SnapshotHistory {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            cap: cap.clamp(1, 10_000),
        }
    }

    /// Append a snapshot and trim to `time_window_hours` behind the newest
    /// timestamp. Out-of-order arrivals are inserted by timestamp so the
    /// series stays chronological.
    pub fn record(&self, snapshot: MetricSnapshot, time_window_hours: u32) {
        let mut buf = self.inner.lock().expect("snapshot history mutex poisoned");

        let pos = buf
            .iter()
            .rposition(|s| s.timestamp <= snapshot.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        buf.insert(pos, snapshot);

        let newest = buf.back().map(|s| s.timestamp).unwrap_or(0);
        let window_ms = u64::from(time_window_hours).saturating_mul(3_600_000);
        let cutoff = newest.saturating_sub(window_ms);
        while let Some(front) = buf.front() {
            if front.timestamp < cutoff {
                buf.pop_front();
            } else {
                break;
            }
        }
        while buf.len() > self.cap {
            buf.pop_front();
        }
    }

    /// Clone of the current series, oldest first.
    pub fn series(&self) -> Vec<MetricSnapshot> {
        let buf = self.inner.lock().expect("snapshot history mutex poisoned");
        buf.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("snapshot history mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compact fingerprint of one analysis run for quick diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ts: DateTime<Utc>,
    pub snapshot_timestamp: u64,
    pub overall: f64,
    pub trend: Trend,
    pub confidence: f64,
    pub alert_count: usize,
    pub insight_available: bool,
}

#[derive(Debug)]
pub struct RunLog {
    inner: Mutex<Vec<RunSummary>>,
    cap: usize,
}

impl RunLog {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, summary: RunSummary) {
        let mut v = self.inner.lock().expect("run log mutex poisoned");
        v.push(summary);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunSummary> {
        let v = self.inner.lock().expect("run log mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}
