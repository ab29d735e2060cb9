//! Metrics collection and monitoring module
//!
//! Tracks refresh runs, dropped triggers and provider call latency for the
//! dashboard header, and mirrors the counters into the `metrics` facade.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Provider call category used for labelling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Snapshots,
    Ohlc,
}

impl CallKind {
    fn label(self) -> &'static str {
        match self {
            CallKind::Snapshots => "snapshots",
            CallKind::Ohlc => "ohlc",
        }
    }
}

/// Point-in-time copy of the refresh statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub triggers_dropped: u64,
    pub fetch_successes: u64,
    pub fetch_failures: u64,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub last_completed: Option<DateTime<Local>>,
}

/// Shared refresh statistics, safe to update from the background task
pub struct RefreshStats {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    triggers_dropped: AtomicU64,
    fetch_successes: AtomicU64,
    fetch_failures: AtomicU64,
    latency_samples: Mutex<VecDeque<u64>>,
    last_completed: Mutex<Option<DateTime<Local>>>,
    max_samples: usize,
}

impl RefreshStats {
    /// Create a new stats collector keeping at most `max_samples` latencies
    pub fn new(max_samples: usize) -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            triggers_dropped: AtomicU64::new(0),
            fetch_successes: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            latency_samples: Mutex::new(VecDeque::with_capacity(max_samples)),
            last_completed: Mutex::new(None),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("cryptopanel_refresh_runs_total");
    }

    pub fn record_run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        *self.last_completed.lock() = Some(Local::now());
    }

    pub fn record_trigger_dropped(&self) {
        self.triggers_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("cryptopanel_refresh_triggers_dropped_total");
    }

    /// Record the outcome and latency of one provider call
    pub fn record_call(&self, kind: CallKind, success: bool, elapsed: Duration) {
        if success {
            self.fetch_successes.fetch_add(1, Ordering::Relaxed);
            metrics::increment_counter!("cryptopanel_fetch_success_total", "kind" => kind.label());
        } else {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
            metrics::increment_counter!("cryptopanel_fetch_failure_total", "kind" => kind.label());
        }

        let mut samples = self.latency_samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_millis() as u64);
    }

    /// Calculate latency percentiles (p50, p95)
    pub fn calculate_percentiles(&self) -> (u64, u64) {
        let samples = self.latency_samples.lock();
        if samples.is_empty() {
            return (0, 0);
        }

        let mut sorted: Vec<u64> = samples.iter().copied().collect();
        sorted.sort_unstable();

        let len = sorted.len();
        let p50 = sorted[((len * 50) / 100).min(len - 1)];
        let p95 = sorted[((len * 95) / 100).min(len - 1)];

        (p50, p95)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let (latency_p50_ms, latency_p95_ms) = self.calculate_percentiles();
        StatsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            triggers_dropped: self.triggers_dropped.load(Ordering::Relaxed),
            fetch_successes: self.fetch_successes.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            latency_p50_ms,
            latency_p95_ms,
            last_completed: *self.last_completed.lock(),
        }
    }
}

impl Default for RefreshStats {
    fn default() -> Self {
        Self::new(256)
    }
}
