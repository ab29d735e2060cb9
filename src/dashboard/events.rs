//! Refresh events published by the worker for the activity log

use std::fmt;
use tokio::sync::mpsc;

use crate::provider::AssetId;

/// Progress notifications emitted during a refresh run
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    /// A run acquired the busy flag
    RunStarted { run_id: u64 },
    /// A trigger arrived while a run was in flight
    TriggerDropped,
    /// Snapshot batch stored
    SnapshotsUpdated { count: usize },
    /// Snapshot batch failed; cached snapshots kept
    SnapshotsFailed { error: String },
    /// New series stored for an asset
    SeriesUpdated { asset: AssetId, candles: usize },
    /// OHLC fetch failed for an asset
    SeriesFailed { asset: AssetId, error: String },
    /// Run ended and released the busy flag
    RunFinished {
        run_id: u64,
        succeeded: usize,
        failed: usize,
    },
}

impl fmt::Display for RefreshEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshEvent::RunStarted { run_id } => write!(f, "refresh #{} started", run_id),
            RefreshEvent::TriggerDropped => write!(f, "refresh already running, trigger ignored"),
            RefreshEvent::SnapshotsUpdated { count } => {
                write!(f, "market data updated for {} assets", count)
            }
            RefreshEvent::SnapshotsFailed { error } => write!(f, "market data failed: {}", error),
            RefreshEvent::SeriesUpdated { asset, candles } => {
                write!(f, "{} chart loaded ({} candles)", asset, candles)
            }
            RefreshEvent::SeriesFailed { asset, error } => {
                write!(f, "{} chart failed: {}", asset, error)
            }
            RefreshEvent::RunFinished {
                run_id,
                succeeded,
                failed,
            } => write!(
                f,
                "refresh #{} finished: {} ok, {} failed",
                run_id, succeeded, failed
            ),
        }
    }
}

/// Unbounded event channel between the worker task and the UI
pub struct RefreshChannel {
    event_tx: mpsc::UnboundedSender<RefreshEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<RefreshEvent>>,
}

impl RefreshChannel {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Get event sender for external use
    pub fn event_tx(&self) -> mpsc::UnboundedSender<RefreshEvent> {
        self.event_tx.clone()
    }

    /// Take the receiver; only the first call returns it
    pub fn event_rx(&mut self) -> Option<mpsc::UnboundedReceiver<RefreshEvent>> {
        self.event_rx.take()
    }
}

impl Default for RefreshChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain everything currently queued without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<RefreshEvent>) -> Vec<RefreshEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
