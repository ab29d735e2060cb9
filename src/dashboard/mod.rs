//! Progressive refresh controller
//!
//! A single-flight background worker fills the [`MarketCache`] one step at a
//! time and raises the [`RedrawGate`] after every partial update. The
//! [`Scheduler`] drives the worker from a slow timer and the [`Renderer`] from a
//! one second timer that only repaints asset panels when the gate is raised.

pub mod cache;
pub mod countdown;
pub mod events;
pub mod gate;
pub mod scheduler;
pub mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::AssetConfig;
use crate::metrics::RefreshStats;
use crate::provider::{MarketSnapshot, OhlcSeries};

pub use cache::{MarketCache, SharedCache};
pub use countdown::Countdown;
pub use events::{RefreshChannel, RefreshEvent};
pub use gate::RedrawGate;
pub use scheduler::Scheduler;
pub use worker::{FetchOutcome, Pacing, RefreshReport, RefreshWorker};

/// What an asset panel can show, classified from one consistent cache read
#[derive(Debug, Clone, PartialEq)]
pub enum PanelState {
    /// Snapshot and a series from the most recent OHLC fetch
    Fresh {
        snapshot: MarketSnapshot,
        series: Arc<OhlcSeries>,
    },
    /// A series from an earlier run, kept while the latest OHLC fetch failed
    Stale {
        snapshot: Option<MarketSnapshot>,
        series: Arc<OhlcSeries>,
    },
    /// Market figures arrived, chart still pending
    SnapshotOnly { snapshot: MarketSnapshot },
    /// Nothing usable yet
    Loading,
    /// OHLC fetch failed and no earlier series exists
    Failed { snapshot: Option<MarketSnapshot> },
}

impl PanelState {
    pub fn snapshot(&self) -> Option<&MarketSnapshot> {
        match self {
            PanelState::Fresh { snapshot, .. } | PanelState::SnapshotOnly { snapshot } => {
                Some(snapshot)
            }
            PanelState::Stale { snapshot, .. } | PanelState::Failed { snapshot } => {
                snapshot.as_ref()
            }
            PanelState::Loading => None,
        }
    }

    pub fn series(&self) -> Option<&OhlcSeries> {
        match self {
            PanelState::Fresh { series, .. } | PanelState::Stale { series, .. } => Some(series),
            _ => None,
        }
    }

    /// Short label used by log lines and the console renderer
    pub fn label(&self) -> &'static str {
        match self {
            PanelState::Fresh { .. } => "fresh",
            PanelState::Stale { .. } => "stale",
            PanelState::SnapshotOnly { .. } => "snapshot",
            PanelState::Loading => "loading",
            PanelState::Failed { .. } => "failed",
        }
    }
}

/// Drawing capability consumed by the scheduler
pub trait Renderer {
    /// Draw one asset panel from the current cache contents
    fn render_asset_panel(&mut self, asset: &AssetConfig, state: &PanelState);

    /// Draw the countdown clock
    fn render_clock_panel(&mut self, seconds_remaining: u64, interval_total: u64);

    /// Flush everything drawn during the current tick
    fn present(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Shared state handed to both the refresh worker and the render loop
#[derive(Clone, Default)]
pub struct DashboardState {
    pub cache: SharedCache,
    pub gate: Arc<RedrawGate>,
    pub busy: Arc<AtomicBool>,
    pub stats: Arc<RefreshStats>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh run is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
