//! Latest known market state per asset

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::PanelState;
use crate::provider::{AssetId, MarketSnapshot, OhlcSeries};

pub type SharedCache = Arc<MarketCache>;

#[derive(Default)]
struct CacheInner {
    snapshots: HashMap<AssetId, MarketSnapshot>,
    series: HashMap<AssetId, Arc<OhlcSeries>>,
    failed: HashSet<AssetId>,
}

/// Cache written by the refresh worker and read by the render pass.
///
/// Every mutation is a whole-value replacement under one write lock, so a
/// reader never sees a half-applied snapshot batch.
#[derive(Default)]
pub struct MarketCache {
    inner: RwLock<CacheInner>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_snapshot(&self, asset: &AssetId) -> Option<MarketSnapshot> {
        self.inner.read().snapshots.get(asset).copied()
    }

    pub fn get_series(&self, asset: &AssetId) -> Option<Arc<OhlcSeries>> {
        self.inner.read().series.get(asset).cloned()
    }

    pub fn has_failed(&self, asset: &AssetId) -> bool {
        self.inner.read().failed.contains(asset)
    }

    /// Replace every snapshot with the given batch
    pub fn set_snapshot_batch(&self, batch: HashMap<AssetId, MarketSnapshot>) {
        self.inner.write().snapshots = batch;
    }

    /// Replace the series of one asset
    pub fn set_series(&self, asset: &AssetId, series: OhlcSeries) {
        self.inner
            .write()
            .series
            .insert(asset.clone(), Arc::new(series));
    }

    pub fn mark_failed(&self, asset: &AssetId) {
        self.inner.write().failed.insert(asset.clone());
    }

    pub fn clear_failed(&self, asset: &AssetId) {
        self.inner.write().failed.remove(asset);
    }

    /// Store a freshly fetched series and clear the failure mark in one step
    pub fn apply_series(&self, asset: &AssetId, series: OhlcSeries) {
        let mut inner = self.inner.write();
        inner.series.insert(asset.clone(), Arc::new(series));
        inner.failed.remove(asset);
    }

    /// Assets whose latest OHLC fetch failed, sorted by id
    pub fn failed_assets(&self) -> Vec<AssetId> {
        let mut failed: Vec<AssetId> = self.inner.read().failed.iter().cloned().collect();
        failed.sort();
        failed
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.read().snapshots.len()
    }

    /// Classify what the panel of `asset` should show
    pub fn panel_state(&self, asset: &AssetId) -> PanelState {
        let inner = self.inner.read();
        let snapshot = inner.snapshots.get(asset).copied();
        let series = inner.series.get(asset).cloned();
        let failed = inner.failed.contains(asset);

        match (series, snapshot, failed) {
            (Some(series), snapshot, true) => PanelState::Stale { snapshot, series },
            (Some(series), Some(snapshot), false) => PanelState::Fresh { snapshot, series },
            // a chart without market figures waits for the next snapshot batch
            (Some(_), None, false) => PanelState::Loading,
            (None, snapshot, true) => PanelState::Failed { snapshot },
            (None, Some(snapshot), false) => PanelState::SnapshotOnly { snapshot },
            (None, None, false) => PanelState::Loading,
        }
    }
}
