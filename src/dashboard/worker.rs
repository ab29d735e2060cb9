//! Single-flight progressive refresh worker

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use super::DashboardState;
use super::events::RefreshEvent;
use crate::config::RefreshConfig;
use crate::metrics::CallKind;
use crate::provider::{AssetId, MarketDataProvider, ProviderError};

/// Delays applied between provider calls within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after a successful snapshot batch, before the first OHLC call
    pub settle_delay: Duration,
    /// Pause between two consecutive OHLC calls
    pub stagger_delay: Duration,
    /// Deadline for every individual provider call
    pub call_timeout: Duration,
}

impl Pacing {
    pub fn from_config(config: &RefreshConfig) -> Self {
        Self {
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            stagger_delay: Duration::from_secs(config.stagger_delay_secs),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    /// No pauses at all, for tests and demo runs
    pub fn immediate(call_timeout: Duration) -> Self {
        Self {
            settle_delay: Duration::ZERO,
            stagger_delay: Duration::ZERO,
            call_timeout,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from_config(&RefreshConfig::default())
    }
}

/// Result of one provider call inside a run
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Updated,
    Failed(String),
}

impl FetchOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, FetchOutcome::Updated)
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub run_id: u64,
    pub snapshots: FetchOutcome,
    /// Per-asset OHLC outcome in configured order
    pub series: Vec<(AssetId, FetchOutcome)>,
}

impl RefreshReport {
    pub fn series_updated(&self) -> usize {
        self.series.iter().filter(|(_, o)| o.is_updated()).count()
    }

    pub fn series_failed(&self) -> usize {
        self.series.len() - self.series_updated()
    }

    pub fn outcome_for(&self, asset: &AssetId) -> Option<&FetchOutcome> {
        self.series
            .iter()
            .find(|(id, _)| id == asset)
            .map(|(_, outcome)| outcome)
    }
}

/// Holds the busy flag for the lifetime of a run; dropping it clears the
/// flag, including while unwinding from a panic.
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Background worker that fills the cache one call at a time
#[derive(Clone)]
pub struct RefreshWorker {
    provider: Arc<dyn MarketDataProvider>,
    state: DashboardState,
    assets: Arc<[AssetId]>,
    lookback_days: u32,
    pacing: Pacing,
    events: Option<mpsc::UnboundedSender<RefreshEvent>>,
    runs: Arc<AtomicU64>,
}

impl RefreshWorker {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        state: DashboardState,
        assets: Vec<AssetId>,
        lookback_days: u32,
        pacing: Pacing,
    ) -> Self {
        Self {
            provider,
            state,
            assets: assets.into(),
            lookback_days,
            pacing,
            events: None,
            runs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish progress events on the given channel
    pub fn with_events(mut self, events: mpsc::UnboundedSender<RefreshEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Start a run on a background task.
    ///
    /// Returns `None` without side effects on the cache when a run is
    /// already in flight; the trigger is dropped, not queued.
    pub fn try_spawn(&self) -> Option<JoinHandle<RefreshReport>> {
        let guard = self.acquire()?;
        let worker = self.clone();
        Some(tokio::spawn(async move { worker.run_cycle(guard).await }))
    }

    /// Run one cycle on the current task, unless a run is already in flight
    pub async fn run_once(&self) -> Option<RefreshReport> {
        let guard = self.acquire()?;
        Some(self.run_cycle(guard).await)
    }

    fn acquire(&self) -> Option<BusyGuard> {
        let guard = BusyGuard::acquire(&self.state.busy);
        if guard.is_none() {
            debug!("Refresh already in progress, trigger dropped");
            self.state.stats.record_trigger_dropped();
            self.emit(RefreshEvent::TriggerDropped);
        }
        guard
    }

    async fn run_cycle(&self, _guard: BusyGuard) -> RefreshReport {
        let run_id = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.stats.record_run_started();
        info!(
            "Refresh #{} started for {} assets via {}",
            run_id,
            self.assets.len(),
            self.provider.name()
        );
        self.emit(RefreshEvent::RunStarted { run_id });

        // Step 1: one batch call for every asset's market figures
        let snapshots = match self
            .call(CallKind::Snapshots, self.provider.fetch_snapshots(&self.assets))
            .await
        {
            Ok(batch) => {
                let count = batch.len();
                self.state.cache.set_snapshot_batch(batch);
                self.state.gate.raise();
                info!("Market snapshots updated for {} assets", count);
                self.emit(RefreshEvent::SnapshotsUpdated { count });

                self.pause(self.pacing.settle_delay, "after market snapshots")
                    .await;
                FetchOutcome::Updated
            }
            Err(e) => {
                warn!("Market snapshot fetch failed, keeping cached values: {}", e);
                self.emit(RefreshEvent::SnapshotsFailed {
                    error: e.to_string(),
                });
                FetchOutcome::Failed(e.to_string())
            }
        };

        // Step 2: one OHLC call per asset, in configured order, staggered
        let mut series = Vec::with_capacity(self.assets.len());
        for (idx, asset) in self.assets.iter().enumerate() {
            let outcome = match self
                .call(
                    CallKind::Ohlc,
                    self.provider.fetch_ohlc(asset, self.lookback_days),
                )
                .await
            {
                Ok(fetched) => {
                    let candles = fetched.len();
                    self.state.cache.apply_series(asset, fetched);
                    self.state.gate.raise();
                    info!("OHLC for {} loaded: {} candles", asset, candles);
                    self.emit(RefreshEvent::SeriesUpdated {
                        asset: asset.clone(),
                        candles,
                    });
                    FetchOutcome::Updated
                }
                Err(e) => {
                    self.state.cache.mark_failed(asset);
                    warn!("OHLC fetch for {} failed: {}", asset, e);
                    self.emit(RefreshEvent::SeriesFailed {
                        asset: asset.clone(),
                        error: e.to_string(),
                    });
                    FetchOutcome::Failed(e.to_string())
                }
            };
            series.push((asset.clone(), outcome));

            if idx + 1 < self.assets.len() {
                self.pause(self.pacing.stagger_delay, "before next asset")
                    .await;
            }
        }

        let report = RefreshReport {
            run_id,
            snapshots,
            series,
        };

        self.state.stats.record_run_completed();
        info!(
            "Refresh #{} finished: {} charts updated, {} failed",
            run_id,
            report.series_updated(),
            report.series_failed()
        );
        self.emit(RefreshEvent::RunFinished {
            run_id,
            succeeded: report.series_updated(),
            failed: report.series_failed(),
        });

        report
    }

    /// Await a provider call under the per-call deadline
    async fn call<T>(
        &self,
        kind: CallKind,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let started = Instant::now();
        let result = match timeout(self.pacing.call_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.pacing.call_timeout)),
        };

        self.state
            .stats
            .record_call(kind, result.is_ok(), started.elapsed());
        result
    }

    async fn pause(&self, delay: Duration, reason: &str) {
        if delay.is_zero() {
            return;
        }
        debug!("Pausing {:?} {}", delay, reason);
        sleep(delay).await;
    }

    fn emit(&self, event: RefreshEvent) {
        if let Some(tx) = &self.events {
            // the UI may already be gone during shutdown
            let _ = tx.send(event);
        }
    }
}
