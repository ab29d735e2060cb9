//! Mock market data provider
//! Used for tests and the offline demo dashboard where real network access is unavailable

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep};

use super::{
    AssetId, AssetListing, MarketDataProvider, MarketSnapshot, OhlcCandle, OhlcSeries,
    ProviderError,
};

const DAY_MS: i64 = 86_400_000;
const SYNTHETIC_EPOCH_MS: i64 = 1_700_000_000_000;

/// Scripted result of one mock call
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Return synthetic data
    Succeed,
    /// Return the given error
    Fail(ProviderError),
    /// Never answer within any reasonable deadline
    Hang,
    /// Panic inside the provider call
    Panic,
}

/// Kind of call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCallKind {
    Snapshots(Vec<AssetId>),
    Ohlc { asset: AssetId, lookback_days: u32 },
    TopAssets(usize),
    SpotPrices(Vec<AssetId>),
}

/// Recorded call with the (tokio) instant it was received
#[derive(Debug, Clone)]
pub struct MockCall {
    pub kind: MockCallKind,
    pub at: Instant,
}

/// In-process provider producing deterministic synthetic market data
pub struct MockProvider {
    latency: Duration,
    snapshot_script: Mutex<VecDeque<MockOutcome>>,
    ohlc_scripts: Mutex<HashMap<AssetId, VecDeque<MockOutcome>>>,
    spot_script: Mutex<VecDeque<MockOutcome>>,
    calls: Mutex<Vec<MockCall>>,
    round: AtomicU64,
}

impl MockProvider {
    /// Create a mock that answers every call successfully and instantly
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            snapshot_script: Mutex::new(VecDeque::new()),
            ohlc_scripts: Mutex::new(HashMap::new()),
            spot_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            round: AtomicU64::new(0),
        }
    }

    /// Simulate network latency on every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue outcomes for upcoming snapshot calls; unscripted calls succeed
    pub fn script_snapshots(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.snapshot_script.lock().extend(outcomes);
    }

    /// Queue outcomes for upcoming OHLC calls of one asset
    pub fn script_ohlc(&self, asset: &AssetId, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.ohlc_scripts
            .lock()
            .entry(asset.clone())
            .or_default()
            .extend(outcomes);
    }

    /// Queue outcomes for upcoming spot price calls
    pub fn script_spot_prices(&self, outcomes: impl IntoIterator<Item = MockOutcome>) {
        self.spot_script.lock().extend(outcomes);
    }

    /// All calls received so far, in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of OHLC calls received for an asset
    pub fn ohlc_calls_for(&self, asset: &AssetId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(&call.kind, MockCallKind::Ohlc { asset: a, .. } if a == asset))
            .count()
    }

    fn record(&self, kind: MockCallKind) -> u64 {
        self.calls.lock().push(MockCall {
            kind,
            at: Instant::now(),
        });
        self.round.fetch_add(1, Ordering::SeqCst)
    }

    async fn resolve(&self, outcome: MockOutcome) -> Result<(), ProviderError> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        match outcome {
            MockOutcome::Succeed => Ok(()),
            MockOutcome::Fail(error) => Err(error),
            MockOutcome::Hang => {
                sleep(Duration::from_secs(24 * 3600)).await;
                Err(ProviderError::Timeout(Duration::from_secs(24 * 3600)))
            }
            MockOutcome::Panic => panic!("simulated provider panic"),
        }
    }

    fn next_outcome(script: &Mutex<VecDeque<MockOutcome>>) -> MockOutcome {
        script.lock().pop_front().unwrap_or(MockOutcome::Succeed)
    }

    /// Deterministic reference price derived from the asset id
    pub fn base_price(asset: &AssetId) -> f64 {
        let seed: u64 = asset.as_str().bytes().map(u64::from).sum();
        let magnitude = 10f64.powi((seed % 5) as i32 + 1);
        magnitude * (1.0 + (seed % 7) as f64 / 10.0)
    }

    /// Synthetic snapshot for an asset at a given round
    pub fn synthetic_snapshot(asset: &AssetId, round: u64) -> MarketSnapshot {
        let base = Self::base_price(asset);
        let drift = ((round as f64) * 0.7).sin() * 0.03;
        let price = base * (1.0 + drift);
        MarketSnapshot {
            current_price: price,
            change_24h_pct: drift * 100.0,
            high_24h: price * 1.02,
            low_24h: price * 0.97,
            volume_24h: base * 25_000.0,
        }
    }

    /// Synthetic OHLC series following the provider's candle granularity
    pub fn synthetic_series(asset: &AssetId, lookback_days: u32, round: u64) -> OhlcSeries {
        let days = lookback_days.max(1) as i64;
        let (count, step_ms) = match days {
            1..=2 => (days * 48, DAY_MS / 48),
            3..=30 => (days * 6, DAY_MS / 6),
            _ => ((days / 4).max(1), DAY_MS * 4),
        };

        let base = Self::base_price(asset);
        let phase = round as f64 * 0.37;
        let end_ms = SYNTHETIC_EPOCH_MS + round as i64 * 60_000;
        let mut open = base;

        let candles = (0..count)
            .map(|idx| {
                let t = idx as f64 * 0.21 + phase;
                let close = base * (1.0 + t.sin() * 0.05 + (t * 0.33).cos() * 0.02);
                let high = open.max(close) * 1.006;
                let low = open.min(close) * 0.994;
                let candle = OhlcCandle {
                    timestamp_ms: end_ms - (count - 1 - idx) * step_ms,
                    open,
                    high,
                    low,
                    close,
                };
                open = close;
                candle
            })
            .collect();

        OhlcSeries::from_candles(candles)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_snapshots(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, MarketSnapshot>, ProviderError> {
        let round = self.record(MockCallKind::Snapshots(assets.to_vec()));
        self.resolve(Self::next_outcome(&self.snapshot_script)).await?;

        Ok(assets
            .iter()
            .map(|asset| (asset.clone(), Self::synthetic_snapshot(asset, round)))
            .collect())
    }

    async fn fetch_ohlc(
        &self,
        asset: &AssetId,
        lookback_days: u32,
    ) -> Result<OhlcSeries, ProviderError> {
        let round = self.record(MockCallKind::Ohlc {
            asset: asset.clone(),
            lookback_days,
        });

        let outcome = self
            .ohlc_scripts
            .lock()
            .get_mut(asset)
            .and_then(VecDeque::pop_front)
            .unwrap_or(MockOutcome::Succeed);
        self.resolve(outcome).await?;

        Ok(Self::synthetic_series(asset, lookback_days, round))
    }

    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetListing>, ProviderError> {
        self.record(MockCallKind::TopAssets(limit));
        self.resolve(MockOutcome::Succeed).await?;

        const CATALOG: [(&str, &str, &str); 8] = [
            ("bitcoin", "btc", "Bitcoin"),
            ("ethereum", "eth", "Ethereum"),
            ("tether", "usdt", "Tether"),
            ("binancecoin", "bnb", "BNB"),
            ("solana", "sol", "Solana"),
            ("ripple", "xrp", "XRP"),
            ("cardano", "ada", "Cardano"),
            ("dogecoin", "doge", "Dogecoin"),
        ];

        Ok(CATALOG
            .iter()
            .take(limit)
            .enumerate()
            .map(|(idx, (id, symbol, name))| {
                let id = AssetId::from(*id);
                AssetListing {
                    current_price: Self::base_price(&id),
                    id,
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    market_cap_rank: Some(idx as u32 + 1),
                }
            })
            .collect())
    }

    async fn fetch_spot_prices(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, f64>, ProviderError> {
        let round = self.record(MockCallKind::SpotPrices(assets.to_vec()));
        self.resolve(Self::next_outcome(&self.spot_script)).await?;

        Ok(assets
            .iter()
            .map(|asset| {
                (
                    asset.clone(),
                    Self::synthetic_snapshot(asset, round).current_price,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_snapshots_cover_requested_assets() {
        let provider = MockProvider::new();
        let assets = vec![AssetId::from("bitcoin"), AssetId::from("ethereum")];

        let snapshots = provider.fetch_snapshots(&assets).await.unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[&assets[0]].current_price > 0.0);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure_then_success() {
        let provider = MockProvider::new();
        let asset = AssetId::from("cardano");
        provider.script_ohlc(&asset, [MockOutcome::Fail(ProviderError::Status(429, "slow down".into()))]);

        let first = provider.fetch_ohlc(&asset, 30).await;
        assert!(matches!(first, Err(ProviderError::Status(429, _))));

        let second = provider.fetch_ohlc(&asset, 30).await.unwrap();
        assert_eq!(second.len(), 180);
        assert_eq!(provider.ohlc_calls_for(&asset), 2);
    }

    #[test]
    fn test_synthetic_series_granularity() {
        let asset = AssetId::from("bitcoin");
        assert_eq!(MockProvider::synthetic_series(&asset, 1, 0).len(), 48);
        assert_eq!(MockProvider::synthetic_series(&asset, 7, 0).len(), 42);
        assert_eq!(MockProvider::synthetic_series(&asset, 90, 0).len(), 22);
    }

    #[test]
    fn test_synthetic_series_changes_between_rounds() {
        let asset = AssetId::from("solana");
        let first = MockProvider::synthetic_series(&asset, 30, 1);
        let second = MockProvider::synthetic_series(&asset, 30, 2);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_mock_top_assets_respects_limit() {
        let provider = MockProvider::new();
        let listings = provider.fetch_top_assets(5).await.unwrap();
        assert_eq!(listings.len(), 5);
        assert_eq!(listings[0].id, AssetId::from("bitcoin"));
        assert_eq!(listings[4].market_cap_rank, Some(5));
    }
}
