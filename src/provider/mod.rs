//! Market data provider integration module
//!
//! Defines the data shapes consumed by the dashboard and the provider trait
//! implemented by the CoinGecko REST client and the in-process mock.

pub mod coingecko;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

// Re-export commonly used types
pub use coingecko::CoinGeckoClient;
pub use mock::{MockCall, MockCallKind, MockOutcome, MockProvider};

/// Stable identifier of a tracked asset (the provider's coin id, e.g. `bitcoin`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Current market figures for one asset
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketSnapshot {
    pub current_price: f64,
    pub change_24h_pct: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub volume_24h: f64,
}

/// Single open/high/low/close record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcCandle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Time-ordered candle series covering the configured lookback window
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OhlcSeries {
    candles: Vec<OhlcCandle>,
}

impl OhlcSeries {
    /// Build a series, ordering candles by timestamp
    pub fn from_candles(mut candles: Vec<OhlcCandle>) -> Self {
        candles.sort_by_key(|candle| candle.timestamp_ms);
        Self { candles }
    }

    pub fn candles(&self) -> &[OhlcCandle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&OhlcCandle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&OhlcCandle> {
        self.candles.last()
    }

    /// Lowest low and highest high across the series
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.candles.iter().fold(None, |range, candle| match range {
            None => Some((candle.low, candle.high)),
            Some((min, max)) => Some((min.min(candle.low), max.max(candle.high))),
        })
    }
}

/// Entry of the provider's market-cap ranking, used by the launcher
#[derive(Debug, Clone, PartialEq)]
pub struct AssetListing {
    pub id: AssetId,
    pub symbol: String,
    pub name: String,
    pub market_cap_rank: Option<u32>,
    pub current_price: f64,
}

/// Error types for provider calls
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Http(String),
    #[error("HTTP status error: {0} - {1}")]
    Status(u16, String),
    #[error("Parse error: {0}")]
    Decode(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Provider returned no data")]
    Empty,
}

/// Capability the dashboard consumes to obtain market data
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human readable provider name for logs
    fn name(&self) -> &str;

    /// Fetch current snapshots for all assets in a single batch request
    async fn fetch_snapshots(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, MarketSnapshot>, ProviderError>;

    /// Fetch the OHLC series of one asset over the lookback window
    async fn fetch_ohlc(
        &self,
        asset: &AssetId,
        lookback_days: u32,
    ) -> Result<OhlcSeries, ProviderError>;

    /// Fetch the top assets ranked by market capitalisation
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetListing>, ProviderError>;

    /// Fetch plain spot prices, used by the history tracker
    async fn fetch_spot_prices(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, f64>, ProviderError>;
}
