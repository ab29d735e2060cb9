//! Flat append-only price history
//!
//! The tracker polls spot prices on a fixed interval and appends one CSV row
//! per asset; the summary reads the file back for the `chart` command.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use crate::config::HistoryConfig;
use crate::provider::{AssetId, MarketDataProvider, ProviderError};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: String,
    pub asset: String,
    pub price: f64,
}

/// CSV file holding every recorded price
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    /// Open the log, creating it with a header row when it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                let mut writer = csv::Writer::from_writer(file);
                writer.write_record(["timestamp", "asset", "price"])?;
                writer.flush()?;
                info!("History file '{}' created", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                info!(
                    "History file '{}' already exists, appending new rows",
                    path.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create history file: {}", path.display())
                });
            }
        }

        Ok(Self { path })
    }

    /// Handle to an existing log without touching the file
    pub fn existing<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, records: &[PriceRecord]) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<PriceRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to read history file: {}", self.path.display()))?;

        reader
            .deserialize()
            .collect::<std::result::Result<Vec<PriceRecord>, _>>()
            .with_context(|| format!("Malformed history file: {}", self.path.display()))
    }
}

/// Direction of a price compared with the previous round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMove {
    First,
    Up,
    Down,
    Unchanged,
}

impl PriceMove {
    fn between(previous: Option<f64>, current: f64) -> Self {
        match previous {
            None => PriceMove::First,
            Some(prev) if current > prev => PriceMove::Up,
            Some(prev) if current < prev => PriceMove::Down,
            Some(_) => PriceMove::Unchanged,
        }
    }
}

/// Price recorded for one asset in a round
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPrice {
    pub asset: AssetId,
    pub price: f64,
    pub movement: PriceMove,
}

/// Polls spot prices and appends them to the history log
pub struct PriceTracker {
    provider: Arc<dyn MarketDataProvider>,
    log: HistoryLog,
    assets: Vec<AssetId>,
    previous: HashMap<AssetId, f64>,
    interval: Duration,
    call_timeout: Duration,
}

impl PriceTracker {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        log: HistoryLog,
        assets: Vec<AssetId>,
        interval: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            log,
            assets,
            previous: HashMap::new(),
            interval,
            call_timeout,
        }
    }

    pub fn from_config(
        provider: Arc<dyn MarketDataProvider>,
        config: &HistoryConfig,
        call_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self::new(
            provider,
            HistoryLog::open(&config.file_path)?,
            config.assets.clone(),
            Duration::from_secs(config.interval_secs),
            call_timeout,
        ))
    }

    /// Fetch prices once and append them. A failed fetch records nothing.
    pub async fn record_round(&mut self) -> Result<Vec<TrackedPrice>> {
        let prices = match timeout(self.call_timeout, self.provider.fetch_spot_prices(&self.assets))
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.call_timeout)))
        {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Spot price fetch failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut tracked = Vec::new();
        let mut records = Vec::new();

        for asset in &self.assets {
            let Some(&price) = prices.get(asset) else {
                debug!("No price returned for {}", asset);
                continue;
            };
            if price <= 0.0 {
                continue;
            }

            let movement = PriceMove::between(self.previous.insert(asset.clone(), price), price);
            records.push(PriceRecord {
                timestamp: timestamp.clone(),
                asset: asset.to_string(),
                price,
            });
            tracked.push(TrackedPrice {
                asset: asset.clone(),
                price,
                movement,
            });
        }

        self.log.append(&records)?;
        info!("Recorded {} prices at {}", records.len(), timestamp);
        Ok(tracked)
    }

    /// Record a round every interval until shutdown, reporting each round
    pub async fn run<F>(&mut self, mut shutdown: mpsc::Receiver<()>, mut on_round: F) -> Result<()>
    where
        F: FnMut(&[TrackedPrice]),
    {
        let mut ticker = interval(self.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("Price tracker stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let round = self.record_round().await?;
                    on_round(&round);
                }
            }
        }
        Ok(())
    }
}

/// Per-asset statistics over the whole log
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSummary {
    pub asset: String,
    pub samples: usize,
    pub first_timestamp: String,
    pub last_timestamp: String,
    pub min_price: f64,
    pub max_price: f64,
    pub first_price: f64,
    pub last_price: f64,
}

impl AssetSummary {
    /// Change from the first to the last sample, in percent
    pub fn change_pct(&self) -> f64 {
        if self.first_price == 0.0 {
            return 0.0;
        }
        (self.last_price - self.first_price) / self.first_price * 100.0
    }
}

/// Summaries in order of first appearance in the log
pub fn summarize(records: &[PriceRecord]) -> Vec<AssetSummary> {
    let mut summaries: Vec<AssetSummary> = Vec::new();

    for record in records {
        match summaries.iter_mut().find(|s| s.asset == record.asset) {
            Some(summary) => {
                summary.samples += 1;
                summary.last_timestamp = record.timestamp.clone();
                summary.last_price = record.price;
                summary.min_price = summary.min_price.min(record.price);
                summary.max_price = summary.max_price.max(record.price);
            }
            None => summaries.push(AssetSummary {
                asset: record.asset.clone(),
                samples: 1,
                first_timestamp: record.timestamp.clone(),
                last_timestamp: record.timestamp.clone(),
                min_price: record.price,
                max_price: record.price,
                first_price: record.price,
                last_price: record.price,
            }),
        }
    }

    summaries
}
