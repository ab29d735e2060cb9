//! CoinGecko REST API client implementation

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    AssetId, AssetListing, MarketDataProvider, MarketSnapshot, OhlcCandle, OhlcSeries,
    ProviderError,
};
use crate::config::ProviderConfig;

/// Market entry returned by `/coins/markets`
#[derive(Debug, Deserialize)]
struct MarketEntry {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    total_volume: Option<f64>,
    market_cap_rank: Option<u32>,
}

impl MarketEntry {
    fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            current_price: self.current_price.unwrap_or_default(),
            change_24h_pct: self.price_change_percentage_24h.unwrap_or_default(),
            high_24h: self.high_24h.unwrap_or_default(),
            low_24h: self.low_24h.unwrap_or_default(),
            volume_24h: self.total_volume.unwrap_or_default(),
        }
    }
}

/// CoinGecko REST API client
pub struct CoinGeckoClient {
    base_url: String,
    vs_currency: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl CoinGeckoClient {
    /// The quote currency is lowercased to match CoinGecko's response keys
    pub fn new(base_url: impl Into<String>, vs_currency: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            vs_currency: vs_currency.into().trim().to_lowercase(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.vs_currency.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn vs_currency(&self) -> &str {
        &self.vs_currency
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);

        debug!("Fetching {} with {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Http(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else {
                ProviderError::Http(e.to_string())
            }
        })?;

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn join_ids(assets: &[AssetId]) -> String {
        assets
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch_snapshots(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, MarketSnapshot>, ProviderError> {
        let entries: Vec<MarketEntry> = self
            .get_json(
                "/api/v3/coins/markets",
                &[
                    ("vs_currency", self.vs_currency.clone()),
                    ("ids", Self::join_ids(assets)),
                    ("order", "market_cap_desc".to_string()),
                ],
            )
            .await?;

        if entries.is_empty() {
            return Err(ProviderError::Empty);
        }

        let snapshots: HashMap<AssetId, MarketSnapshot> = entries
            .iter()
            .map(|entry| (AssetId::new(entry.id.clone()), entry.snapshot()))
            .collect();

        info!(
            "Successfully fetched market snapshots for {} of {} assets",
            snapshots.len(),
            assets.len()
        );

        Ok(snapshots)
    }

    async fn fetch_ohlc(
        &self,
        asset: &AssetId,
        lookback_days: u32,
    ) -> Result<OhlcSeries, ProviderError> {
        let rows: Vec<[f64; 5]> = self
            .get_json(
                &format!("/api/v3/coins/{}/ohlc", asset),
                &[
                    ("vs_currency", self.vs_currency.clone()),
                    ("days", lookback_days.to_string()),
                ],
            )
            .await?;

        if rows.is_empty() {
            return Err(ProviderError::Empty);
        }

        let series = OhlcSeries::from_candles(
            rows.into_iter()
                .map(|[ts, open, high, low, close]| OhlcCandle {
                    timestamp_ms: ts as i64,
                    open,
                    high,
                    low,
                    close,
                })
                .collect(),
        );

        info!(
            "Successfully fetched {}-day OHLC for {}: {} candles",
            lookback_days,
            asset,
            series.len()
        );

        Ok(series)
    }

    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<AssetListing>, ProviderError> {
        let entries: Vec<MarketEntry> = self
            .get_json(
                "/api/v3/coins/markets",
                &[
                    ("vs_currency", self.vs_currency.clone()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", limit.to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;

        if entries.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(entries
            .into_iter()
            .map(|entry| AssetListing {
                current_price: entry.current_price.unwrap_or_default(),
                id: AssetId::new(entry.id),
                symbol: entry.symbol,
                name: entry.name,
                market_cap_rank: entry.market_cap_rank,
            })
            .collect())
    }

    async fn fetch_spot_prices(
        &self,
        assets: &[AssetId],
    ) -> Result<HashMap<AssetId, f64>, ProviderError> {
        let body: HashMap<String, HashMap<String, Option<f64>>> = self
            .get_json(
                "/api/v3/simple/price",
                &[
                    ("ids", Self::join_ids(assets)),
                    ("vs_currencies", self.vs_currency.clone()),
                ],
            )
            .await?;

        let prices: HashMap<AssetId, f64> = body
            .into_iter()
            .filter_map(|(id, quotes)| {
                quotes
                    .get(&self.vs_currency)
                    .copied()
                    .flatten()
                    .map(|price| (AssetId::new(id), price))
            })
            .collect();

        if prices.is_empty() {
            return Err(ProviderError::Empty);
        }

        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_entry_defaults_missing_fields() {
        let entry: MarketEntry =
            serde_json::from_str(r#"{"id":"bitcoin","current_price":350000.5}"#).unwrap();
        let snapshot = entry.snapshot();
        assert_eq!(snapshot.current_price, 350000.5);
        assert_eq!(snapshot.change_24h_pct, 0.0);
        assert_eq!(snapshot.volume_24h, 0.0);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = CoinGeckoClient::new("http://localhost:9000/", "brl", Duration::from_secs(1));
        assert_eq!(client.base_url, "http://localhost:9000");
        assert_eq!(client.vs_currency(), "brl");
    }

    #[test]
    fn test_join_ids() {
        let ids = vec![AssetId::from("bitcoin"), AssetId::from("ethereum")];
        assert_eq!(CoinGeckoClient::join_ids(&ids), "bitcoin,ethereum");
    }
}
