//! Configuration management module
//!
//! Handles loading, validation, and management of application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;

use crate::provider::AssetId;

/// Minimum and maximum number of assets a dashboard session can track
pub const MIN_ASSETS: usize = 3;
pub const MAX_ASSETS: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Ordered list of tracked assets with their display colour
    pub assets: Vec<AssetConfig>,

    /// OHLC lookback window in days
    pub lookback_days: u32,

    /// Logging level
    pub log_level: String,

    /// Refresh pacing configuration
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Market data provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// File-based logging configuration
    pub log: LogConfig,

    /// Price history tracker configuration
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetConfig {
    /// Provider asset identifier
    pub id: AssetId,

    /// Display colour as `#RRGGBB`
    pub color: String,
}

impl AssetConfig {
    pub fn new(id: impl Into<AssetId>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between background refresh runs
    pub interval_secs: u64,

    /// Pause after a successful snapshot fetch before OHLC calls
    pub settle_delay_secs: u64,

    /// Pause between successive per-asset OHLC calls
    pub stagger_delay_secs: u64,

    /// Deadline applied to every provider call
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// REST API base URL
    pub base_url: String,

    /// Quote currency for all prices
    pub vs_currency: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Number of assets offered by the launcher
    pub top_assets_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogConfig {
    /// Absolute or relative path to the rolling log file
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// CSV file receiving one row per asset and round
    pub file_path: String,

    /// Seconds between tracker rounds
    pub interval_secs: u64,

    /// Assets recorded by the tracker
    pub assets: Vec<AssetId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            lookback_days: 30,
            log_level: "info".to_string(),
            refresh: RefreshConfig::default(),
            provider: ProviderConfig::default(),
            log: LogConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

fn default_assets() -> Vec<AssetConfig> {
    vec![
        AssetConfig::new("bitcoin", "#F7931A"),
        AssetConfig::new("ethereum", "#627EEA"),
        AssetConfig::new("cardano", "#0033AD"),
    ]
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 180,
            settle_delay_secs: 10,
            stagger_delay_secs: 15,
            call_timeout_secs: 10,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com".to_string(),
            vs_currency: "brl".to_string(),
            timeout_seconds: 10,
            top_assets_limit: 20,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: "logs/cryptopanel.log".to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file_path: "price_history.csv".to_string(),
            interval_secs: 60,
            assets: ["bitcoin", "ethereum", "cardano", "solana"]
                .into_iter()
                .map(AssetId::from)
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Apply environment variable overrides
        config.apply_env_overrides();
        config.provider.vs_currency = config.provider.vs_currency.trim().to_lowercase();

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Apply overrides obtained from an arbitrary variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // CRYPTOPANEL_ASSETS - comma-separated list of asset ids, palette colours reassigned
        if let Some(assets) = lookup("CRYPTOPANEL_ASSETS") {
            let ids: Vec<AssetId> = assets
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(AssetId::from)
                .collect();
            if !ids.is_empty() {
                self.assets = assign_palette(ids);
            }
        }

        // CRYPTOPANEL_LOOKBACK_DAYS - OHLC window
        if let Some(days) = lookup("CRYPTOPANEL_LOOKBACK_DAYS") {
            if let Ok(value) = days.parse::<u32>() {
                self.lookback_days = value;
            }
        }

        // CRYPTOPANEL_REFRESH_INTERVAL_SECS - refresh run period
        if let Some(interval) = lookup("CRYPTOPANEL_REFRESH_INTERVAL_SECS") {
            if let Ok(value) = interval.parse::<u64>() {
                self.refresh.interval_secs = value;
            }
        }

        // CRYPTOPANEL_LOG_LEVEL - logging level
        if let Some(log_level) = lookup("CRYPTOPANEL_LOG_LEVEL") {
            self.log_level = log_level;
        }

        // CRYPTOPANEL_LOG_FILE_PATH - logging destination file
        if let Some(file_path) = lookup("CRYPTOPANEL_LOG_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.log.file_path = file_path;
            }
        }

        // CRYPTOPANEL_PROVIDER_BASE_URL - REST API URL
        if let Some(base_url) = lookup("CRYPTOPANEL_PROVIDER_BASE_URL") {
            self.provider.base_url = base_url;
        }

        // CRYPTOPANEL_PROVIDER_VS_CURRENCY - quote currency
        if let Some(currency) = lookup("CRYPTOPANEL_PROVIDER_VS_CURRENCY") {
            self.provider.vs_currency = currency.to_lowercase();
        }

        // CRYPTOPANEL_PROVIDER_TIMEOUT_SECONDS - HTTP timeout
        if let Some(timeout) = lookup("CRYPTOPANEL_PROVIDER_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.provider.timeout_seconds = value;
            }
        }

        // CRYPTOPANEL_HISTORY_FILE_PATH - tracker CSV destination
        if let Some(file_path) = lookup("CRYPTOPANEL_HISTORY_FILE_PATH") {
            if !file_path.trim().is_empty() {
                self.history.file_path = file_path;
            }
        }
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load_from_file(path).unwrap_or_else(|err| {
            tracing::warn!("Failed to load config: {:#}, using default assets", err);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ASSETS..=MAX_ASSETS).contains(&self.assets.len()) {
            anyhow::bail!(
                "Between {} and {} assets must be configured, found {}",
                MIN_ASSETS,
                MAX_ASSETS,
                self.assets.len()
            );
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.id.as_str().trim().is_empty() {
                anyhow::bail!("Asset identifiers must not be empty");
            }
            if !seen.insert(&asset.id) {
                anyhow::bail!("Duplicate asset: {}", asset.id);
            }
            if !is_hex_color(&asset.color) {
                anyhow::bail!("Invalid colour for {}: {}", asset.id, asset.color);
            }
        }

        if self.lookback_days == 0 {
            anyhow::bail!("lookback_days must be greater than 0");
        }

        if self.refresh.interval_secs == 0 {
            anyhow::bail!("refresh.interval_secs must be greater than 0");
        }

        if self.refresh.call_timeout_secs == 0 || self.provider.timeout_seconds == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        if self.provider.base_url.trim().is_empty() {
            anyhow::bail!("provider.base_url must not be empty");
        }

        if self.log.file_path.trim().is_empty() {
            anyhow::bail!("Log file path must not be empty");
        }

        if self.history.interval_secs == 0 {
            anyhow::bail!("history.interval_secs must be greater than 0");
        }

        Ok(())
    }

    /// Identifiers of the tracked assets in configured order
    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.assets.iter().map(|asset| asset.id.clone()).collect()
    }

    /// Display formatted configuration
    pub fn display(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        println!("Current configuration:");
        println!("{}", content);
        Ok(())
    }

    /// Display configuration summary
    pub fn display_summary(&self) -> Result<()> {
        println!("Configuration loaded successfully");
        println!(
            "Assets: {}",
            self.asset_ids()
                .iter()
                .map(AssetId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("History window: {} days", self.lookback_days);
        println!(
            "Refresh every {}s (settle {}s, stagger {}s)",
            self.refresh.interval_secs,
            self.refresh.settle_delay_secs,
            self.refresh.stagger_delay_secs
        );
        Ok(())
    }

    /// Handle configuration command
    pub fn handle_command<P: AsRef<Path>>(
        action: &Option<crate::cli::ConfigAction>,
        path: P,
    ) -> Result<()> {
        match action {
            Some(crate::cli::ConfigAction::Show) | None => {
                let config = Config::load_or_default(&path);
                println!("Configuration from {}", path.as_ref().display());
                config.display()?;
            }
            Some(crate::cli::ConfigAction::Reset) => {
                let default_config = Config::default();
                default_config.save_to_file(&path)?;
                println!("Configuration reset: {}", path.as_ref().display());
                default_config.display()?;
            }
        }
        Ok(())
    }
}

/// Display palette assigned to assets in selection order
pub const PALETTE: [&str; MAX_ASSETS] = ["#F7931A", "#627EEA", "#26A69A", "#9945FF"];

/// Pair asset ids with palette colours in order
pub fn assign_palette(ids: Vec<AssetId>) -> Vec<AssetConfig> {
    ids.into_iter()
        .enumerate()
        .map(|(idx, id)| AssetConfig {
            id,
            color: PALETTE[idx % PALETTE.len()].to_string(),
        })
        .collect()
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
