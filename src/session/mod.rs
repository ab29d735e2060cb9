//! Session wiring for the runnable commands
//!
//! Builds the provider, worker, scheduler and renderer for the dashboard,
//! and drives the CSV tracker and its summary.

pub mod dashboard;
pub mod tracker;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::provider::{CoinGeckoClient, MarketDataProvider, MockProvider};

pub use dashboard::{DashboardMode, DashboardSession};
pub use tracker::{print_history_summary, run_tracker};

/// Latency of every synthetic call in demo mode
pub const DEMO_LATENCY: Duration = Duration::from_millis(400);

/// Network client, or synthetic data for demo runs
pub fn build_provider(config: &Config, demo: bool) -> Arc<dyn MarketDataProvider> {
    if demo {
        Arc::new(MockProvider::new().with_latency(DEMO_LATENCY))
    } else {
        Arc::new(CoinGeckoClient::from_config(&config.provider))
    }
}
