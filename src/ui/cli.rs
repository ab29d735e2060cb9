//! Simple CLI output implementation
//!
//! Line-oriented dashboard for terminals where the full-screen view is not
//! wanted (`dashboard --simple`), plus the dry-run overview.

use chrono::Local;
use colored::Colorize;
use tokio::sync::mpsc;

use super::{currency_prefix, format_change, format_price, format_volume};
use crate::cli::Cli;
use crate::config::{AssetConfig, Config};
use crate::dashboard::countdown::format_clock;
use crate::dashboard::{PanelState, RefreshEvent, Renderer, events};

/// How often the idle countdown line is printed, in seconds
const CLOCK_PRINT_EVERY: u64 = 30;

/// Prints a block of panel lines whenever the asset panels are repainted
pub struct ConsoleRenderer {
    currency: String,
    pending: Vec<String>,
    clock: (u64, u64),
    events: Option<mpsc::UnboundedReceiver<RefreshEvent>>,
}

impl ConsoleRenderer {
    pub fn new(vs_currency: &str) -> Self {
        Self {
            currency: currency_prefix(vs_currency),
            pending: Vec::new(),
            clock: (0, 0),
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedReceiver<RefreshEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

impl Renderer for ConsoleRenderer {
    fn render_asset_panel(&mut self, asset: &AssetConfig, state: &PanelState) {
        let line = panel_summary(asset, state, &self.currency);
        let line = match state {
            PanelState::Fresh { .. } => line.normal(),
            PanelState::Stale { .. } | PanelState::Failed { .. } => line.red(),
            PanelState::SnapshotOnly { .. } | PanelState::Loading => line.dimmed(),
        };
        self.pending.push(line.to_string());
    }

    fn render_clock_panel(&mut self, seconds_remaining: u64, interval_total: u64) {
        self.clock = (seconds_remaining, interval_total);
    }

    fn present(&mut self) -> anyhow::Result<()> {
        if let Some(rx) = self.events.as_mut() {
            for event in events::drain(rx) {
                println!("   {}", event.to_string().dimmed());
            }
        }

        let (remaining, total) = self.clock;
        if !self.pending.is_empty() {
            println!(
                "{} {} {}",
                "📊".bold(),
                Local::now().format("%H:%M:%S").to_string().bold(),
                format!("(next update in {})", format_clock(remaining)).dimmed()
            );
            for line in self.pending.drain(..) {
                println!("   {}", line);
            }
        } else if remaining != total && remaining % CLOCK_PRINT_EVERY == 0 {
            println!("   ⏱  next update in {}", format_clock(remaining));
        }

        Ok(())
    }
}

/// One-line text for an asset panel
pub fn panel_summary(asset: &AssetConfig, state: &PanelState, currency: &str) -> String {
    let name = asset.id.as_str().to_uppercase();
    let figures = state.snapshot().map(|snapshot| {
        format!(
            "{} ({})  H {}  L {}  Vol {}",
            format_price(currency, snapshot.current_price),
            format_change(snapshot.change_24h_pct),
            format_price(currency, snapshot.high_24h),
            format_price(currency, snapshot.low_24h),
            format_volume(currency, snapshot.volume_24h)
        )
    });

    let chart = match state {
        PanelState::Fresh { series, .. } => format!("{} candles", series.len()),
        PanelState::Stale { series, .. } => format!("{} candles, stale", series.len()),
        PanelState::SnapshotOnly { .. } => "chart loading".to_string(),
        PanelState::Loading => "Loading...".to_string(),
        PanelState::Failed { .. } => "Failed to load (OHLC)".to_string(),
    };

    match figures {
        Some(figures) => format!("{:<10} {}  [{}]", name, figures, chart),
        None => format!("{:<10} [{}]", name, chart),
    }
}

/// Overview printed by `--dry-run`
pub fn display_dry_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    println!("{}", "Crypto Dashboard".bold());
    println!();
    config.display_summary()?;
    println!(
        "Provider: {} ({}), timeout {}s",
        config.provider.base_url, config.provider.vs_currency, config.provider.timeout_seconds
    );
    println!("Log file: {}", config.log.file_path);
    println!();
    println!("Dry-run mode configuration:");
    println!("Config file: {}", cli.config_file);
    println!("Log level: {}", cli.effective_log_level());
    println!("{}", "Dashboard not started (dry run)".yellow());
    Ok(())
}
