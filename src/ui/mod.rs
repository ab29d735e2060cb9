//! User Interface module
//!
//! Provides both TUI (Terminal User Interface) and simple CLI output capabilities.

/// TUI application state and rendering
pub mod tui;

/// Simple CLI output functions
pub mod cli;

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Local, Utc};
use ratatui::style::Color;

use crate::config::AssetConfig;
use crate::dashboard::PanelState;
use crate::metrics::StatsSnapshot;
use crate::provider::AssetId;

pub const BACKGROUND: Color = Color::Rgb(0x13, 0x17, 0x22);
pub const TEXT_PRIMARY: Color = Color::Rgb(0xFF, 0xFF, 0xFF);
pub const TEXT_SECONDARY: Color = Color::Rgb(0xB2, 0xB5, 0xBE);
pub const GRID: Color = Color::Rgb(0x2A, 0x2E, 0x39);
pub const UP: Color = Color::Rgb(0x26, 0xA6, 0x9A);
pub const DOWN: Color = Color::Rgb(0xEF, 0x53, 0x50);

const MAX_ACTIVITY_LINES: usize = 200;

/// Everything the terminal dashboard draws in one frame
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub assets: Vec<AssetConfig>,
    pub panels: HashMap<AssetId, PanelState>,
    pub seconds_remaining: u64,
    pub interval_total: u64,
    pub lookback_days: u32,
    pub currency: String,
    pub activity: VecDeque<String>,
    pub stats: StatsSnapshot,
    pub refreshing: bool,
}

impl DashboardView {
    pub fn new(assets: Vec<AssetConfig>, lookback_days: u32, vs_currency: &str) -> Self {
        Self {
            assets,
            panels: HashMap::new(),
            seconds_remaining: 0,
            interval_total: 0,
            lookback_days,
            currency: currency_prefix(vs_currency),
            activity: VecDeque::new(),
            stats: StatsSnapshot::default(),
            refreshing: false,
        }
    }

    pub fn set_panel(&mut self, asset: &AssetId, state: PanelState) {
        self.panels.insert(asset.clone(), state);
    }

    /// Last state drawn for an asset, `Loading` until the first paint
    pub fn panel(&self, asset: &AssetId) -> &PanelState {
        self.panels.get(asset).unwrap_or(&PanelState::Loading)
    }

    pub fn set_clock(&mut self, seconds_remaining: u64, interval_total: u64) {
        self.seconds_remaining = seconds_remaining;
        self.interval_total = interval_total;
    }

    /// Append a timestamped activity line, dropping the oldest past the cap
    pub fn push_activity(&mut self, message: impl AsRef<str>) {
        if self.activity.len() >= MAX_ACTIVITY_LINES {
            self.activity.pop_front();
        }
        self.activity.push_back(format!(
            "[{}] {}",
            Local::now().format("%H:%M:%S"),
            message.as_ref()
        ));
    }

    pub fn price(&self, value: f64) -> String {
        format_price(&self.currency, value)
    }

    pub fn volume(&self, value: f64) -> String {
        format_volume(&self.currency, value)
    }
}

/// Display prefix for a quote currency code
pub fn currency_prefix(vs_currency: &str) -> String {
    match vs_currency.to_ascii_lowercase().as_str() {
        "brl" => "R$".to_string(),
        "usd" => "$".to_string(),
        "eur" => "€".to_string(),
        "gbp" => "£".to_string(),
        other => other.to_ascii_uppercase(),
    }
}

/// Parse a `#RRGGBB` colour
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    Some(Color::Rgb(
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    ))
}

/// Two decimals with comma thousands separators, e.g. `R$ 1,234,567.89`
pub fn format_price(prefix: &str, value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{} {}{}.{}", prefix, sign, grouped, fraction)
}

/// Volume in billions above 1e9, otherwise in millions
pub fn format_volume(prefix: &str, value: f64) -> String {
    if value > 1_000_000_000.0 {
        format!("{} {:.1}B", prefix, value / 1_000_000_000.0)
    } else {
        format!("{} {:.1}M", prefix, value / 1_000_000.0)
    }
}

pub fn format_change(percent: f64) -> String {
    format!("{:+.2}%", percent)
}

pub fn change_color(percent: f64) -> Color {
    if percent >= 0.0 { UP } else { DOWN }
}

/// `dd/mm` label for a candle timestamp
pub fn format_day(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|datetime| datetime.format("%d/%m").to_string())
        .unwrap_or_else(|| "-".to_string())
}
