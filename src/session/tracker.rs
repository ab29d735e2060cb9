//! Price tracker and history summary commands

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::history::{HistoryLog, PriceMove, PriceTracker, TrackedPrice, summarize};
use crate::provider::MarketDataProvider;
use crate::ui::{currency_prefix, format_change, format_price};

/// Record spot prices until Ctrl-C, or a single round with `once`
pub async fn run_tracker(
    config: &Config,
    provider: Arc<dyn MarketDataProvider>,
    once: bool,
) -> Result<()> {
    let currency = currency_prefix(&config.provider.vs_currency);
    let mut tracker = PriceTracker::from_config(
        provider,
        &config.history,
        Duration::from_secs(config.refresh.call_timeout_secs),
    )?;

    println!(
        "{} recording {} to {} every {}s (Ctrl-C to stop)",
        "Price tracker".bold(),
        config
            .history
            .assets
            .iter()
            .map(|asset| asset.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.history.file_path,
        config.history.interval_secs
    );

    if once {
        let round = tracker.record_round().await?;
        print_round(&round, &currency);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    tracker
        .run(shutdown_rx, |round| print_round(round, &currency))
        .await?;
    info!("Price tracker stopped");
    println!("Tracker stopped.");
    Ok(())
}

fn print_round(round: &[TrackedPrice], currency: &str) {
    if round.is_empty() {
        println!("   {}", "No prices recorded this round".yellow());
        return;
    }

    for tracked in round {
        let price = format_price(currency, tracked.price);
        let line = format!("{:<10} {}", tracked.asset.as_str().to_uppercase(), price);
        match tracked.movement {
            PriceMove::First => println!("   {}", line),
            PriceMove::Up => println!("   {} {}", line, "▲ went up".green()),
            PriceMove::Down => println!("   {} {}", line, "▼ went down".red()),
            PriceMove::Unchanged => println!("   {} {}", line, "= unchanged".dimmed()),
        }
    }
}

/// Print per-asset statistics for the recorded history
pub fn print_history_summary(config: &Config) -> Result<()> {
    let path = Path::new(&config.history.file_path);
    if !path.exists() {
        bail!(
            "History file '{}' not found. Run `cryptopanel track` first to collect prices.",
            path.display()
        );
    }

    let records = HistoryLog::existing(path).read_all()?;
    if records.len() < 2 {
        warn!("Only {} rows in {}", records.len(), path.display());
        println!(
            "{}",
            "Not enough data to chart yet. Let the tracker record a few more rounds.".yellow()
        );
        return Ok(());
    }

    let currency = currency_prefix(&config.provider.vs_currency);
    println!(
        "{} ({} rows in {})",
        "Price history".bold(),
        records.len(),
        path.display()
    );
    println!();

    for summary in summarize(&records) {
        let change = summary.change_pct();
        let change_text = format_change(change);
        let change_text = if change >= 0.0 {
            change_text.green()
        } else {
            change_text.red()
        };

        println!(
            "{:<10} {} samples, {} .. {}",
            summary.asset.to_uppercase().bold(),
            summary.samples,
            summary.first_timestamp,
            summary.last_timestamp
        );
        println!(
            "           last {}  min {}  max {}  {}",
            format_price(&currency, summary.last_price),
            format_price(&currency, summary.min_price),
            format_price(&currency, summary.max_price),
            change_text
        );
    }

    Ok(())
}
