use std::sync::Arc;

use colored::Colorize;
use cryptopanel::cli::{Cli, Commands};
use cryptopanel::config::{Config, LogConfig};
use cryptopanel::launcher::{self, AssetSelection};
use cryptopanel::provider::MarketDataProvider;
use cryptopanel::session::{self, DashboardMode, DashboardSession};
use cryptopanel::ui::cli::display_dry_run;
use cryptopanel::{AppResult, init_logging};

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse_args();

    let loaded = Config::load_from_file(&cli.config_file);
    let log_config = match &loaded {
        Ok(config) => config.log.clone(),
        Err(_) => LogConfig::default(),
    };

    // The full-screen UI owns stdout, so logs go to the rolling file instead
    let _log_guard = init_logging(
        &cli.effective_log_level(),
        cli.uses_tui().then_some(&log_config),
    )?;

    tracing::info!("Cryptopanel starting...");
    tracing::debug!("CLI arguments: {:?}", cli);

    let mut config = loaded.unwrap_or_else(|err| {
        tracing::warn!("Failed to load config: {:#}, using defaults", err);
        Config::default()
    });

    if cli.is_dry_run_mode() {
        display_dry_run(&cli, &config)?;
        return Ok(());
    }

    match cli.command() {
        Commands::Dashboard { simple, demo } => {
            let provider = session::build_provider(&config, demo);
            let mode = if simple {
                DashboardMode::Simple
            } else {
                DashboardMode::Terminal
            };
            DashboardSession::new(config, mode, demo, provider)
                .run()
                .await?;
        }
        Commands::Select {
            count,
            assets,
            days,
        } => {
            let provider = session::build_provider(&config, false);
            match assets {
                Some(raw) => {
                    let lookback = days.unwrap_or(config.lookback_days);
                    launcher::apply_assets(&mut config, launcher::parse_asset_list(&raw), lookback)?;
                }
                None => {
                    if !select_interactively(&mut config, provider.clone(), count, days).await? {
                        println!("No assets selected, exiting.");
                        return Ok(());
                    }
                }
            }

            config.save_to_file(&cli.config_file)?;
            println!(
                "{} {} saved to {}",
                "Selection".bold(),
                config
                    .asset_ids()
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                cli.config_file
            );

            DashboardSession::new(config, DashboardMode::Terminal, false, provider)
                .run()
                .await?;
        }
        Commands::Track { once } => {
            let provider = session::build_provider(&config, false);
            session::run_tracker(&config, provider, once).await?;
        }
        Commands::Chart => {
            session::print_history_summary(&config)?;
        }
        Commands::Config { action } => {
            Config::handle_command(&action, &cli.config_file)?;
        }
    }

    Ok(())
}

/// Returns false when the user quits the picker
async fn select_interactively(
    config: &mut Config,
    provider: Arc<dyn MarketDataProvider>,
    count: usize,
    days: Option<u32>,
) -> anyhow::Result<bool> {
    let listings =
        launcher::fetch_listings(provider.as_ref(), config.provider.top_assets_limit).await?;
    let selection = AssetSelection::new(listings, count);

    let Some(selection) =
        tokio::task::spawn_blocking(move || launcher::run_selector(selection)).await??
    else {
        return Ok(false);
    };

    selection.apply_to(config)?;
    if let Some(days) = days {
        let ids = config.asset_ids();
        launcher::apply_assets(config, ids, days)?;
    }
    Ok(true)
}
