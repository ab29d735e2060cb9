//! Dashboard session lifecycle

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;
use crate::dashboard::{
    DashboardState, Pacing, RefreshChannel, RefreshEvent, RefreshWorker, Renderer, Scheduler,
};
use crate::provider::MarketDataProvider;
use crate::ui::DashboardView;
use crate::ui::cli::ConsoleRenderer;
use crate::ui::tui::{InputListener, TerminalRenderer, Tui};

/// Refresh period used by demo runs
const DEMO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Pause between synthetic calls in demo runs
const DEMO_PACING_DELAY: Duration = Duration::from_secs(1);

/// How the dashboard is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardMode {
    Terminal,
    Simple,
}

/// One dashboard run from start to shutdown
pub struct DashboardSession {
    config: Config,
    mode: DashboardMode,
    demo: bool,
    provider: Arc<dyn MarketDataProvider>,
}

impl DashboardSession {
    pub fn new(
        config: Config,
        mode: DashboardMode,
        demo: bool,
        provider: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self {
            config,
            mode,
            demo,
            provider,
        }
    }

    fn pacing(&self) -> Pacing {
        let pacing = Pacing::from_config(&self.config.refresh);
        if self.demo {
            Pacing {
                settle_delay: DEMO_PACING_DELAY,
                stagger_delay: DEMO_PACING_DELAY,
                ..pacing
            }
        } else {
            pacing
        }
    }

    fn refresh_interval(&self) -> Duration {
        let configured = Duration::from_secs(self.config.refresh.interval_secs);
        if self.demo {
            configured.min(DEMO_REFRESH_INTERVAL)
        } else {
            configured
        }
    }

    /// Wire the shared state, worker and scheduler together
    pub fn build(&self) -> (DashboardState, Scheduler, mpsc::UnboundedReceiver<RefreshEvent>) {
        let state = DashboardState::new();
        let mut channel = RefreshChannel::new();
        let events = channel.event_rx().unwrap_or_else(|| mpsc::unbounded_channel().1);

        let worker = RefreshWorker::new(
            self.provider.clone(),
            state.clone(),
            self.config.asset_ids(),
            self.config.lookback_days,
            self.pacing(),
        )
        .with_events(channel.event_tx());

        let scheduler = Scheduler::new(
            worker,
            state.clone(),
            self.config.assets.clone(),
            self.refresh_interval(),
        );

        (state, scheduler, events)
    }

    /// Run until the user quits
    pub async fn run(self) -> Result<()> {
        info!(
            "Starting dashboard for {} assets via {} ({:?}{})",
            self.config.assets.len(),
            self.provider.name(),
            self.mode,
            if self.demo { ", demo" } else { "" }
        );

        let (state, scheduler, events) = self.build();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        match self.mode {
            DashboardMode::Terminal => {
                let view = DashboardView::new(
                    self.config.assets.clone(),
                    self.config.lookback_days,
                    &self.config.provider.vs_currency,
                );
                let tui = Tui::new()?;
                let _input = InputListener::spawn(shutdown_tx);
                let mut renderer = TerminalRenderer::new(tui, view, state).with_events(events);

                let result = scheduler.run(&mut renderer, shutdown_rx).await;
                renderer.restore()?;
                result?;
            }
            DashboardMode::Simple => {
                tokio::spawn(async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            let _ = shutdown_tx.send(()).await;
                        }
                        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                    }
                });

                let mut renderer =
                    ConsoleRenderer::new(&self.config.provider.vs_currency).with_events(events);
                Self::run_with(scheduler, &mut renderer, shutdown_rx).await?;
            }
        }

        info!("Dashboard stopped");
        Ok(())
    }

    async fn run_with<R: Renderer + ?Sized>(
        scheduler: Scheduler,
        renderer: &mut R,
        shutdown: mpsc::Receiver<()>,
    ) -> Result<()> {
        scheduler.run(renderer, shutdown).await
    }
}
