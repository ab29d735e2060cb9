//! Refresh and render timers

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::{Countdown, DashboardState, Renderer, RefreshWorker};
use crate::config::AssetConfig;

/// Period of the render timer; the countdown loses one second per tick
pub const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the slow refresh timer and the one second render timer
pub struct Scheduler {
    worker: RefreshWorker,
    state: DashboardState,
    assets: Vec<AssetConfig>,
    countdown: Countdown,
    refresh_interval: Duration,
}

impl Scheduler {
    pub fn new(
        worker: RefreshWorker,
        state: DashboardState,
        assets: Vec<AssetConfig>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            worker,
            state,
            assets,
            countdown: Countdown::new(refresh_interval.as_secs()),
            refresh_interval,
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn assets(&self) -> &[AssetConfig] {
        &self.assets
    }

    /// Slow timer action: start a run and restart the countdown.
    ///
    /// The countdown restarts even when the trigger is dropped because a run
    /// is still in flight. Returns whether a new run was spawned.
    pub fn on_refresh_tick(&mut self) -> bool {
        let spawned = self.worker.try_spawn().is_some();
        self.countdown.reset();
        if spawned {
            debug!("Refresh spawned, next in {}s", self.countdown.total());
        }
        spawned
    }

    /// Fast timer action: always draw the clock and tick it, then repaint the
    /// asset panels only when the gate was raised.
    ///
    /// Returns whether the asset panels were repainted.
    pub fn on_render_tick<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> anyhow::Result<bool> {
        renderer.render_clock_panel(self.countdown.remaining(), self.countdown.total());
        self.countdown.tick();

        // lowered before painting so a write landing mid-paint is shown next tick
        let repaint = self.state.gate.take();
        if repaint {
            self.paint_panels(renderer);
        }

        renderer.present()?;
        Ok(repaint)
    }

    /// Draw every asset panel from the current cache contents
    pub fn paint_panels<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        for asset in &self.assets {
            let state = self.state.cache.panel_state(&asset.id);
            renderer.render_asset_panel(asset, &state);
        }
    }

    /// Drive both timers until a shutdown signal arrives or every sender is
    /// dropped. An in-flight run is left to finish on its own.
    pub async fn run<R: Renderer + ?Sized>(
        mut self,
        renderer: &mut R,
        mut shutdown: mpsc::Receiver<()>,
    ) -> anyhow::Result<()> {
        let mut refresh_timer = interval(self.refresh_interval.max(Duration::from_secs(1)));
        refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut render_timer = interval(RENDER_INTERVAL);
        render_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Dashboard scheduler running: refresh every {:?}, render every {:?}",
            self.refresh_interval, RENDER_INTERVAL
        );

        // placeholders before the first data arrives
        self.paint_panels(renderer);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    info!("Dashboard scheduler stopping");
                    break;
                }
                _ = refresh_timer.tick() => {
                    self.on_refresh_tick();
                }
                _ = render_timer.tick() => {
                    self.on_render_tick(renderer)?;
                }
            }
        }

        Ok(())
    }
}
