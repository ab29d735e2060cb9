//! Scheduler timing and redraw gating with paused tokio time

use std::sync::Arc;
use std::time::Duration;

use cryptopanel::config::AssetConfig;
use cryptopanel::dashboard::{
    DashboardState, Pacing, PanelState, RefreshWorker, Renderer, Scheduler,
};
use cryptopanel::provider::{AssetId, MockOutcome, MockProvider, ProviderError};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Clone, PartialEq)]
enum Drawn {
    Clock(u64, u64),
    Panel(AssetId, &'static str),
    Present,
}

#[derive(Default)]
struct RecordingRenderer {
    drawn: Vec<Drawn>,
}

impl RecordingRenderer {
    fn clocks(&self) -> Vec<u64> {
        self.drawn
            .iter()
            .filter_map(|d| match d {
                Drawn::Clock(remaining, _) => Some(*remaining),
                _ => None,
            })
            .collect()
    }

    fn panels(&self) -> Vec<(AssetId, &'static str)> {
        self.drawn
            .iter()
            .filter_map(|d| match d {
                Drawn::Panel(asset, label) => Some((asset.clone(), *label)),
                _ => None,
            })
            .collect()
    }

    fn clear(&mut self) {
        self.drawn.clear();
    }
}

impl Renderer for RecordingRenderer {
    fn render_asset_panel(&mut self, asset: &AssetConfig, state: &PanelState) {
        self.drawn.push(Drawn::Panel(asset.id.clone(), state.label()));
    }

    fn render_clock_panel(&mut self, seconds_remaining: u64, interval_total: u64) {
        self.drawn.push(Drawn::Clock(seconds_remaining, interval_total));
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.drawn.push(Drawn::Present);
        Ok(())
    }
}

fn asset_configs() -> Vec<AssetConfig> {
    vec![
        AssetConfig::new("bitcoin", "#F7931A"),
        AssetConfig::new("ethereum", "#627EEA"),
        AssetConfig::new("cardano", "#26A69A"),
    ]
}

fn scheduler(
    provider: &Arc<MockProvider>,
    state: &DashboardState,
    refresh_interval: Duration,
) -> Scheduler {
    let assets = asset_configs();
    let worker = RefreshWorker::new(
        provider.clone(),
        state.clone(),
        assets.iter().map(|a| a.id.clone()).collect(),
        30,
        Pacing {
            settle_delay: Duration::from_secs(10),
            stagger_delay: Duration::from_secs(15),
            call_timeout: Duration::from_secs(10),
        },
    );
    Scheduler::new(worker, state.clone(), assets, refresh_interval)
}

#[tokio::test(start_paused = true)]
async fn test_gate_controls_asset_repaint() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let mut scheduler = scheduler(&provider, &state, Duration::from_secs(180));
    let mut renderer = RecordingRenderer::default();

    // nothing written yet
    assert!(!scheduler.on_render_tick(&mut renderer).unwrap());
    assert!(renderer.panels().is_empty());
    assert_eq!(
        renderer.drawn,
        vec![Drawn::Clock(180, 180), Drawn::Present]
    );

    assert!(scheduler.on_refresh_tick());
    sleep(Duration::from_secs(1)).await;
    assert!(state.gate.is_raised());

    renderer.clear();
    assert!(scheduler.on_render_tick(&mut renderer).unwrap());
    assert!(!state.gate.is_raised());
    assert_eq!(
        renderer.panels(),
        asset_configs()
            .into_iter()
            .map(|a| (a.id, "snapshot"))
            .collect::<Vec<_>>()
    );

    // same update is never painted twice
    renderer.clear();
    assert!(!scheduler.on_render_tick(&mut renderer).unwrap());
    assert!(renderer.panels().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_series_does_not_raise_gate() {
    let provider = Arc::new(MockProvider::new());
    let btc = AssetId::from("bitcoin");
    provider.script_ohlc(
        &btc,
        [MockOutcome::Fail(ProviderError::Http("connection reset".into()))],
    );
    let state = DashboardState::new();
    let mut scheduler = scheduler(&provider, &state, Duration::from_secs(180));
    let mut renderer = RecordingRenderer::default();

    scheduler.on_refresh_tick();
    sleep(Duration::from_secs(5)).await;
    assert!(scheduler.on_render_tick(&mut renderer).unwrap());

    // bitcoin's OHLC call at t=10 fails
    sleep(Duration::from_secs(6)).await;
    assert!(state.cache.has_failed(&btc));
    assert!(!state.gate.is_raised());
    assert!(!scheduler.on_render_tick(&mut renderer).unwrap());

    // ethereum's call at t=25 succeeds and the repaint shows both panels
    sleep(Duration::from_secs(15)).await;
    renderer.clear();
    assert!(scheduler.on_render_tick(&mut renderer).unwrap());
    let panels = renderer.panels();
    assert_eq!(panels[0], (btc, "failed"));
    assert_eq!(panels[1], (AssetId::from("ethereum"), "fresh"));
    assert_eq!(panels[2], (AssetId::from("cardano"), "snapshot"));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_resets_on_spawn_not_on_completion() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let mut scheduler = scheduler(&provider, &state, Duration::from_secs(180));
    let mut renderer = RecordingRenderer::default();

    for _ in 0..20 {
        scheduler.on_render_tick(&mut renderer).unwrap();
    }
    assert_eq!(scheduler.countdown().remaining(), 160);

    assert!(scheduler.on_refresh_tick());
    assert_eq!(scheduler.countdown().remaining(), 180);

    // the run completes at t=40 while the clock keeps ticking
    for _ in 0..50 {
        scheduler.on_render_tick(&mut renderer).unwrap();
        sleep(Duration::from_secs(1)).await;
    }
    assert!(!state.is_busy());
    assert_eq!(scheduler.countdown().remaining(), 130);

    let clocks = renderer.clocks();
    let expected: Vec<u64> = (161..=180).rev().chain((131..=180).rev()).collect();
    assert_eq!(clocks, expected);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_floors_at_zero() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let mut scheduler = scheduler(&provider, &state, Duration::from_secs(3));
    let mut renderer = RecordingRenderer::default();

    for _ in 0..6 {
        scheduler.on_render_tick(&mut renderer).unwrap();
    }
    assert_eq!(renderer.clocks(), vec![3, 2, 1, 0, 0, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_loads_progressively_until_shutdown() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let scheduler = scheduler(&provider, &state, Duration::from_secs(180));
    let mut renderer = RecordingRenderer::default();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        sleep(Duration::from_millis(45_500)).await;
        let _ = shutdown_tx.send(()).await;
    });

    scheduler.run(&mut renderer, shutdown_rx).await.unwrap();

    let clocks = renderer.clocks();
    assert_eq!(clocks.len(), 46);
    assert_eq!(clocks[0], 180);
    assert!(clocks.windows(2).all(|w| w[0] == w[1] + 1));

    let panels = renderer.panels();
    let btc = AssetId::from("bitcoin");
    let btc_states: Vec<&str> = panels
        .iter()
        .filter(|(asset, _)| asset == &btc)
        .map(|(_, label)| *label)
        .collect();
    // initial placeholder, snapshot, own chart, then two repaints for the others
    assert_eq!(btc_states, vec!["loading", "snapshot", "fresh", "fresh", "fresh"]);

    for asset in asset_configs() {
        assert!(matches!(
            state.cache.panel_state(&asset.id),
            PanelState::Fresh { .. }
        ));
    }
    assert_eq!(state.stats.snapshot().runs_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_drops_trigger_while_busy() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let scheduler = scheduler(&provider, &state, Duration::from_secs(30));
    let mut renderer = RecordingRenderer::default();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        sleep(Duration::from_millis(65_500)).await;
        let _ = shutdown_tx.send(()).await;
    });

    scheduler.run(&mut renderer, shutdown_rx).await.unwrap();

    let stats = state.stats.snapshot();
    assert_eq!(stats.runs_started, 2);
    assert_eq!(stats.triggers_dropped, 1);

    // the clock restarted at every slow tick, including the dropped one
    let clocks = renderer.clocks();
    assert_eq!(clocks[0], 30);
    assert_eq!(clocks[30], 30);
    assert_eq!(clocks[60], 30);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_tracks_elapsed_seconds() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let scheduler = scheduler(&provider, &state, Duration::from_secs(180));
    let mut renderer = RecordingRenderer::default();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    tokio::spawn(async move {
        sleep(Duration::from_millis(10_100)).await;
        let _ = shutdown_tx.send(()).await;
    });

    scheduler.run(&mut renderer, shutdown_rx).await.unwrap();

    // render ticks at 0s..=10s, one second of countdown each
    let clocks = renderer.clocks();
    assert_eq!(clocks.len(), 11);
    assert_eq!(clocks.first(), Some(&180));
    assert_eq!(clocks.last(), Some(&170));
}
