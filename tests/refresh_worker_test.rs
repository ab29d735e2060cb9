//! Refresh worker behaviour against the scripted mock provider

use std::sync::Arc;
use std::time::Duration;

use cryptopanel::dashboard::{
    DashboardState, FetchOutcome, Pacing, PanelState, RefreshEvent, RefreshWorker, events,
};
use cryptopanel::provider::{
    AssetId, MockCallKind, MockOutcome, MockProvider, ProviderError,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

fn assets() -> Vec<AssetId> {
    vec![
        AssetId::from("bitcoin"),
        AssetId::from("ethereum"),
        AssetId::from("cardano"),
    ]
}

fn paced() -> Pacing {
    Pacing {
        settle_delay: Duration::from_secs(10),
        stagger_delay: Duration::from_secs(15),
        call_timeout: Duration::from_secs(10),
    }
}

fn worker(provider: &Arc<MockProvider>, state: &DashboardState, pacing: Pacing) -> RefreshWorker {
    RefreshWorker::new(provider.clone(), state.clone(), assets(), 30, pacing)
}

fn http_error() -> MockOutcome {
    MockOutcome::Fail(ProviderError::Status(503, "service unavailable".to_string()))
}

#[tokio::test(start_paused = true)]
async fn test_second_trigger_is_dropped_while_run_in_flight() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let worker = worker(&provider, &state, paced());

    assert!(!state.is_busy());
    let handle = worker.try_spawn().expect("first trigger starts a run");
    assert!(state.is_busy());

    sleep(Duration::from_secs(1)).await;
    assert!(worker.try_spawn().is_none());
    assert!(worker.run_once().await.is_none());
    assert!(state.is_busy());

    let report = handle.await.unwrap();
    assert_eq!(report.run_id, 1);
    assert!(!state.is_busy());

    let snapshot_calls = provider
        .calls()
        .iter()
        .filter(|call| matches!(call.kind, MockCallKind::Snapshots(_)))
        .count();
    assert_eq!(snapshot_calls, 1);
    assert_eq!(state.stats.snapshot().triggers_dropped, 2);

    // the flag is free again for the next scheduled run
    let next = worker.try_spawn().expect("next trigger starts a run");
    assert_eq!(next.await.unwrap().run_id, 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_trigger_leaves_running_writes_intact() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let worker = worker(&provider, &state, paced());

    let handle = worker.try_spawn().unwrap();
    sleep(Duration::from_secs(12)).await;
    assert!(worker.try_spawn().is_none());

    handle.await.unwrap();
    for asset in assets() {
        assert!(state.cache.get_snapshot(&asset).is_some());
        assert!(state.cache.get_series(&asset).is_some());
        assert!(!state.cache.has_failed(&asset));
    }
    assert_eq!(provider.ohlc_calls_for(&AssetId::from("bitcoin")), 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_visible_before_any_series() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let handle = worker(&provider, &state, paced()).try_spawn().unwrap();

    // inside the settle pause
    sleep(Duration::from_secs(5)).await;

    for asset in assets() {
        assert!(state.cache.get_snapshot(&asset).is_some());
        assert!(state.cache.get_series(&asset).is_none());
        assert!(matches!(
            state.cache.panel_state(&asset),
            PanelState::SnapshotOnly { .. }
        ));
    }
    assert!(state.gate.is_raised());

    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_series_arrive_one_asset_at_a_time() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let handle = worker(&provider, &state, paced()).try_spawn().unwrap();
    let [btc, eth, ada]: [AssetId; 3] = assets().try_into().unwrap();

    sleep(Duration::from_secs(11)).await;
    assert!(state.cache.get_series(&btc).is_some());
    assert!(state.cache.get_series(&eth).is_none());

    sleep(Duration::from_secs(15)).await;
    assert!(state.cache.get_series(&eth).is_some());
    assert!(state.cache.get_series(&ada).is_none());

    handle.await.unwrap();
    assert!(state.cache.get_series(&ada).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_calls_are_settled_and_staggered() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let started = Instant::now();

    worker(&provider, &state, paced()).run_once().await.unwrap();

    let offsets: Vec<u64> = provider
        .calls()
        .iter()
        .map(|call| (call.at - started).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 10, 25, 40]);

    // no pause after the last asset
    assert_eq!(started.elapsed(), Duration::from_secs(40));
}

#[tokio::test(start_paused = true)]
async fn test_mixed_outcomes_in_one_run() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let [btc, eth, ada]: [AssetId; 3] = assets().try_into().unwrap();
    provider.script_ohlc(&eth, [http_error()]);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let report = worker(&provider, &state, paced())
        .with_events(tx)
        .run_once()
        .await
        .unwrap();

    for asset in [&btc, &eth, &ada] {
        assert!(state.cache.get_snapshot(asset).is_some());
    }
    assert!(state.cache.get_series(&btc).is_some());
    assert!(state.cache.get_series(&eth).is_none());
    assert!(state.cache.get_series(&ada).is_some());
    assert_eq!(state.cache.failed_assets(), vec![eth.clone()]);

    // one raise for the snapshot batch and one per stored series
    assert_eq!(state.gate.raise_count(), 3);

    let raised_by: Vec<RefreshEvent> = events::drain(&mut rx)
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                RefreshEvent::SnapshotsUpdated { .. }
                    | RefreshEvent::SeriesUpdated { .. }
                    | RefreshEvent::SeriesFailed { .. }
            )
        })
        .collect();
    assert_eq!(raised_by.len(), 4);
    assert!(matches!(&raised_by[0], RefreshEvent::SnapshotsUpdated { count: 3 }));
    assert!(matches!(&raised_by[1], RefreshEvent::SeriesUpdated { asset, .. } if asset == &btc));
    assert!(matches!(&raised_by[2], RefreshEvent::SeriesFailed { asset, .. } if asset == &eth));
    assert!(matches!(&raised_by[3], RefreshEvent::SeriesUpdated { asset, .. } if asset == &ada));

    assert_eq!(report.series_updated(), 2);
    assert!(matches!(report.outcome_for(&eth), Some(FetchOutcome::Failed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_previous_series_of_that_asset_only() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let worker = worker(&provider, &state, Pacing::immediate(Duration::from_secs(10)));
    let [btc, eth, _]: [AssetId; 3] = assets().try_into().unwrap();

    worker.run_once().await.unwrap();
    let btc_before = state.cache.get_series(&btc).unwrap();
    let eth_before = state.cache.get_series(&eth).unwrap();

    provider.script_ohlc(&btc, [http_error()]);
    worker.run_once().await.unwrap();

    assert!(state.cache.has_failed(&btc));
    assert!(!state.cache.has_failed(&eth));
    assert!(Arc::ptr_eq(&state.cache.get_series(&btc).unwrap(), &btc_before));
    assert_ne!(*state.cache.get_series(&eth).unwrap(), *eth_before);
    assert!(matches!(
        state.cache.panel_state(&btc),
        PanelState::Stale { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_failure_still_fetches_every_series() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let worker = worker(&provider, &state, paced());

    worker.run_once().await.unwrap();
    let before: Vec<_> = assets()
        .iter()
        .map(|asset| state.cache.get_snapshot(asset))
        .collect();

    provider.script_snapshots([http_error()]);
    let raises_before = state.gate.raise_count();
    let started = Instant::now();
    let report = worker.run_once().await.unwrap();

    assert!(matches!(report.snapshots, FetchOutcome::Failed(_)));
    let after: Vec<_> = assets()
        .iter()
        .map(|asset| state.cache.get_snapshot(asset))
        .collect();
    assert_eq!(before, after);

    for asset in assets() {
        assert_eq!(provider.ohlc_calls_for(&asset), 2);
    }
    // only the three series raised the gate, and no settle pause was taken
    assert_eq!(state.gate.raise_count() - raises_before, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_first_run_snapshot_failure_leaves_cache_empty() {
    let provider = Arc::new(MockProvider::new());
    provider.script_snapshots([MockOutcome::Fail(ProviderError::Empty)]);
    let state = DashboardState::new();

    worker(&provider, &state, Pacing::immediate(Duration::from_secs(10)))
        .run_once()
        .await
        .unwrap();

    for asset in assets() {
        assert!(state.cache.get_snapshot(&asset).is_none());
        assert!(state.cache.get_series(&asset).is_some());
        assert_eq!(state.cache.panel_state(&asset), PanelState::Loading);
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_after_failure_clears_the_mark() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let worker = worker(&provider, &state, Pacing::immediate(Duration::from_secs(10)));
    let ada = AssetId::from("cardano");

    provider.script_ohlc(&ada, [http_error()]);
    worker.run_once().await.unwrap();
    assert!(state.cache.has_failed(&ada));
    assert!(matches!(
        state.cache.panel_state(&ada),
        PanelState::Failed { snapshot: Some(_) }
    ));

    worker.run_once().await.unwrap();
    assert!(!state.cache.has_failed(&ada));
    let series = state.cache.get_series(&ada).unwrap();
    assert!(!series.is_empty());
    assert!(matches!(state.cache.panel_state(&ada), PanelState::Fresh { .. }));

    // a later failure followed by success replaces the series again
    provider.script_ohlc(&ada, [http_error()]);
    worker.run_once().await.unwrap();
    worker.run_once().await.unwrap();
    assert!(!state.cache.has_failed(&ada));
    assert_ne!(*state.cache.get_series(&ada).unwrap(), *series);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_ohlc_call_is_a_timeout_failure() {
    let provider = Arc::new(MockProvider::new());
    let state = DashboardState::new();
    let eth = AssetId::from("ethereum");
    provider.script_ohlc(&eth, [MockOutcome::Hang]);

    let report = worker(&provider, &state, Pacing::immediate(Duration::from_secs(10)))
        .run_once()
        .await
        .unwrap();

    assert!(state.cache.has_failed(&eth));
    assert_eq!(report.series_updated(), 2);
    assert_eq!(state.stats.snapshot().fetch_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_run_releases_busy_flag() {
    let provider = Arc::new(MockProvider::new());
    provider.script_snapshots([MockOutcome::Panic]);
    let state = DashboardState::new();
    let worker = worker(&provider, &state, Pacing::immediate(Duration::from_secs(10)));

    let handle = worker.try_spawn().unwrap();
    assert!(handle.await.unwrap_err().is_panic());
    assert!(!state.is_busy());

    let report = worker.try_spawn().unwrap().await.unwrap();
    assert!(report.snapshots.is_updated());
}
