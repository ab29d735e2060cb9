mod asset_panel;
mod clock;
mod header;
mod logs;
mod selector;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::Block;

use crate::ui::{BACKGROUND, DashboardView};

use self::asset_panel::render_asset_panel;
use self::clock::render_clock;
use self::header::render_header;
use self::logs::render_logs;

pub use self::selector::render_selector;

pub fn render_dashboard(frame: &mut Frame<'_>, view: &DashboardView) {
    frame.render_widget(
        Block::default().style(Style::default().bg(BACKGROUND)),
        frame.size(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(12),
            Constraint::Length(7),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], view);

    let count = view.assets.len().max(1) as u32;
    let panel_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            (0..count)
                .map(|_| Constraint::Ratio(1, count))
                .collect::<Vec<_>>(),
        )
        .split(chunks[1]);

    for (asset, area) in view.assets.iter().zip(panel_chunks.iter()) {
        render_asset_panel(frame, *area, view, asset);
    }

    let bottom_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(20)])
        .split(chunks[2]);

    render_clock(frame, bottom_chunks[0], view);
    render_logs(frame, bottom_chunks[1], view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetConfig;
    use crate::dashboard::PanelState;
    use crate::provider::{AssetId, MarketSnapshot, MockProvider};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_dashboard_renders_every_panel_state() {
        let assets = vec![
            AssetConfig::new("bitcoin", "#F7931A"),
            AssetConfig::new("ethereum", "#627EEA"),
            AssetConfig::new("cardano", "#26A69A"),
        ];
        let mut view = DashboardView::new(assets, 30, "brl");
        let btc = AssetId::from("bitcoin");
        let eth = AssetId::from("ethereum");

        let snapshot = MarketSnapshot {
            current_price: 350_000.0,
            change_24h_pct: 2.5,
            high_24h: 360_000.0,
            low_24h: 340_000.0,
            volume_24h: 2_000_000_000.0,
        };
        view.set_panel(
            &btc,
            PanelState::Fresh {
                snapshot,
                series: Arc::new(MockProvider::synthetic_series(&btc, 30, 0)),
            },
        );
        view.set_panel(&eth, PanelState::Failed { snapshot: None });
        view.set_clock(95, 180);
        view.push_activity("refresh #1 started");

        let mut terminal = Terminal::new(TestBackend::new(150, 40)).unwrap();
        terminal.draw(|frame| render_dashboard(frame, &view)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("BITCOIN"));
        assert!(text.contains("R$ 350,000.00"));
        assert!(text.contains("+2.50%"));
        assert!(text.contains("Failed to load (OHLC)"));
        assert!(text.contains("Loading..."));
        assert!(text.contains("01:35"));
        assert!(text.contains("refresh #1 started"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let view = DashboardView::new(vec![AssetConfig::new("bitcoin", "#F7931A")], 7, "usd");
        let mut terminal = Terminal::new(TestBackend::new(10, 5)).unwrap();
        terminal.draw(|frame| render_dashboard(frame, &view)).unwrap();
    }
}
