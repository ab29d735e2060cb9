use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::ui::{DOWN, DashboardView, GRID, TEXT_PRIMARY, TEXT_SECONDARY, UP};

pub(super) fn render_header(frame: &mut Frame<'_>, area: Rect, view: &DashboardView) {
    let title = Span::styled(
        format!(" Crypto Dashboard ({}-day history) ", view.lookback_days),
        Style::default()
            .fg(TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    );

    let status = if view.refreshing {
        Span::styled("● Refreshing ", Style::default().fg(UP))
    } else {
        Span::styled("● Idle ", Style::default().fg(TEXT_SECONDARY))
    };

    let stats = &view.stats;
    let counters = Span::styled(
        format!(
            "Runs: {} | Fetches: {} ok / {} failed | P95: {}ms ",
            stats.runs_started, stats.fetch_successes, stats.fetch_failures, stats.latency_p95_ms
        ),
        Style::default().fg(TEXT_SECONDARY),
    );

    let last_update = match stats.last_completed {
        Some(at) => Span::styled(
            format!("Last update {}", at.format("%H:%M:%S")),
            Style::default().fg(TEXT_SECONDARY),
        ),
        None => Span::styled("Waiting for first update", Style::default().fg(DOWN)),
    };

    let body = vec![Line::from(vec![
        title,
        Span::raw(" "),
        status,
        Span::raw(" "),
        counters,
        Span::raw(" "),
        last_update,
    ])];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GRID))
        .title(" q to quit ");

    let paragraph = Paragraph::new(body).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
