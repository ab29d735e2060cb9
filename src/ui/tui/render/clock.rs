use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use crate::dashboard::countdown::format_clock;
use crate::ui::{BACKGROUND, DashboardView, GRID, TEXT_PRIMARY, TEXT_SECONDARY};

pub(super) fn render_clock(frame: &mut Frame<'_>, area: Rect, view: &DashboardView) {
    let block = Block::default()
        .title(" Next update ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GRID));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(format_clock(view.seconds_remaining))
            .style(
                Style::default()
                    .fg(TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center),
        chunks[0],
    );

    let ratio = if view.interval_total == 0 {
        0.0
    } else {
        (view.seconds_remaining as f64 / view.interval_total as f64).clamp(0.0, 1.0)
    };
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(TEXT_PRIMARY).bg(GRID))
            .ratio(ratio)
            .label(""),
        chunks[2],
    );

    let status = if view.refreshing {
        "refreshing..."
    } else {
        "idle"
    };
    frame.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(TEXT_SECONDARY).bg(BACKGROUND))
            .alignment(Alignment::Center),
        chunks[3],
    );
}
