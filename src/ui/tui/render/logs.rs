use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, List, ListItem};

use crate::ui::{DOWN, DashboardView, GRID, TEXT_SECONDARY};

pub(super) fn render_logs(frame: &mut Frame<'_>, area: Rect, view: &DashboardView) {
    let block = Block::default()
        .title(" Activity ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GRID));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let rows = inner.height as usize;
    let start = view.activity.len().saturating_sub(rows);
    let mut items: Vec<ListItem> = view
        .activity
        .iter()
        .skip(start)
        .map(|line| {
            let style = if line.contains("failed:") {
                Style::default().fg(DOWN)
            } else {
                Style::default().fg(TEXT_SECONDARY)
            };
            ListItem::new(Span::styled(line.clone(), style))
        })
        .collect();

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "No activity yet",
            Style::default().fg(TEXT_SECONDARY),
        )));
    }

    frame.render_widget(List::new(items), inner);
}
