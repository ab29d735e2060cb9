use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::launcher::AssetSelection;
use crate::ui::{BACKGROUND, DOWN, GRID, TEXT_PRIMARY, TEXT_SECONDARY, UP};

const HIGHLIGHT: Color = Color::Rgb(0x00, 0x7A, 0xCC);

pub fn render_selector(frame: &mut Frame<'_>, selection: &AssetSelection) {
    frame.render_widget(
        Block::default().style(Style::default().bg(BACKGROUND)),
        frame.size(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    render_title(frame, chunks[0], selection);
    render_listing(frame, chunks[1], selection);
    render_period(frame, chunks[2], selection);
    render_button(frame, chunks[3], selection);

    frame.render_widget(
        Paragraph::new("↑/↓ move · space select · ←/→ period · enter start · q quit")
            .style(Style::default().fg(TEXT_SECONDARY))
            .alignment(Alignment::Center),
        chunks[4],
    );
}

fn render_title(frame: &mut Frame<'_>, area: Rect, selection: &AssetSelection) {
    frame.render_widget(
        Paragraph::new(format!("Select {} Assets", selection.required()))
            .style(
                Style::default()
                    .fg(TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(GRID))),
        area,
    );
}

fn render_listing(frame: &mut Frame<'_>, area: Rect, selection: &AssetSelection) {
    let items: Vec<ListItem> = selection
        .listings()
        .iter()
        .enumerate()
        .map(|(idx, listing)| {
            let marker = if selection.is_selected(idx) { "[x]" } else { "[ ]" };
            let style = if selection.is_selected(idx) {
                Style::default().fg(UP)
            } else {
                Style::default().fg(TEXT_PRIMARY)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {} ", marker), style),
                Span::styled(
                    format!("{} ({})", listing.name, listing.symbol.to_uppercase()),
                    style,
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(format!(
                    " Top {} by market cap · {} selected ",
                    selection.listings().len(),
                    selection.selected_count()
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(GRID)),
        )
        .highlight_style(Style::default().bg(HIGHLIGHT).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(selection.cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_period(frame: &mut Frame<'_>, area: Rect, selection: &AssetSelection) {
    frame.render_widget(
        Paragraph::new(format!("◀ Last {} days ▶", selection.lookback_days()))
            .style(Style::default().fg(TEXT_PRIMARY))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(" History period ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(GRID)),
            ),
        area,
    );
}

fn render_button(frame: &mut Frame<'_>, area: Rect, selection: &AssetSelection) {
    let (text, style) = match selection.notice() {
        Some(notice) => (notice.to_string(), Style::default().fg(DOWN)),
        None if selection.can_start() => (
            selection.button_label(),
            Style::default()
                .fg(Color::White)
                .bg(HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
        ),
        None => (
            selection.button_label(),
            Style::default().fg(TEXT_SECONDARY),
        ),
    };

    frame.render_widget(
        Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(GRID))),
        area,
    );
}
