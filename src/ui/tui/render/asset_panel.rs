use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::config::AssetConfig;
use crate::dashboard::PanelState;
use crate::provider::{MarketSnapshot, OhlcCandle, OhlcSeries};
use crate::ui::{
    DOWN, DashboardView, GRID, TEXT_PRIMARY, TEXT_SECONDARY, UP, change_color, format_change,
    format_day, format_price, parse_hex_color,
};

const LOADING_MESSAGE: &str = "Loading...";
const FAILED_MESSAGE: &str = "Failed to load (OHLC)";

pub(super) fn render_asset_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &DashboardView,
    asset: &AssetConfig,
) {
    let color = parse_hex_color(&asset.color).unwrap_or(TEXT_PRIMARY);
    let state = view.panel(&asset.id);

    let mut title = vec![Span::styled(
        format!(" {} ", asset.id.as_str().to_uppercase()),
        Style::default()
            .fg(TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    )];
    if matches!(state, PanelState::Stale { .. }) {
        title.push(Span::styled("stale ", Style::default().fg(DOWN)));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GRID));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    match state {
        PanelState::Loading => render_message(frame, inner, LOADING_MESSAGE, TEXT_SECONDARY),
        PanelState::Failed { snapshot } => {
            let rest = match snapshot {
                Some(snapshot) => render_figures(frame, inner, view, snapshot, color),
                None => inner,
            };
            render_message(frame, rest, FAILED_MESSAGE, DOWN);
        }
        PanelState::SnapshotOnly { snapshot } => {
            let rest = render_figures(frame, inner, view, snapshot, color);
            render_message(frame, rest, LOADING_MESSAGE, TEXT_SECONDARY);
        }
        PanelState::Fresh { snapshot, series } => {
            let rest = render_figures(frame, inner, view, snapshot, color);
            render_chart(frame, rest, series, Some(snapshot.current_price), color);
        }
        PanelState::Stale { snapshot, series } => {
            let rest = match snapshot {
                Some(snapshot) => render_figures(frame, inner, view, snapshot, color),
                None => inner,
            };
            render_chart(
                frame,
                rest,
                series,
                snapshot.map(|s| s.current_price),
                color,
            );
        }
    }
}

/// Price, 24h change, high/low and volume; returns the area left below
fn render_figures(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &DashboardView,
    snapshot: &MarketSnapshot,
    color: Color,
) -> Rect {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let secondary = Style::default().fg(TEXT_SECONDARY);
    let lines = vec![
        Line::from(vec![
            Span::styled(
                view.price(snapshot.current_price),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format_change(snapshot.change_24h_pct),
                Style::default().fg(change_color(snapshot.change_24h_pct)),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("High 24h: {}", view.price(snapshot.high_24h)), secondary),
            Span::raw("  "),
            Span::styled(format!("Low 24h: {}", view.price(snapshot.low_24h)), secondary),
        ]),
        Line::from(Span::styled(
            format!("Vol 24h: {}", view.volume(snapshot.volume_24h)),
            secondary,
        )),
    ];

    frame.render_widget(Paragraph::new(lines), chunks[0]);
    chunks[1]
}

fn render_message(frame: &mut Frame<'_>, area: Rect, message: &str, color: Color) {
    if area.height == 0 {
        return;
    }
    let y = area.y + area.height / 2;
    frame.render_widget(
        Paragraph::new(message)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        Rect::new(area.x, y, area.width, 1),
    );
}

fn render_chart(
    frame: &mut Frame<'_>,
    area: Rect,
    series: &OhlcSeries,
    current_price: Option<f64>,
    color: Color,
) {
    if area.width < 12 || area.height < 4 || series.is_empty() {
        return;
    }

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(11), Constraint::Min(2)])
        .split(area);
    let price_axis_area = horizontal[0];

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(horizontal[1]);
    let chart_area = vertical[0];
    let time_axis_area = vertical[1];

    let candles = fit_candles(series.candles(), (chart_area.width / 2).max(1) as usize);
    let Some((mut min_price, mut max_price)) = OhlcSeries::from_candles(candles.clone()).price_range()
    else {
        return;
    };
    if let Some(price) = current_price {
        min_price = min_price.min(price);
        max_price = max_price.max(price);
    }
    if (max_price - min_price).abs() < f64::EPSILON {
        max_price = min_price + 1.0;
    } else {
        let padding = (max_price - min_price) * 0.05;
        min_price -= padding;
        max_price += padding;
    }
    let price_span = (max_price - min_price).max(f64::EPSILON);

    if let Some(price) = current_price {
        draw_price_line(frame, chart_area, price, min_price, price_span, color);
    }
    draw_candlesticks(frame, chart_area, &candles, min_price, price_span);

    // Price axis labels (max, mid, min)
    {
        let buffer = frame.buffer_mut();
        let label_style = Style::default().fg(TEXT_SECONDARY);
        let width = price_axis_area.width as usize;

        buffer.set_string(
            price_axis_area.x,
            chart_area.y,
            axis_label(max_price, width),
            label_style,
        );
        if chart_area.height > 2 {
            buffer.set_string(
                price_axis_area.x,
                chart_area.y + chart_area.height / 2,
                axis_label((min_price + max_price) / 2.0, width),
                label_style,
            );
        }
        buffer.set_string(
            price_axis_area.x,
            chart_area.y + chart_area.height.saturating_sub(1),
            axis_label(min_price, width),
            label_style,
        );
    }

    // Date axis: first, middle and last candle
    let dates = match (candles.first(), candles.get(candles.len() / 2), candles.last()) {
        (Some(first), Some(middle), Some(last)) => Line::from(vec![Span::styled(
            spread_labels(
                &[
                    format_day(first.timestamp_ms),
                    format_day(middle.timestamp_ms),
                    format_day(last.timestamp_ms),
                ],
                time_axis_area.width as usize,
            ),
            Style::default().fg(TEXT_SECONDARY),
        )]),
        _ => Line::default(),
    };
    frame.render_widget(Paragraph::new(dates), time_axis_area);
}

fn draw_price_line(
    frame: &mut Frame<'_>,
    area: Rect,
    price: f64,
    min_price: f64,
    price_span: f64,
    color: Color,
) {
    let y = price_to_y(price, min_price, price_span, area);
    let style = Style::default().fg(color);
    let buffer = frame.buffer_mut();

    for x in (area.x..area.x + area.width).step_by(2) {
        buffer.get_mut(x, y).set_style(style).set_symbol("╌");
    }
}

fn draw_candlesticks(
    frame: &mut Frame<'_>,
    area: Rect,
    candles: &[OhlcCandle],
    min_price: f64,
    price_span: f64,
) {
    if area.width < 2 || area.height < 2 {
        return;
    }

    let denom = (candles.len().saturating_sub(1)).max(1) as f64;
    let width_f = (area.width - 1) as f64;
    let buffer = frame.buffer_mut();

    for (idx, candle) in candles.iter().enumerate() {
        let rel_x = if candles.len() == 1 {
            0.0
        } else {
            idx as f64 / denom
        };
        let x = (area.x + (rel_x * width_f).round() as u16).min(area.x + area.width - 1);

        let style = if candle.close >= candle.open {
            Style::default().fg(UP)
        } else {
            Style::default().fg(DOWN)
        };

        let y_high = price_to_y(candle.high, min_price, price_span, area);
        let y_low = price_to_y(candle.low, min_price, price_span, area);
        for y in y_high.min(y_low)..=y_high.max(y_low) {
            if within(area, x, y) {
                buffer.get_mut(x, y).set_style(style).set_symbol("│");
            }
        }

        let y_open = price_to_y(candle.open, min_price, price_span, area);
        let y_close = price_to_y(candle.close, min_price, price_span, area);
        let body = if y_open == y_close { "─" } else { "█" };
        for y in y_open.min(y_close)..=y_open.max(y_close) {
            if within(area, x, y) {
                buffer.get_mut(x, y).set_style(style).set_symbol(body);
            }
        }
    }
}

/// Merge neighbouring candles so at most `max` remain
fn fit_candles(candles: &[OhlcCandle], max: usize) -> Vec<OhlcCandle> {
    if max == 0 || candles.len() <= max {
        return candles.to_vec();
    }

    let per_bucket = candles.len().div_ceil(max);
    candles
        .chunks(per_bucket)
        .filter_map(|chunk| {
            let first = chunk.first()?;
            let last = chunk.last()?;
            Some(OhlcCandle {
                timestamp_ms: first.timestamp_ms,
                open: first.open,
                close: last.close,
                high: chunk.iter().map(|c| c.high).fold(f64::MIN, f64::max),
                low: chunk.iter().map(|c| c.low).fold(f64::MAX, f64::min),
            })
        })
        .collect()
}

fn price_to_y(price: f64, min_price: f64, price_span: f64, area: Rect) -> u16 {
    if area.height <= 1 {
        return area.y;
    }
    let normalized = ((price - min_price) / price_span).clamp(0.0, 1.0);
    let offset = ((1.0 - normalized) * (area.height - 1) as f64).round() as u16;
    area.y + offset.min(area.height - 1)
}

fn within(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x && x < area.x + area.width && y >= area.y && y < area.y + area.height
}

fn axis_label(value: f64, width: usize) -> String {
    let mut label = format_price("", value).trim_start().to_string();
    if width > 0 && label.len() > width {
        label.truncate(width);
    }
    label
}

/// Place labels at the left edge, centre and right edge of `width` columns
fn spread_labels(labels: &[String; 3], width: usize) -> String {
    let mut row = vec![' '; width];
    let positions = [
        0,
        (width / 2).saturating_sub(labels[1].len() / 2),
        width.saturating_sub(labels[2].len()),
    ];

    for (label, start) in labels.iter().zip(positions) {
        for (offset, ch) in label.chars().enumerate() {
            if let Some(cell) = row.get_mut(start + offset) {
                *cell = ch;
            }
        }
    }
    row.into_iter().collect()
}
