//! Terminal User Interface implementation
//!
//! Provides the dashboard and launcher screens using ratatui.

mod input;
mod render;

use std::io::{Stdout, stdout};

use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;

use super::DashboardView;
use crate::config::AssetConfig;
use crate::dashboard::{DashboardState, PanelState, RefreshEvent, Renderer, events};

pub use input::{InputListener, is_quit_key, launcher_action};
pub use render::{render_dashboard, render_selector};

/// RAII helper controlling the terminal lifecycle
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    /// Switch the terminal to raw mode on the alternate screen
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal })
    }

    pub fn draw<F>(&mut self, render: F) -> Result<()>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// Restore terminal to canonical mode
    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, cursor::Show, LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Attempt to restore the terminal; ignore errors because we are in Drop
        let _ = disable_raw_mode();
        let mut stdout = stdout();
        let _ = execute!(stdout, cursor::Show, LeaveAlternateScreen);
    }
}

/// Full-screen renderer: keeps the last painted panel states and redraws the
/// whole frame on every tick
pub struct TerminalRenderer {
    tui: Tui,
    view: DashboardView,
    state: DashboardState,
    events: Option<mpsc::UnboundedReceiver<RefreshEvent>>,
}

impl TerminalRenderer {
    pub fn new(tui: Tui, view: DashboardView, state: DashboardState) -> Self {
        Self {
            tui,
            view,
            state,
            events: None,
        }
    }

    /// Show worker events in the activity pane
    pub fn with_events(mut self, events: mpsc::UnboundedReceiver<RefreshEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    fn sync(&mut self) {
        if let Some(rx) = self.events.as_mut() {
            for event in events::drain(rx) {
                self.view.push_activity(event.to_string());
            }
        }
        self.view.stats = self.state.stats.snapshot();
        self.view.refreshing = self.state.is_busy();
    }

    /// Give the terminal back to the shell
    pub fn restore(mut self) -> Result<()> {
        self.tui.restore()
    }
}

impl Renderer for TerminalRenderer {
    fn render_asset_panel(&mut self, asset: &AssetConfig, state: &PanelState) {
        self.view.set_panel(&asset.id, state.clone());
    }

    fn render_clock_panel(&mut self, seconds_remaining: u64, interval_total: u64) {
        self.view.set_clock(seconds_remaining, interval_total);
    }

    fn present(&mut self) -> Result<()> {
        self.sync();
        let view = &self.view;
        self.tui.draw(|frame| render_dashboard(frame, view))
    }
}
