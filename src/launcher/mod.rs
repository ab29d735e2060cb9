//! Asset selector shown before the dashboard
//!
//! Lists the top assets by market capitalisation, lets the user pick exactly
//! the number of panels the dashboard shows and a history window, then writes
//! the choice into the configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event};
use tracing::info;

use crate::config::{AssetConfig, Config, MAX_ASSETS, MIN_ASSETS, assign_palette};
use crate::provider::{AssetId, AssetListing, MarketDataProvider};
use crate::ui::tui::{Tui, launcher_action, render_selector};

/// History windows offered by the selector, in days
pub const PERIOD_CHOICES: [u32; 3] = [7, 30, 90];
const DEFAULT_PERIOD_INDEX: usize = 1;

/// Key-level intent inside the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherAction {
    Up,
    Down,
    Toggle,
    NextPeriod,
    PreviousPeriod,
    Start,
    Quit,
    None,
}

/// What the selector loop should do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherOutcome {
    Continue,
    Start,
    Quit,
}

/// Selection model behind the launcher screen
#[derive(Debug, Clone)]
pub struct AssetSelection {
    listings: Vec<AssetListing>,
    selected: BTreeSet<usize>,
    cursor: usize,
    period_index: usize,
    required: usize,
    notice: Option<String>,
}

impl AssetSelection {
    pub fn new(listings: Vec<AssetListing>, required: usize) -> Self {
        Self {
            listings,
            selected: BTreeSet::new(),
            cursor: 0,
            period_index: DEFAULT_PERIOD_INDEX,
            required: required.clamp(MIN_ASSETS, MAX_ASSETS),
            notice: None,
        }
    }

    pub fn listings(&self) -> &[AssetListing] {
        &self.listings
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn move_up(&mut self) {
        if self.listings.is_empty() {
            return;
        }
        self.cursor = if self.cursor == 0 {
            self.listings.len() - 1
        } else {
            self.cursor - 1
        };
    }

    pub fn move_down(&mut self) {
        if !self.listings.is_empty() {
            self.cursor = (self.cursor + 1) % self.listings.len();
        }
    }

    /// Select or deselect the entry under the cursor
    pub fn toggle(&mut self) {
        if self.cursor >= self.listings.len() {
            return;
        }
        if !self.selected.remove(&self.cursor) {
            self.selected.insert(self.cursor);
        }
        self.notice = None;
    }

    pub fn next_period(&mut self) {
        self.period_index = (self.period_index + 1) % PERIOD_CHOICES.len();
    }

    pub fn previous_period(&mut self) {
        self.period_index = (self.period_index + PERIOD_CHOICES.len() - 1) % PERIOD_CHOICES.len();
    }

    pub fn lookback_days(&self) -> u32 {
        PERIOD_CHOICES[self.period_index]
    }

    pub fn can_start(&self) -> bool {
        self.selected.len() == self.required
    }

    pub fn button_label(&self) -> String {
        match self.selected.len() {
            n if n == self.required => "Start dashboard".to_string(),
            n if n > self.required => format!("Select only {} assets", self.required),
            _ => format!("Select {} assets", self.required),
        }
    }

    /// Selected ids in list order
    pub fn selected_ids(&self) -> Vec<AssetId> {
        self.selected
            .iter()
            .filter_map(|&idx| self.listings.get(idx))
            .map(|listing| listing.id.clone())
            .collect()
    }

    /// Selected assets with palette colours assigned in list order
    pub fn assets(&self) -> Vec<AssetConfig> {
        assign_palette(self.selected_ids())
    }

    /// Apply one key-level action
    pub fn handle(&mut self, action: LauncherAction) -> LauncherOutcome {
        match action {
            LauncherAction::Up => self.move_up(),
            LauncherAction::Down => self.move_down(),
            LauncherAction::Toggle => self.toggle(),
            LauncherAction::NextPeriod => self.next_period(),
            LauncherAction::PreviousPeriod => self.previous_period(),
            LauncherAction::Start => {
                if self.can_start() {
                    return LauncherOutcome::Start;
                }
                self.notice = Some(format!(
                    "You must select exactly {} assets.",
                    self.required
                ));
            }
            LauncherAction::Quit => return LauncherOutcome::Quit,
            LauncherAction::None => {}
        }
        LauncherOutcome::Continue
    }

    /// Write the selection into `config`
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if !self.can_start() {
            bail!(
                "Exactly {} assets must be selected, got {}",
                self.required,
                self.selected.len()
            );
        }
        apply_assets(config, self.selected_ids(), self.lookback_days())
    }
}

/// Replace the configured assets and history window, keeping every other setting
pub fn apply_assets(config: &mut Config, ids: Vec<AssetId>, lookback_days: u32) -> Result<()> {
    let mut updated = config.clone();
    updated.assets = assign_palette(ids);
    updated.lookback_days = lookback_days;
    updated.validate()?;

    *config = updated;
    Ok(())
}

/// Parse a comma separated `--assets` list
pub fn parse_asset_list(raw: &str) -> Vec<AssetId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(AssetId::from)
        .collect()
}

/// Fetch the ranking the selector offers
pub async fn fetch_listings(
    provider: &dyn MarketDataProvider,
    limit: usize,
) -> Result<Vec<AssetListing>> {
    info!("Fetching the {} most popular assets...", limit);
    provider
        .fetch_top_assets(limit)
        .await
        .context("Could not fetch the asset list")
}

/// Run the interactive selector until the user starts or quits.
///
/// Blocks on terminal input; call it from a blocking task.
pub fn run_selector(mut selection: AssetSelection) -> Result<Option<AssetSelection>> {
    let mut tui = Tui::new()?;

    let outcome = loop {
        tui.draw(|frame| render_selector(frame, &selection))?;

        if !event::poll(Duration::from_millis(250))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            match selection.handle(launcher_action(&key)) {
                LauncherOutcome::Continue => {}
                LauncherOutcome::Start => break Some(selection),
                LauncherOutcome::Quit => break None,
            }
        }
    };

    tui.restore()?;
    Ok(outcome)
}
