//! Refresh countdown shown in the clock panel

/// Seconds remaining until the next scheduled refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    total: u64,
}

impl Countdown {
    pub fn new(total: u64) -> Self {
        Self {
            remaining: total,
            total,
        }
    }

    /// Decrement by one second, floored at zero
    pub fn tick(&mut self) -> u64 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Back to the full interval
    pub fn reset(&mut self) {
        self.remaining = self.total;
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Fraction of the interval still to wait, in `0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.remaining as f64 / self.total as f64
    }

    /// `MM:SS` clock text
    pub fn label(&self) -> String {
        format_clock(self.remaining)
    }
}

pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
