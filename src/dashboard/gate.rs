//! Redraw gate raised by the worker and consumed by the render tick

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Dirty flag between the refresh worker and the render tick
#[derive(Debug, Default)]
pub struct RedrawGate {
    raised: AtomicBool,
    raises: AtomicU64,
}

impl RedrawGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that the cache holds data not yet painted
    pub fn raise(&self) {
        self.raises.fetch_add(1, Ordering::SeqCst);
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Lower the gate, returning whether it was raised
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }

    /// Total number of raises since creation
    pub fn raise_count(&self) -> u64 {
        self.raises.load(Ordering::SeqCst)
    }
}
