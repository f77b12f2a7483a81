//! Last-known-value ticker cache
//!
//! Holds the most recent validated snapshot so late joiners get immediate
//! context. Starts empty, set at most once per accepted record, never
//! cleared.

use parking_lot::RwLock;

use types::tick::TickerSnapshot;

#[derive(Default)]
pub struct TickerCache {
    latest: RwLock<Option<TickerSnapshot>>,
}

impl TickerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held snapshot atomically.
    pub fn set(&self, snapshot: TickerSnapshot) {
        *self.latest.write() = Some(snapshot);
    }

    /// Independent copy of the held snapshot; callers cannot alias internal
    /// state.
    pub fn get(&self) -> Option<TickerSnapshot> {
        self.latest.read().clone()
    }
}
