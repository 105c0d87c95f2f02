//! Rolling race history
//!
//! Keeps the last few completed races so the operator can compare runs.

use serde::{Deserialize, Serialize};

use crate::protocol::RaceResult;

/// Number of races kept in the history
pub const HISTORY_CAPACITY: usize = 4;

/// Lane times of one completed race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Elapsed seconds per lane, indexed by `lane - 1`
    pub times: Vec<f64>,
}

impl HistoryEntry {
    /// Create an entry from a lane time vector
    pub fn new(times: Vec<f64>) -> Self {
        Self { times }
    }
}

impl From<&RaceResult> for HistoryEntry {
    fn from(result: &RaceResult) -> Self {
        Self::new(result.times.clone())
    }
}

/// Fixed-capacity ring of recent races.
///
/// Writes overwrite the oldest slot once full; reads go newest first.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    slots: Vec<Option<HistoryEntry>>,
    /// Next slot to write
    head: usize,
}

impl ResultHistory {
    /// Create a history holding [`HISTORY_CAPACITY`] races
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a history holding `capacity` races (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            head: 0,
        }
    }

    /// Maximum number of retained races
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of retained races
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a race, evicting the oldest one when full
    pub fn push(&mut self, entry: HistoryEntry) {
        self.slots[self.head] = Some(entry);
        self.head = (self.head + 1) % self.slots.len();
    }

    /// Retained races from most to least recent.
    ///
    /// Starts one slot before the write position and walks backwards, so
    /// every call yields a fresh view.
    pub fn iter_recent(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        let cap = self.slots.len();
        (1..=cap).filter_map(move |back| self.slots[(self.head + cap - back) % cap].as_ref())
    }

    /// Most recent race, if any
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.iter_recent().next()
    }
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::new()
    }
}
