//! Scoring policy and the score ledger.
//!
//! A response earns a point for opening a valued box on the correct side,
//! loses a point for opening a devalued box, and earns nothing otherwise.
//! Deltas are appended to the [`ScoreLedger`] in completion order;
//! checkpoint trials read the running sum and the sum since the previous
//! checkpoint.

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::sequence::Phase;

/// Points for a single response.
///
/// | choice matches | devalued | points |
/// |---|---|---|
/// | yes | no | +1 |
/// | yes | yes | -1 |
/// | no / no response | either | 0 |
///
/// # Examples
///
/// ```
/// use fabfruit::{score, Direction};
///
/// assert_eq!(score(Some(Direction::Right), Direction::Right, false), 1);
/// assert_eq!(score(Some(Direction::Right), Direction::Right, true), -1);
/// assert_eq!(score(Some(Direction::Left), Direction::Right, true), 0);
/// assert_eq!(score(None, Direction::Right, false), 0);
/// ```
#[must_use]
pub fn score(choice: Option<Direction>, correct: Direction, devalued: bool) -> i8 {
    match (choice == Some(correct), devalued) {
        (true, false) => 1,
        (true, true) => -1,
        (false, _) => 0,
    }
}

/// One scored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Phase of the response.
    pub phase: Phase,
    /// Block of the response within its phase.
    pub block: usize,
    /// Points awarded: -1, 0 or +1.
    pub delta: i8,
}

/// Summary read by a checkpoint trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// Points earned since the previous checkpoint.
    pub earned: i64,
    /// Most points that could have been earned over the same interval.
    pub max: u32,
    /// Running total over the whole ledger.
    pub total: i64,
}

/// Append-only per-trial score bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ScoreLedger {
    entries: Vec<LedgerEntry>,
    checkpoint_at: usize,
}

impl ScoreLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the delta for one completed response.
    pub fn record(&mut self, phase: Phase, block: usize, delta: i8) {
        self.entries.push(LedgerEntry {
            phase,
            block,
            delta,
        });
    }

    /// Every recorded response, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of recorded responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true before the first response.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent delta, if any.
    #[must_use]
    pub fn last(&self) -> Option<i8> {
        self.entries.last().map(|e| e.delta)
    }

    /// Running sum over every entry.
    #[must_use]
    pub fn total(&self) -> i64 {
        sum(&self.entries)
    }

    /// Sum of entries recorded since the previous checkpoint.
    #[must_use]
    pub fn since_checkpoint(&self) -> i64 {
        sum(&self.entries[self.checkpoint_at..])
    }

    /// Sum of entries recorded for one phase.
    #[must_use]
    pub fn phase_total(&self, phase: Phase) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.phase == phase)
            .map(|e| i64::from(e.delta))
            .sum()
    }

    /// Close the current interval and report it.
    pub fn checkpoint(&mut self, max: u32) -> CheckpointSummary {
        let summary = CheckpointSummary {
            earned: self.since_checkpoint(),
            max,
            total: self.total(),
        };
        self.checkpoint_at = self.entries.len();
        summary
    }
}

fn sum(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(|e| i64::from(e.delta)).sum()
}
