//! Trial sequences for each task phase.
//!
//! Every phase is laid out by the same [`PhaseTemplate`]: an optional cue
//! grid per block, the block's response trials (optionally each followed by
//! feedback), and checkpoint trials that summarize the score. The phase
//! builders in [`phases`] only decide which probes go into which block.

pub mod balance;
pub mod phases;
pub mod template;

pub use phases::{build_instructed_discrimination, build_outcome_devaluation, build_slips_block};
pub use template::{CheckpointPolicy, PhaseTemplate, ProbeBlock, CHECKPOINT_GROUP_SIZE};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::direction::{Direction, Role};
use crate::pairing::BoxId;

/// Task phase, used to tag trials and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Learn which side opens each box, with feedback.
    #[serde(rename = "ID")]
    InstructedDiscrimination,
    /// Choose between a valued and a devalued outcome.
    #[serde(rename = "OD")]
    OutcomeDevaluation,
    /// Go/no-go on stimuli after studying devalued outcomes.
    #[serde(rename = "SOA")]
    SlipsOfAction,
    /// Go/no-go on outcomes after studying devalued stimuli.
    #[serde(rename = "DD")]
    DevaluationDiscrimination,
}

impl Phase {
    /// All phases in task order.
    pub const ALL: [Self; 4] = [
        Self::InstructedDiscrimination,
        Self::OutcomeDevaluation,
        Self::SlipsOfAction,
        Self::DevaluationDiscrimination,
    ];

    /// Short tag written to data files.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InstructedDiscrimination => "ID",
            Self::OutcomeDevaluation => "OD",
            Self::SlipsOfAction => "SOA",
            Self::DevaluationDiscrimination => "DD",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// When a trial starts and how long it lasts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Onset relative to the block clock.
    pub onset: f64,
    /// Time on screen.
    pub duration: f64,
    /// Fixation after the trial (and its feedback, if any).
    pub iti: f64,
}

impl Timing {
    /// Timing with no ITI.
    #[must_use]
    pub const fn new(onset: f64, duration: f64) -> Self {
        Self {
            onset,
            duration,
            iti: 0.0,
        }
    }

    /// Offset, before the ITI.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }
}

/// One item drawn on a cue grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueItem {
    /// Box the item belongs to.
    pub box_id: BoxId,
    /// Label of that box.
    pub label: String,
    /// Item name.
    pub name: String,
    /// Drawn with the void marker.
    pub devalued: bool,
}

/// The devalued item shown next to the valued one in a choice trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distractor {
    /// Box the distractor belongs to.
    pub box_id: BoxId,
    /// Label of that box.
    pub label: String,
    /// Outcome name.
    pub name: String,
    /// Drawn above the valued item.
    pub on_top: bool,
}

/// What a response trial shows and how it is scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Box the response is scored against.
    pub box_id: BoxId,
    /// Label of that box.
    pub label: String,
    /// Name of the item shown.
    pub shown: String,
    /// Side of the box the shown item sits on.
    pub role: Role,
    /// Side that opens the box.
    pub correct: Direction,
    /// Whether pressing loses a point instead of earning one.
    pub devalued: bool,
    /// Devalued alternative, for choice trials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distractor: Option<Distractor>,
}

impl Probe {
    /// Points for a response to this probe.
    #[must_use]
    pub fn score(&self, choice: Option<Direction>) -> i8 {
        crate::scoring::score(choice, self.correct, self.devalued)
    }
}

/// What a trial does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrialKind {
    /// Study grid; no response accepted.
    Cue {
        /// Side of the boxes drawn.
        role: Role,
        /// One entry per box, in box order.
        items: Vec<CueItem>,
    },
    /// Timed response.
    Response(Probe),
    /// Reveals the outcome and the score of the preceding response.
    Feedback {
        /// Box that was scored.
        box_id: BoxId,
        /// Outcome revealed.
        outcome: String,
    },
    /// Points earned since the previous checkpoint, out of `max`.
    Checkpoint {
        /// Most points available over the interval.
        max: u32,
    },
}

/// One entry of a phase's trial list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Phase the trial belongs to.
    pub phase: Phase,
    /// Block index within the phase.
    pub block: usize,
    /// Response index within the block (response and feedback trials).
    pub trial: Option<usize>,
    /// Test block whose devaluation state applies; `None` when never devalued.
    pub devaluation_block: Option<usize>,
    /// What the trial shows.
    pub kind: TrialKind,
    /// Onset, duration and ITI.
    pub timing: Timing,
}

impl Trial {
    /// The probe of a response trial.
    #[must_use]
    pub const fn probe(&self) -> Option<&Probe> {
        match &self.kind {
            TrialKind::Response(probe) => Some(probe),
            _ => None,
        }
    }

    /// Returns true for response trials.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self.kind, TrialKind::Response(_))
    }

    /// Returns true for checkpoint trials.
    #[must_use]
    pub const fn is_checkpoint(&self) -> bool {
        matches!(self.kind, TrialKind::Checkpoint { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_codes() {
        let codes: Vec<&str> = Phase::ALL.iter().map(|p| p.code()).collect();
        assert_eq!(codes, vec!["ID", "OD", "SOA", "DD"]);
        assert_eq!(format!("{}", Phase::SlipsOfAction), "SOA");
        assert_eq!(serde_json::to_string(&Phase::OutcomeDevaluation).unwrap(), "\"OD\"");
    }

    #[test]
    fn test_probe_score_uses_devaluation() {
        let probe = Probe {
            box_id: BoxId::derive("L0", "a", "b"),
            label: "L0".to_string(),
            shown: "a".to_string(),
            role: Role::Stimulus,
            correct: Direction::Left,
            devalued: true,
            distractor: None,
        };
        assert_eq!(probe.score(Some(Direction::Left)), -1);
        assert_eq!(probe.score(None), 0);
    }

    #[test]
    fn test_timing_end() {
        let t = Timing::new(3.0, 1.5);
        assert!((t.end() - 4.5).abs() < f64::EPSILON);
    }
}
