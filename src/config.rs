//! Task settings.
//!
//! Counts and timing for each phase, plus the shape of the devaluation
//! schedule shared by both slips phases. Defaults reproduce the standard
//! task; a JSON file may override any top-level section.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FabResult, ValidationError};
use crate::schedule::{ScheduleParams, DEFAULT_MAX_ATTEMPTS};
use crate::sequence::Phase;

/// Seconds from a block's clock start to its first trial.
pub const DEFAULT_FIRST_ONSET: f64 = 3.0;

/// Counts and timing for one phase. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSettings {
    /// Number of blocks.
    pub blocks: usize,
    /// Repetitions of every box per block (outcome devaluation: repeats of
    /// the full left x right product).
    pub reps: usize,
    /// Response window.
    pub response_duration: f64,
    /// Inter-trial intervals, cycled to cover a block and shuffled per block.
    pub itis: Vec<f64>,
    /// Outcome reveal after each response; zero for phases without feedback.
    #[serde(default)]
    pub feedback_duration: f64,
    /// Score summary display time.
    pub checkpoint_duration: f64,
    /// Study time for the cue grid.
    #[serde(default)]
    pub cue_duration: f64,
    /// Keep one clock running across blocks instead of restarting it.
    #[serde(default)]
    pub combine: bool,
    /// Redraw a block order holding this many runs of 3+ same-side trials.
    #[serde(default)]
    pub max_direction_strikes: Option<usize>,
}

impl PhaseSettings {
    /// Instructed discrimination: 6 blocks, every box twice, with feedback.
    #[must_use]
    pub fn instructed() -> Self {
        Self {
            blocks: 6,
            reps: 2,
            response_duration: 1.0,
            itis: vec![0.5],
            feedback_duration: 1.0,
            checkpoint_duration: 2.0,
            cue_duration: 0.0,
            combine: false,
            max_direction_strikes: None,
        }
    }

    /// Outcome devaluation: the 3 x 3 product, 4 times.
    #[must_use]
    pub fn outcome() -> Self {
        Self {
            blocks: 1,
            reps: 4,
            response_duration: 1.0,
            itis: vec![1.0],
            feedback_duration: 0.0,
            checkpoint_duration: 2.0,
            cue_duration: 0.0,
            combine: false,
            max_direction_strikes: None,
        }
    }

    /// Slips of action and devaluation discrimination: 9 blocks of 12.
    #[must_use]
    pub fn slips() -> Self {
        Self {
            blocks: 9,
            reps: 2,
            response_duration: 1.0,
            itis: vec![1.0, 1.0, 1.0, 2.0, 2.0, 5.0],
            feedback_duration: 0.0,
            checkpoint_duration: 1.0,
            cue_duration: 5.0,
            combine: false,
            max_direction_strikes: None,
        }
    }

    fn validate(&self, phase: Phase) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidPhaseSettings { phase, reason };

        if self.blocks == 0 {
            return Err(invalid("blocks must be > 0".to_string()));
        }
        if self.reps == 0 {
            return Err(invalid("reps must be > 0".to_string()));
        }
        if !(self.response_duration.is_finite() && self.response_duration > 0.0) {
            return Err(invalid(format!(
                "response_duration must be positive, got {}",
                self.response_duration
            )));
        }
        for (name, value) in [
            ("feedback_duration", self.feedback_duration),
            ("checkpoint_duration", self.checkpoint_duration),
            ("cue_duration", self.cue_duration),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!("{name} must be >= 0, got {value}")));
            }
        }
        if let Some(bad) = self.itis.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(invalid(format!("itis must be >= 0, got {bad}")));
        }
        if self.max_direction_strikes == Some(0) {
            return Err(invalid("max_direction_strikes must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Shape of the devaluation schedule used by both slips phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Test blocks; must match the block count of both slips phases.
    pub n_blocks: usize,
    /// Blocks on which each box is devalued.
    pub reps_per_item: usize,
    /// Boxes devalued on each block.
    pub choose: usize,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            n_blocks: 9,
            reps_per_item: 3,
            choose: 2,
        }
    }
}

impl ScheduleSettings {
    /// Schedule parameters for `n_items` boxes.
    #[must_use]
    pub const fn params(&self, n_items: usize) -> ScheduleParams {
        ScheduleParams {
            n_blocks: self.n_blocks,
            n_items,
            reps: self.reps_per_item,
            choose: self.choose,
        }
    }
}

/// Settings for a whole task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Onset of the first trial of every phase, in seconds.
    pub first_onset: f64,
    /// Bound on whole-schedule redraws.
    pub max_schedule_attempts: usize,
    /// Shape of the devaluation schedule.
    pub schedule: ScheduleSettings,
    /// Instructed discrimination.
    pub instructed: PhaseSettings,
    /// Outcome devaluation.
    pub outcome: PhaseSettings,
    /// Slips of action.
    pub slips: PhaseSettings,
    /// Devaluation discrimination.
    pub discrimination: PhaseSettings,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            first_onset: DEFAULT_FIRST_ONSET,
            max_schedule_attempts: DEFAULT_MAX_ATTEMPTS,
            schedule: ScheduleSettings::default(),
            instructed: PhaseSettings::instructed(),
            outcome: PhaseSettings::outcome(),
            slips: PhaseSettings::slips(),
            discrimination: PhaseSettings::slips(),
        }
    }
}

impl TaskSettings {
    /// Parse settings from JSON. Missing top-level sections keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `FabError::Serialization` on malformed JSON and a
    /// validation error if the parsed settings are inconsistent.
    pub fn from_json_str(json: &str) -> FabResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `FabError::Io` if the file cannot be read, otherwise as
    /// [`TaskSettings::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> FabResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "loaded task settings");
        Ok(settings)
    }

    /// Settings for one phase.
    #[must_use]
    pub const fn phase(&self, phase: Phase) -> &PhaseSettings {
        match phase {
            Phase::InstructedDiscrimination => &self.instructed,
            Phase::OutcomeDevaluation => &self.outcome,
            Phase::SlipsOfAction => &self.slips,
            Phase::DevaluationDiscrimination => &self.discrimination,
        }
    }

    /// Check every phase and the schedule against each other.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidScheduleParams` for a negative
    /// `first_onset` or a zero attempt bound, and
    /// `ValidationError::InvalidPhaseSettings` for a bad phase or a test
    /// phase whose block count differs from `schedule.n_blocks`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.first_onset.is_finite() && self.first_onset >= 0.0) {
            return Err(ValidationError::InvalidScheduleParams {
                reason: format!("first_onset must be >= 0, got {}", self.first_onset),
            });
        }
        if self.max_schedule_attempts == 0 {
            return Err(ValidationError::InvalidScheduleParams {
                reason: "max_schedule_attempts must be > 0".to_string(),
            });
        }
        for phase in Phase::ALL {
            self.phase(phase).validate(phase)?;
        }
        for phase in [Phase::SlipsOfAction, Phase::DevaluationDiscrimination] {
            let blocks = self.phase(phase).blocks;
            if blocks != self.schedule.n_blocks {
                return Err(ValidationError::InvalidPhaseSettings {
                    phase,
                    reason: format!(
                        "{blocks} blocks but the devaluation schedule has {}",
                        self.schedule.n_blocks
                    ),
                });
            }
        }
        Ok(())
    }
}
