//! Error types for fabfruit.
//!
//! All errors are strongly typed using thiserror. Configuration problems
//! surface as [`ValidationError`] before any trial is produced; a scheduler
//! that runs out of attempts surfaces as [`GenerationError`].

use thiserror::Error;

use crate::sequence::Phase;

/// Validation errors raised while checking a task configuration.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Name pool is empty")]
    EmptyNamePool,

    #[error("Name pool has {size} names, expected an even number")]
    OddNamePool {
        size: usize,
    },

    #[error("{boxes} boxes cannot be split evenly into left and right")]
    UnbalancedBoxCount {
        boxes: usize,
    },

    #[error("Name '{name}' appears more than once in the pool")]
    DuplicateName {
        name: String,
    },

    #[error("Got {actual} devaluation sets for {expected} boxes")]
    DevaluationCountMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("Invalid schedule parameters: {reason}")]
    InvalidScheduleParams {
        reason: String,
    },

    #[error(
        "Schedule capacity mismatch: {n_blocks} blocks x {choose} per block != {n_items} items x {reps} reps"
    )]
    ScheduleCapacityMismatch {
        n_blocks: usize,
        choose: usize,
        n_items: usize,
        reps: usize,
    },

    #[error("Devaluation schedule has the wrong shape: {reason}")]
    ScheduleShapeMismatch {
        reason: String,
    },

    #[error("Invalid settings for {phase}: {reason}")]
    InvalidPhaseSettings {
        phase: Phase,
        reason: String,
    },

    #[error("No outcome items open to the {side}")]
    EmptyOutcomeGroup {
        side: String,
    },

    #[error("Stored seed {stored} does not match requested seed {requested}")]
    SeedMismatch {
        stored: u64,
        requested: u64,
    },

    #[error("Box file does not match this task: {reason}")]
    BoxFileMismatch {
        reason: String,
    },
}

/// Errors raised by randomized generation after validation passed.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(
        "Devaluation schedule not found after {attempts} attempts ({n_items} items, {n_blocks} blocks, {reps} reps, {choose} per block)"
    )]
    ScheduleExhausted {
        attempts: usize,
        n_blocks: usize,
        n_items: usize,
        reps: usize,
        choose: usize,
    },

    #[error("Could not draw a balanced {phase} block order after {attempts} attempts")]
    OrderExhausted {
        phase: Phase,
        attempts: usize,
    },
}

/// Top-level error type for fabfruit.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum FabError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl FabError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a generation error.
    #[must_use]
    pub const fn is_generation(&self) -> bool {
        matches!(self, Self::Generation(_))
    }

    /// Returns true if this is an I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if generating again with a fresh seed could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_))
    }
}

impl From<serde_json::Error> for FabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for fabfruit operations.
pub type FabResult<T> = Result<T, FabError>;
