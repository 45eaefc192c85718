//! Response sides and item roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The side a box opens to.
///
/// A missing response is represented as `Option<Direction>::None`, so a
/// correct direction can never be "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Opens to the left.
    Left,
    /// Opens to the right.
    Right,
}

impl Direction {
    /// Both directions, left first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Returns the other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Single-letter prefix used in box labels (`L0`, `R2`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Left => 'L',
            Self::Right => 'R',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Which side of a box an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Drawn on the outside of the closed box.
    Stimulus,
    /// Hidden inside; revealed when the box opens.
    Outcome,
}

impl Role {
    /// Returns the other side of the box.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Stimulus => Self::Outcome,
            Self::Outcome => Self::Stimulus,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stimulus => write!(f, "stimulus"),
            Self::Outcome => write!(f, "outcome"),
        }
    }
}
