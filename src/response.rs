//! Responses returned by the trial player, and key mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::direction::Direction;

/// What the participant did on one response trial.
///
/// A timeout is a normal response with no direction and no reaction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Side pressed.
    pub direction: Option<Direction>,
    /// Milliseconds from onset to keypress.
    pub reaction_time_ms: Option<f64>,
}

impl Response {
    /// A keypress in `direction` after `reaction_time_ms`.
    #[must_use]
    pub const fn pressed(direction: Direction, reaction_time_ms: f64) -> Self {
        Self {
            direction: Some(direction),
            reaction_time_ms: Some(reaction_time_ms),
        }
    }

    /// No keypress within the deadline.
    #[must_use]
    pub const fn timeout() -> Self {
        Self {
            direction: None,
            reaction_time_ms: None,
        }
    }

    /// Returns true if no side was pressed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.direction.is_none()
    }
}

/// Maps key names reported by the input device to directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMap(HashMap<String, Direction>);

impl Default for KeyMap {
    /// Arrow keys and the `1`/`2` button box.
    fn default() -> Self {
        Self(HashMap::from([
            ("left".to_string(), Direction::Left),
            ("right".to_string(), Direction::Right),
            ("1".to_string(), Direction::Left),
            ("2".to_string(), Direction::Right),
        ]))
    }
}

impl KeyMap {
    /// An empty map; bind keys with [`KeyMap::bind`].
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Bind a key to a direction.
    #[must_use]
    pub fn bind(mut self, key: impl Into<String>, direction: Direction) -> Self {
        self.0.insert(key.into(), direction);
        self
    }

    /// Direction for a single key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Direction> {
        self.0.get(key).copied()
    }

    /// Direction for the keys pressed during a trial.
    ///
    /// Only a single mapped key counts as a response; pressing several keys
    /// at once is treated as no response.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabfruit::{Direction, KeyMap};
    ///
    /// let keys = KeyMap::default();
    /// assert_eq!(keys.resolve(&["left"]), Some(Direction::Left));
    /// assert_eq!(keys.resolve(&["left", "right"]), None);
    /// assert_eq!(keys.resolve::<&str>(&[]), None);
    /// ```
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, keys: &[S]) -> Option<Direction> {
        match keys {
            [] => None,
            [key] => self.get(key.as_ref()),
            _ => {
                let pressed: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
                tracing::warn!(?pressed, "more than one key pressed; counting as no response");
                None
            }
        }
    }
}
