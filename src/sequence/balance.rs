//! Limits on same-side runs within a block order.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::direction::Direction;
use crate::error::GenerationError;
use crate::sequence::Phase;

/// Bound on reshuffles while looking for an acceptable order.
pub const MAX_ORDER_ATTEMPTS: usize = 1000;

/// Counts strikes: every trial past the second in a same-side run is one.
///
/// ```
/// use fabfruit::sequence::balance::direction_strikes;
/// use fabfruit::Direction::{Left as L, Right as R};
///
/// assert_eq!(direction_strikes(&[L, L, L, R, R, R]), 2);
/// assert_eq!(direction_strikes(&[L, L, L, L, L, R]), 3);
/// assert_eq!(direction_strikes(&[L, R, R, L, R, R]), 0);
/// ```
#[must_use]
pub fn direction_strikes(dirs: &[Direction]) -> usize {
    let mut strikes = 0;
    let mut run = 0;
    let mut prev = None;
    for &d in dirs {
        if prev == Some(d) {
            run += 1;
        } else {
            run = 1;
            prev = Some(d);
        }
        if run > 2 {
            strikes += 1;
        }
    }
    strikes
}

/// Shuffle `items`, redrawing while the order has `max_strikes` or more
/// strikes. With `max_strikes == None` a single shuffle is accepted.
pub fn shuffle_limited<T, R, F>(
    items: &mut [T],
    max_strikes: Option<usize>,
    phase: Phase,
    rng: &mut R,
    direction_of: F,
) -> Result<(), GenerationError>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> Direction,
{
    let Some(max_strikes) = max_strikes else {
        items.shuffle(rng);
        return Ok(());
    };

    for attempt in 1..=MAX_ORDER_ATTEMPTS {
        items.shuffle(rng);
        let dirs: Vec<Direction> = items.iter().map(&direction_of).collect();
        if direction_strikes(&dirs) < max_strikes {
            if attempt > 1 {
                tracing::debug!(%phase, attempt, "accepted block order after reshuffling");
            }
            return Ok(());
        }
    }

    Err(GenerationError::OrderExhausted {
        phase,
        attempts: MAX_ORDER_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::direction::Direction::{Left as L, Right as R};

    #[test]
    fn strikes_empty_and_short() {
        assert_eq!(direction_strikes(&[]), 0);
        assert_eq!(direction_strikes(&[L, L]), 0);
        assert_eq!(direction_strikes(&[L, L, L]), 1);
    }

    #[test]
    fn shuffle_limited_respects_bound() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let mut dirs = vec![L, L, L, L, L, L, R, R, R, R, R, R];
            shuffle_limited(&mut dirs, Some(2), Phase::InstructedDiscrimination, &mut rng, |d| *d)
                .unwrap();
            assert!(direction_strikes(&dirs) < 2);
            assert_eq!(dirs.iter().filter(|d| **d == L).count(), 6);
        }
    }

    #[test]
    fn shuffle_limited_reports_impossible_bound() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut dirs = vec![L; 6];
        let err = shuffle_limited(&mut dirs, Some(1), Phase::SlipsOfAction, &mut rng, |d| *d)
            .unwrap_err();
        assert!(matches!(err, GenerationError::OrderExhausted { phase: Phase::SlipsOfAction, .. }));
    }

    #[test]
    fn shuffle_without_bound_keeps_items() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut items: Vec<usize> = (0..12).collect();
        shuffle_limited(&mut items, None, Phase::OutcomeDevaluation, &mut rng, |_| L).unwrap();
        items.sort_unstable();
        assert_eq!(items, (0..12).collect::<Vec<_>>());
    }
}
