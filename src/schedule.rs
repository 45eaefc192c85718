//! Devaluation schedule generation.
//!
//! Each item is devalued on exactly `reps` test blocks and every block
//! devalues exactly `choose` items. Items are drawn greedily one at a time;
//! a draw that leaves an item with too few open blocks abandons the attempt
//! and the whole schedule is drawn again, up to a fixed number of attempts.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, ValidationError};

/// Default bound on whole-schedule attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Shape of a devaluation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Number of test blocks.
    pub n_blocks: usize,
    /// Number of items (boxes) to schedule.
    pub n_items: usize,
    /// Blocks each item is devalued on.
    pub reps: usize,
    /// Items devalued on each block.
    pub choose: usize,
}

impl ScheduleParams {
    /// Validate the parameters.
    ///
    /// Total devaluation slots (`n_blocks * choose`) must equal total demand
    /// (`n_items * reps`); otherwise no assignment exists.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidScheduleParams` for zero or
    /// out-of-range fields and `ValidationError::ScheduleCapacityMismatch`
    /// when slots and demand differ.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.n_blocks == 0 {
            return Err(ValidationError::InvalidScheduleParams {
                reason: "n_blocks must be > 0".to_string(),
            });
        }
        if self.n_items == 0 {
            return Err(ValidationError::InvalidScheduleParams {
                reason: "n_items must be > 0".to_string(),
            });
        }
        if self.reps == 0 || self.reps > self.n_blocks {
            return Err(ValidationError::InvalidScheduleParams {
                reason: format!("reps must be in 1..={}", self.n_blocks),
            });
        }
        if self.choose == 0 || self.choose > self.n_items {
            return Err(ValidationError::InvalidScheduleParams {
                reason: format!("choose must be in 1..={}", self.n_items),
            });
        }
        if self.n_blocks * self.choose != self.n_items * self.reps {
            return Err(ValidationError::ScheduleCapacityMismatch {
                n_blocks: self.n_blocks,
                choose: self.choose,
                n_items: self.n_items,
                reps: self.reps,
            });
        }
        Ok(())
    }
}

/// Per-item devalued-block sets.
///
/// Only obtainable through [`generate_schedule`] or
/// [`DevaluationSchedule::from_per_item`], both of which enforce the exact
/// per-item and per-block counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevaluationSchedule {
    params: ScheduleParams,
    per_item: Vec<BTreeSet<usize>>,
    attempts: usize,
}

impl DevaluationSchedule {
    /// Check existing per-item sets (e.g. from a saved pairing) against `params`.
    ///
    /// The result reports zero attempts since nothing was drawn.
    ///
    /// # Errors
    ///
    /// Returns the error of [`ScheduleParams::validate`], or
    /// `ValidationError::ScheduleShapeMismatch` if the item count, an item's
    /// block count, a block index, or a block's item count is off.
    pub fn from_per_item(
        params: ScheduleParams,
        per_item: Vec<BTreeSet<usize>>,
    ) -> Result<Self, ValidationError> {
        params.validate()?;
        let mismatch = |reason: String| ValidationError::ScheduleShapeMismatch { reason };

        if per_item.len() != params.n_items {
            return Err(mismatch(format!(
                "{} items, expected {}",
                per_item.len(),
                params.n_items
            )));
        }
        let mut counts = vec![0usize; params.n_blocks];
        for (idx, blocks) in per_item.iter().enumerate() {
            if blocks.len() != params.reps {
                return Err(mismatch(format!(
                    "item {idx} is devalued on {} blocks, expected {}",
                    blocks.len(),
                    params.reps
                )));
            }
            for &block in blocks {
                let Some(count) = counts.get_mut(block) else {
                    return Err(mismatch(format!(
                        "item {idx} is devalued on block {block}, outside 0..{}",
                        params.n_blocks
                    )));
                };
                *count += 1;
            }
        }
        if let Some((block, &count)) = counts.iter().enumerate().find(|&(_, &c)| c != params.choose) {
            return Err(mismatch(format!(
                "block {block} devalues {count} items, expected {}",
                params.choose
            )));
        }

        Ok(Self {
            params,
            per_item,
            attempts: 0,
        })
    }

    /// Parameters the schedule satisfies.
    #[must_use]
    pub const fn params(&self) -> &ScheduleParams {
        &self.params
    }

    /// Devalued blocks for each item, by item index.
    #[must_use]
    pub fn per_item(&self) -> &[BTreeSet<usize>] {
        &self.per_item
    }

    /// Consumes the schedule, returning the per-item sets.
    #[must_use]
    pub fn into_per_item(self) -> Vec<BTreeSet<usize>> {
        self.per_item
    }

    /// Number of attempts it took to draw this schedule (zero if checked, not drawn).
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Number of items devalued on each block.
    #[must_use]
    pub fn block_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.params.n_blocks];
        for block in self.per_item.iter().flatten() {
            counts[*block] += 1;
        }
        counts
    }

    /// Items devalued on the given block.
    #[must_use]
    pub fn items_at(&self, block: usize) -> Vec<usize> {
        self.per_item
            .iter()
            .enumerate()
            .filter(|(_, set)| set.contains(&block))
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Generate a devaluation schedule with [`DEFAULT_MAX_ATTEMPTS`].
///
/// # Errors
///
/// See [`generate_schedule_with_limit`].
///
/// # Examples
///
/// ```
/// use fabfruit::{generate_schedule, ScheduleParams};
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(42);
/// let params = ScheduleParams { n_blocks: 9, n_items: 6, reps: 3, choose: 2 };
/// let schedule = generate_schedule(params, &mut rng).unwrap();
/// assert!(schedule.per_item().iter().all(|s| s.len() == 3));
/// assert!(schedule.block_counts().iter().all(|&c| c == 2));
/// ```
pub fn generate_schedule<R: Rng + ?Sized>(
    params: ScheduleParams,
    rng: &mut R,
) -> Result<DevaluationSchedule, crate::FabError> {
    generate_schedule_with_limit(params, DEFAULT_MAX_ATTEMPTS, rng)
}

/// Generate a devaluation schedule, drawing at most `max_attempts` times.
///
/// # Errors
///
/// Returns a `ValidationError` if `params` are inconsistent and
/// `GenerationError::ScheduleExhausted` if every attempt hit a dead end.
pub fn generate_schedule_with_limit<R: Rng + ?Sized>(
    params: ScheduleParams,
    max_attempts: usize,
    rng: &mut R,
) -> Result<DevaluationSchedule, crate::FabError> {
    params.validate()?;

    for attempt in 1..=max_attempts {
        match draw_once(&params, rng) {
            Some(per_item) => {
                tracing::debug!(attempt, ?params, "devaluation schedule drawn");
                return Ok(DevaluationSchedule {
                    params,
                    per_item,
                    attempts: attempt,
                });
            }
            None => {
                tracing::debug!(attempt, "devaluation draw hit a dead end; redrawing");
            }
        }
    }

    tracing::warn!(max_attempts, ?params, "devaluation schedule attempts exhausted");
    Err(GenerationError::ScheduleExhausted {
        attempts: max_attempts,
        n_blocks: params.n_blocks,
        n_items: params.n_items,
        reps: params.reps,
        choose: params.choose,
    }
    .into())
}

/// One greedy pass. Returns `None` when an item finds fewer than `reps`
/// blocks with remaining capacity.
fn draw_once<R: Rng + ?Sized>(params: &ScheduleParams, rng: &mut R) -> Option<Vec<BTreeSet<usize>>> {
    let mut remaining = vec![params.choose; params.n_blocks];
    let mut per_item = Vec::with_capacity(params.n_items);

    for _ in 0..params.n_items {
        let open: Vec<usize> = remaining
            .iter()
            .enumerate()
            .filter(|(_, &cap)| cap > 0)
            .map(|(block, _)| block)
            .collect();
        if open.len() < params.reps {
            return None;
        }

        let picked: BTreeSet<usize> = open.choose_multiple(rng, params.reps).copied().collect();
        for &block in &picked {
            remaining[block] -= 1;
        }
        per_item.push(picked);
    }

    Some(per_item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn default_params() -> ScheduleParams {
        ScheduleParams {
            n_blocks: 9,
            n_items: 6,
            reps: 3,
            choose: 2,
        }
    }

    #[test]
    fn params_default_shape_is_valid() {
        default_params().validate().unwrap();
    }

    #[test]
    fn params_reject_capacity_mismatch() {
        let params = ScheduleParams {
            reps: 4,
            ..default_params()
        };
        assert!(matches!(
            params.validate(),
            Err(ValidationError::ScheduleCapacityMismatch { .. })
        ));
    }

    #[test]
    fn params_reject_zero_and_oversized_values() {
        let mut p = default_params();
        p.n_blocks = 0;
        assert!(p.validate().is_err());

        let mut p = default_params();
        p.n_items = 0;
        assert!(p.validate().is_err());

        let mut p = default_params();
        p.reps = 10;
        assert!(p.validate().is_err());

        let mut p = default_params();
        p.choose = 7;
        assert!(p.validate().is_err());
    }

    #[test]
    fn schedule_meets_exact_capacity() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let schedule = generate_schedule(default_params(), &mut rng).unwrap();
            assert_eq!(schedule.per_item().len(), 6);
            assert!(schedule.per_item().iter().all(|s| s.len() == 3));
            assert_eq!(schedule.block_counts(), vec![2; 9]);
            assert!(schedule.attempts() >= 1);
        }
    }

    #[test]
    fn abandoned_draws_are_retried_to_an_exact_schedule() {
        let mut redrawn = 0;
        for seed in 0..200 {
            let schedule =
                generate_schedule(default_params(), &mut StdRng::seed_from_u64(seed)).unwrap();
            if schedule.attempts() > 1 {
                redrawn += 1;
                assert!(schedule.per_item().iter().all(|s| s.len() == 3));
                assert_eq!(schedule.block_counts(), vec![2; 9]);
            }
        }
        assert!(redrawn > 0, "every seed succeeded on its first draw");
    }

    #[test]
    fn from_per_item_accepts_drawn_schedule() {
        let drawn = generate_schedule(default_params(), &mut StdRng::seed_from_u64(3)).unwrap();
        let checked =
            DevaluationSchedule::from_per_item(default_params(), drawn.per_item().to_vec()).unwrap();
        assert_eq!(checked.per_item(), drawn.per_item());
        assert_eq!(checked.attempts(), 0);
    }

    #[test]
    fn from_per_item_rejects_wrong_shapes() {
        let params = ScheduleParams {
            n_blocks: 3,
            n_items: 2,
            reps: 3,
            choose: 2,
        };
        let full = BTreeSet::from([0, 1, 2]);
        DevaluationSchedule::from_per_item(params, vec![full.clone(), full.clone()]).unwrap();

        let shapes = [
            vec![full.clone()],
            vec![full.clone(), BTreeSet::from([0, 1])],
            vec![full.clone(), BTreeSet::from([0, 1, 3])],
        ];
        for per_item in shapes {
            assert!(matches!(
                DevaluationSchedule::from_per_item(params, per_item),
                Err(ValidationError::ScheduleShapeMismatch { .. })
            ));
        }

        // right per-item counts, uneven blocks
        let params = ScheduleParams {
            n_blocks: 4,
            n_items: 2,
            reps: 2,
            choose: 1,
        };
        let uneven = vec![BTreeSet::from([0, 1]), BTreeSet::from([1, 2])];
        assert!(matches!(
            DevaluationSchedule::from_per_item(params, uneven),
            Err(ValidationError::ScheduleShapeMismatch { .. })
        ));
    }

    #[test]
    fn schedule_items_at_matches_counts() {
        let mut rng = StdRng::seed_from_u64(11);
        let schedule = generate_schedule(default_params(), &mut rng).unwrap();
        for block in 0..9 {
            let items = schedule.items_at(block);
            assert_eq!(items.len(), 2);
            for item in items {
                assert!(schedule.per_item()[item].contains(&block));
            }
        }
    }

    #[test]
    fn schedule_is_reproducible_with_seed() {
        let a = generate_schedule(default_params(), &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generate_schedule(default_params(), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn schedule_with_full_capacity_uses_every_block() {
        // each item on every block
        let params = ScheduleParams {
            n_blocks: 4,
            n_items: 3,
            reps: 4,
            choose: 3,
        };
        let schedule = generate_schedule(params, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(schedule.per_item().iter().all(|s| s.len() == 4));
        assert_eq!(schedule.block_counts(), vec![3; 4]);
    }

    #[test]
    fn schedule_reports_validation_before_drawing() {
        let params = ScheduleParams {
            n_blocks: 9,
            n_items: 6,
            reps: 2,
            choose: 2,
        };
        let err = generate_schedule(params, &mut StdRng::seed_from_u64(0)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn schedule_zero_attempts_is_exhausted() {
        let err = generate_schedule_with_limit(default_params(), 0, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(err.is_generation());
        assert!(matches!(
            err,
            crate::FabError::Generation(GenerationError::ScheduleExhausted { attempts: 0, .. })
        ));
    }
}
