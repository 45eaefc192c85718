//! Phase builders.
//!
//! Each builder decides which probes appear in which block and hands them to
//! a [`PhaseTemplate`] describing the phase's cue, feedback and checkpoint
//! layout.

use std::iter;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::TaskSettings;
use crate::direction::{Direction, Role};
use crate::error::{FabError, FabResult, ValidationError};
use crate::pairing::{BoxRegistry, Item, TaskBox};
use crate::sequence::balance::shuffle_limited;
use crate::sequence::template::{CheckpointPolicy, PhaseTemplate, ProbeBlock, CHECKPOINT_GROUP_SIZE};
use crate::sequence::{Distractor, Phase, Probe, Trial};

fn require_positive(phase: Phase, field: &str, value: usize) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidPhaseSettings {
            phase,
            reason: format!("{field} must be > 0"),
        });
    }
    Ok(())
}

fn require_boxes(phase: Phase, registry: &BoxRegistry) -> Result<(), ValidationError> {
    if registry.is_empty() {
        return Err(ValidationError::InvalidPhaseSettings {
            phase,
            reason: "no boxes to show".to_string(),
        });
    }
    Ok(())
}

fn single_probe(bx: &TaskBox, role: Role, devalued: bool) -> Probe {
    Probe {
        box_id: bx.id(),
        label: bx.label().to_string(),
        shown: bx.item(role).name().to_string(),
        role,
        correct: bx.direction(),
        devalued,
        distractor: None,
    }
}

/// Every box repeated `reps` times, shuffled under the phase's run limit.
fn block_order<'a, R: Rng + ?Sized>(
    registry: &'a BoxRegistry,
    reps: usize,
    phase: Phase,
    max_strikes: Option<usize>,
    rng: &mut R,
) -> Result<Vec<&'a TaskBox>, FabError> {
    let mut order: Vec<&TaskBox> = registry
        .iter()
        .flat_map(|bx| iter::repeat(bx).take(reps))
        .collect();
    shuffle_limited(&mut order, max_strikes, phase, rng, |bx| bx.direction())?;
    Ok(order)
}

/// Instructed discrimination: learn which side opens each box.
///
/// Each of `block_count` blocks is an independent shuffle of every box
/// repeated `reps_per_item` times. Every response is followed by feedback,
/// and a checkpoint follows every [`CHECKPOINT_GROUP_SIZE`] responses, with
/// a final one for any remainder. Nothing is devalued.
///
/// # Errors
///
/// Returns a validation error for zero counts or an empty registry, and
/// `GenerationError::OrderExhausted` if a run limit is configured and
/// cannot be met.
pub fn build_instructed_discrimination<R: Rng + ?Sized>(
    registry: &BoxRegistry,
    reps_per_item: usize,
    block_count: usize,
    settings: &TaskSettings,
    rng: &mut R,
) -> FabResult<Vec<Trial>> {
    let phase = Phase::InstructedDiscrimination;
    require_boxes(phase, registry)?;
    require_positive(phase, "reps_per_item", reps_per_item)?;
    require_positive(phase, "block_count", block_count)?;
    let phase_settings = settings.phase(phase);

    let mut blocks = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        let order = block_order(
            registry,
            reps_per_item,
            phase,
            phase_settings.max_direction_strikes,
            rng,
        )?;
        blocks.push(ProbeBlock {
            devaluation_block: None,
            probes: order
                .into_iter()
                .map(|bx| single_probe(bx, Role::Stimulus, false))
                .collect(),
        });
    }

    let template = PhaseTemplate {
        phase,
        cue: None,
        feedback: true,
        checkpoint: CheckpointPolicy::EveryN(CHECKPOINT_GROUP_SIZE),
        points_per_trial: 1,
    };
    template.assemble(registry, blocks, phase_settings, settings.first_onset, rng)
}

/// Outcome devaluation: choose the valued outcome of a left/right pair.
///
/// Outcomes are split by side and every left x right pair is shown once per
/// repeat, each repeat in its own random order. One item of each pair is
/// drawn as devalued; the response is scored against the other. No
/// feedback; a single checkpoint closes the phase.
///
/// # Errors
///
/// Returns `ValidationError::EmptyOutcomeGroup` if either side has no
/// outcomes and a validation error if `n_repeats` is zero.
pub fn build_outcome_devaluation<R: Rng + ?Sized>(
    registry: &BoxRegistry,
    n_repeats: usize,
    settings: &TaskSettings,
    rng: &mut R,
) -> FabResult<Vec<Trial>> {
    let phase = Phase::OutcomeDevaluation;
    require_positive(phase, "n_repeats", n_repeats)?;

    let side = |dir: Direction| -> Result<Vec<&Item>, ValidationError> {
        let items: Vec<&Item> = registry
            .items(Role::Outcome)
            .filter(|item| item.direction() == dir)
            .collect();
        if items.is_empty() {
            return Err(ValidationError::EmptyOutcomeGroup {
                side: dir.to_string(),
            });
        }
        Ok(items)
    };
    let lefts = side(Direction::Left)?;
    let rights = side(Direction::Right)?;

    let label_of = |item: &Item| -> FabResult<String> {
        registry
            .box_of(item)
            .map(|bx| bx.label().to_string())
            .ok_or_else(|| FabError::internal(format!("outcome {} has no box", item.name())))
    };

    let mut probes = Vec::with_capacity(lefts.len() * rights.len() * n_repeats);
    for _ in 0..n_repeats {
        let mut pairs: Vec<(&Item, &Item)> = lefts
            .iter()
            .flat_map(|&l| rights.iter().map(move |&r| (l, r)))
            .collect();
        pairs.shuffle(rng);

        for (left, right) in pairs {
            let (valued, devalued) = if rng.gen::<bool>() {
                (right, left)
            } else {
                (left, right)
            };
            let valued_on_top: bool = rng.gen();
            probes.push(Probe {
                box_id: valued.box_id(),
                label: label_of(valued)?,
                shown: valued.name().to_string(),
                role: Role::Outcome,
                correct: valued.direction(),
                devalued: false,
                distractor: Some(Distractor {
                    box_id: devalued.box_id(),
                    label: label_of(devalued)?,
                    name: devalued.name().to_string(),
                    on_top: !valued_on_top,
                }),
            });
        }
    }

    let template = PhaseTemplate {
        phase,
        cue: None,
        feedback: false,
        checkpoint: CheckpointPolicy::PhaseEnd,
        points_per_trial: 1,
    };
    let blocks = vec![ProbeBlock {
        devaluation_block: None,
        probes,
    }];
    template.assemble(registry, blocks, settings.phase(phase), settings.first_onset, rng)
}

/// Slips of action (`role == Outcome`) or devaluation discrimination
/// (`role == Stimulus`).
///
/// Each block opens with a cue grid of every box's `role` item, marking the
/// ones devalued on that block. It is followed by `reps_per_block`
/// repetitions of every box in random order as go/no-go trials showing the
/// other side of the box, and closed by a checkpoint whose maximum is the
/// number of still-valued responses in the block.
///
/// # Errors
///
/// Returns a validation error for zero counts or an empty registry, and
/// `GenerationError::OrderExhausted` if a run limit cannot be met.
pub fn build_slips_block<R: Rng + ?Sized>(
    registry: &BoxRegistry,
    role: Role,
    n_blocks: usize,
    reps_per_block: usize,
    settings: &TaskSettings,
    rng: &mut R,
) -> FabResult<Vec<Trial>> {
    let phase = match role {
        Role::Outcome => Phase::SlipsOfAction,
        Role::Stimulus => Phase::DevaluationDiscrimination,
    };
    require_boxes(phase, registry)?;
    require_positive(phase, "n_blocks", n_blocks)?;
    require_positive(phase, "reps_per_block", reps_per_block)?;
    let phase_settings = settings.phase(phase);
    let shown = role.other();

    let mut blocks = Vec::with_capacity(n_blocks);
    for block in 0..n_blocks {
        let order = block_order(
            registry,
            reps_per_block,
            phase,
            phase_settings.max_direction_strikes,
            rng,
        )?;
        blocks.push(ProbeBlock {
            devaluation_block: Some(block),
            probes: order
                .into_iter()
                .map(|bx| single_probe(bx, shown, bx.is_devalued_at(block)))
                .collect(),
        });
    }

    let template = PhaseTemplate {
        phase,
        cue: Some(role),
        feedback: false,
        checkpoint: CheckpointPolicy::PerBlock,
        points_per_trial: 1,
    };
    template.assemble(registry, blocks, phase_settings, settings.first_onset, rng)
}
