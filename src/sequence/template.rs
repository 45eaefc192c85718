//! The cue / response / checkpoint layout shared by every phase.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::PhaseSettings;
use crate::direction::Role;
use crate::error::FabError;
use crate::pairing::BoxRegistry;
use crate::sequence::{CueItem, Phase, Probe, Timing, Trial, TrialKind};

/// Responses summarized by each instructed-discrimination checkpoint.
pub const CHECKPOINT_GROUP_SIZE: usize = 12;

/// Where checkpoint trials go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointPolicy {
    /// After every `n` responses, counted across blocks, plus one for any remainder.
    EveryN(usize),
    /// After every block.
    PerBlock,
    /// Once, after the last block.
    PhaseEnd,
}

/// Response probes for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeBlock {
    /// Test block whose devaluation state the cue grid shows.
    pub devaluation_block: Option<usize>,
    /// Probes in presentation order.
    pub probes: Vec<Probe>,
}

/// Variant descriptor for a phase layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTemplate {
    /// Phase tag for every trial.
    pub phase: Phase,
    /// Side of every box drawn on the per-block cue grid, if any.
    pub cue: Option<Role>,
    /// Follow each response with a feedback trial.
    pub feedback: bool,
    /// Where checkpoint trials go.
    pub checkpoint: CheckpointPolicy,
    /// Most points one valued response can earn.
    pub points_per_trial: u32,
}

/// Running count of responses since the last checkpoint.
#[derive(Debug, Default)]
struct Interval {
    responses: usize,
    valued: u32,
}

impl PhaseTemplate {
    /// Lay out blocks of probes as trials with timing.
    ///
    /// # Errors
    ///
    /// Returns `FabError::Internal` if a probe refers to a box that is not in
    /// `registry`.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        registry: &BoxRegistry,
        blocks: Vec<ProbeBlock>,
        settings: &PhaseSettings,
        first_onset: f64,
        rng: &mut R,
    ) -> Result<Vec<Trial>, FabError> {
        let mut trials = Vec::new();
        let mut interval = Interval::default();
        let mut clock = first_onset;
        let mut last = (0, None);

        for (block, probe_block) in blocks.into_iter().enumerate() {
            if block > 0 && !settings.combine {
                clock = first_onset;
            }
            let deval = probe_block.devaluation_block;
            last = (block, deval);

            if let Some(role) = self.cue {
                let items = registry
                    .iter()
                    .map(|bx| CueItem {
                        box_id: bx.id(),
                        label: bx.label().to_string(),
                        name: bx.item(role).name().to_string(),
                        devalued: deval.is_some_and(|b| bx.is_devalued_at(b)),
                    })
                    .collect();
                trials.push(Trial {
                    phase: self.phase,
                    block,
                    trial: None,
                    devaluation_block: deval,
                    kind: TrialKind::Cue { role, items },
                    timing: Timing::new(clock, settings.cue_duration),
                });
                clock += settings.cue_duration;
            }

            let itis = block_itis(&settings.itis, probe_block.probes.len(), rng);
            for (idx, (probe, iti)) in probe_block.probes.into_iter().zip(itis).enumerate() {
                let box_id = probe.box_id;
                let valued = !probe.devalued;

                trials.push(Trial {
                    phase: self.phase,
                    block,
                    trial: Some(idx),
                    devaluation_block: deval,
                    kind: TrialKind::Response(probe),
                    timing: Timing {
                        onset: clock,
                        duration: settings.response_duration,
                        iti,
                    },
                });
                clock += settings.response_duration;

                if self.feedback {
                    let outcome = registry
                        .get(box_id)
                        .ok_or_else(|| FabError::internal(format!("probe box {box_id} not registered")))?
                        .outcome()
                        .name()
                        .to_string();
                    trials.push(Trial {
                        phase: self.phase,
                        block,
                        trial: Some(idx),
                        devaluation_block: deval,
                        kind: TrialKind::Feedback { box_id, outcome },
                        timing: Timing::new(clock, settings.feedback_duration),
                    });
                    clock += settings.feedback_duration;
                }
                clock += iti;

                interval.responses += 1;
                if valued {
                    interval.valued += 1;
                }
                if self.checkpoint == CheckpointPolicy::EveryN(interval.responses) {
                    clock = self.push_checkpoint(&mut trials, &mut interval, block, deval, clock, settings);
                }
            }

            if self.checkpoint == CheckpointPolicy::PerBlock {
                clock = self.push_checkpoint(&mut trials, &mut interval, block, deval, clock, settings);
            }
        }

        let trailing = match self.checkpoint {
            CheckpointPolicy::EveryN(_) => interval.responses > 0,
            CheckpointPolicy::PhaseEnd => true,
            CheckpointPolicy::PerBlock => false,
        };
        if trailing {
            let (block, deval) = last;
            self.push_checkpoint(&mut trials, &mut interval, block, deval, clock, settings);
        }

        Ok(trials)
    }

    fn push_checkpoint(
        &self,
        trials: &mut Vec<Trial>,
        interval: &mut Interval,
        block: usize,
        devaluation_block: Option<usize>,
        clock: f64,
        settings: &PhaseSettings,
    ) -> f64 {
        trials.push(Trial {
            phase: self.phase,
            block,
            trial: None,
            devaluation_block,
            kind: TrialKind::Checkpoint {
                max: interval.valued * self.points_per_trial,
            },
            timing: Timing::new(clock, settings.checkpoint_duration),
        });
        *interval = Interval::default();
        clock + settings.checkpoint_duration
    }
}

/// ITIs for one block: the configured list cycled to length `n`, shuffled.
fn block_itis<R: Rng + ?Sized>(itis: &[f64], n: usize, rng: &mut R) -> Vec<f64> {
    if itis.is_empty() {
        return vec![0.0; n];
    }
    let mut out: Vec<f64> = itis.iter().copied().cycle().take(n).collect();
    out.shuffle(rng);
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::direction::Direction;
    use crate::pairing::TaskBox;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry() -> BoxRegistry {
        BoxRegistry::from_boxes(vec![
            TaskBox::new("L0", "apple", "kiwi", Direction::Left, BTreeSet::from([0])),
            TaskBox::new("R0", "pear", "grape", Direction::Right, BTreeSet::from([1])),
        ])
        .unwrap()
    }

    fn probes(registry: &BoxRegistry, deval: Option<usize>, n: usize) -> Vec<Probe> {
        registry
            .iter()
            .cycle()
            .take(n)
            .map(|bx| Probe {
                box_id: bx.id(),
                label: bx.label().to_string(),
                shown: bx.stimulus().name().to_string(),
                role: Role::Stimulus,
                correct: bx.direction(),
                devalued: deval.is_some_and(|b| bx.is_devalued_at(b)),
                distractor: None,
            })
            .collect()
    }

    fn settings() -> PhaseSettings {
        PhaseSettings {
            blocks: 2,
            reps: 1,
            response_duration: 1.0,
            itis: vec![0.5],
            feedback_duration: 1.0,
            checkpoint_duration: 2.0,
            cue_duration: 5.0,
            combine: false,
            max_direction_strikes: None,
        }
    }

    #[test]
    fn every_n_counts_across_blocks_and_flushes_remainder() {
        let reg = registry();
        let template = PhaseTemplate {
            phase: Phase::InstructedDiscrimination,
            cue: None,
            feedback: false,
            checkpoint: CheckpointPolicy::EveryN(4),
            points_per_trial: 1,
        };
        let blocks = vec![
            ProbeBlock { devaluation_block: None, probes: probes(&reg, None, 3) },
            ProbeBlock { devaluation_block: None, probes: probes(&reg, None, 3) },
        ];
        let trials = template
            .assemble(&reg, blocks, &settings(), 3.0, &mut StdRng::seed_from_u64(0))
            .unwrap();

        let maxes: Vec<u32> = trials
            .iter()
            .filter_map(|t| match t.kind {
                TrialKind::Checkpoint { max } => Some(max),
                _ => None,
            })
            .collect();
        assert_eq!(maxes, vec![4, 2]);
        assert!(trials.last().unwrap().is_checkpoint());
    }

    #[test]
    fn per_block_cue_marks_devalued_items() {
        let reg = registry();
        let template = PhaseTemplate {
            phase: Phase::SlipsOfAction,
            cue: Some(Role::Outcome),
            feedback: false,
            checkpoint: CheckpointPolicy::PerBlock,
            points_per_trial: 1,
        };
        let blocks = vec![
            ProbeBlock { devaluation_block: Some(0), probes: probes(&reg, Some(0), 4) },
            ProbeBlock { devaluation_block: Some(1), probes: probes(&reg, Some(1), 4) },
        ];
        let trials = template
            .assemble(&reg, blocks, &settings(), 3.0, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(trials.len(), 2 * (1 + 4 + 1));

        let TrialKind::Cue { role, items } = &trials[0].kind else {
            panic!("expected cue first");
        };
        assert_eq!(*role, Role::Outcome);
        assert_eq!(items[0].name, "kiwi");
        assert!(items[0].devalued);
        assert!(!items[1].devalued);

        // two of four probes in each block are devalued
        assert_eq!(trials[5].kind, TrialKind::Checkpoint { max: 2 });
    }

    #[test]
    fn feedback_follows_each_response_and_clock_advances() {
        let reg = registry();
        let template = PhaseTemplate {
            phase: Phase::InstructedDiscrimination,
            cue: None,
            feedback: true,
            checkpoint: CheckpointPolicy::PhaseEnd,
            points_per_trial: 1,
        };
        let blocks = vec![ProbeBlock { devaluation_block: None, probes: probes(&reg, None, 2) }];
        let trials = template
            .assemble(&reg, blocks, &settings(), 3.0, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(trials.len(), 5);

        let onsets: Vec<f64> = trials.iter().map(|t| t.timing.onset).collect();
        // response 1s, feedback 1s, iti 0.5s
        assert_eq!(onsets, vec![3.0, 4.0, 5.5, 6.5, 8.0]);
        assert!(matches!(trials[1].kind, TrialKind::Feedback { ref outcome, .. } if outcome == "kiwi"));
        assert_eq!(trials[4].kind, TrialKind::Checkpoint { max: 2 });
    }

    #[test]
    fn block_clock_restarts_unless_combined() {
        let reg = registry();
        let template = PhaseTemplate {
            phase: Phase::DevaluationDiscrimination,
            cue: Some(Role::Stimulus),
            feedback: false,
            checkpoint: CheckpointPolicy::PerBlock,
            points_per_trial: 1,
        };
        let blocks = || {
            vec![
                ProbeBlock { devaluation_block: Some(0), probes: probes(&reg, Some(0), 2) },
                ProbeBlock { devaluation_block: Some(1), probes: probes(&reg, Some(1), 2) },
            ]
        };

        let split = template
            .assemble(&reg, blocks(), &settings(), 3.0, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let second_cue = split.iter().filter(|t| t.block == 1).map(|t| t.timing.onset).next();
        assert_eq!(second_cue, Some(3.0));

        let mut combined_settings = settings();
        combined_settings.combine = true;
        let combined = template
            .assemble(&reg, blocks(), &combined_settings, 3.0, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let second_cue = combined.iter().filter(|t| t.block == 1).map(|t| t.timing.onset).next();
        // cue 5 + 2 x (1 + 0.5) + checkpoint 2
        assert_eq!(second_cue, Some(3.0 + 5.0 + 3.0 + 2.0));
    }

    #[test]
    fn block_itis_cycle_to_length() {
        let itis = block_itis(&[1.0, 2.0], 5, &mut StdRng::seed_from_u64(3));
        assert_eq!(itis.len(), 5);
        let total: f64 = itis.iter().sum();
        assert!((total - 7.0).abs() < 1e-9);
        assert_eq!(block_itis(&[], 3, &mut StdRng::seed_from_u64(3)), vec![0.0; 3]);
    }
}
