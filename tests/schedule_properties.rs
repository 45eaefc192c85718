use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::SeedableRng;

use fabfruit::sequence::balance::direction_strikes;
use fabfruit::{
    assign_pairing, build_instructed_discrimination, generate_schedule, Direction, FabError,
    Phase, ScheduleParams, TaskSettings, Trial, ValidationError,
};

const FRUITS: [&str; 12] = [
    "apple", "bananas", "cherries", "coconut", "grape", "kiwi", "lemon", "melon", "orange", "pear",
    "pineapple", "strawberry",
];

#[test]
fn default_schedule_is_balanced_for_many_seeds() {
    let params = ScheduleParams {
        n_blocks: 9,
        n_items: 6,
        reps: 3,
        choose: 2,
    };
    for seed in 0..10 {
        let schedule = generate_schedule(params, &mut StdRng::seed_from_u64(seed)).unwrap();
        let per_item = schedule.per_item();

        assert_eq!(per_item.len(), 6);
        assert!(per_item.iter().all(|blocks| blocks.len() == 3));
        assert!(per_item.iter().flatten().all(|&b| b < 9));
        assert_eq!(per_item.iter().map(BTreeSet::len).sum::<usize>(), 18);
        assert_eq!(schedule.block_counts(), vec![2; 9]);
        for block in 0..9 {
            assert_eq!(schedule.items_at(block).len(), 2);
        }
    }
}

#[test]
fn schedule_capacity_mismatch_is_a_validation_error() {
    let params = ScheduleParams {
        n_blocks: 9,
        n_items: 5,
        reps: 3,
        choose: 2,
    };
    let err = generate_schedule(params, &mut StdRng::seed_from_u64(0)).unwrap_err();
    assert!(matches!(
        err,
        FabError::Validation(ValidationError::ScheduleCapacityMismatch { .. })
    ));
    assert!(!err.is_retryable());
}

#[test]
fn pairing_is_balanced_and_disjoint() {
    let devals = vec![BTreeSet::new(); 6];
    for seed in 0..20 {
        let registry = assign_pairing(&FRUITS, &devals, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(registry.len(), 6);

        let lefts = registry
            .iter()
            .filter(|b| b.direction() == Direction::Left)
            .count();
        assert_eq!(lefts, 3);

        let mut names: Vec<&str> = registry
            .iter()
            .flat_map(|b| [b.stimulus().name(), b.outcome().name()])
            .collect();
        names.sort_unstable();
        let mut expected = FRUITS.to_vec();
        expected.sort_unstable();
        assert_eq!(names, expected);

        let mut labels: Vec<&str> = registry.iter().map(|b| b.label()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["L0", "L1", "L2", "R0", "R1", "R2"]);
    }
}

#[test]
fn pairing_rejects_odd_box_counts() {
    let devals = vec![BTreeSet::new(); 3];
    let err = assign_pairing(&FRUITS[..6], &devals, &mut StdRng::seed_from_u64(0)).unwrap_err();
    assert!(matches!(err, ValidationError::UnbalancedBoxCount { boxes: 3 }));
}

#[test]
fn run_limit_bounds_same_side_streaks() {
    let devals = vec![BTreeSet::new(); 6];
    let registry = assign_pairing(&FRUITS, &devals, &mut StdRng::seed_from_u64(11)).unwrap();
    let mut settings = TaskSettings::default();
    settings.instructed.max_direction_strikes = Some(3);

    let trials = build_instructed_discrimination(
        &registry,
        settings.instructed.reps,
        settings.instructed.blocks,
        &settings,
        &mut StdRng::seed_from_u64(12),
    )
    .unwrap();

    for block in 0..settings.instructed.blocks {
        let dirs: Vec<Direction> = trials
            .iter()
            .filter(|t| t.phase == Phase::InstructedDiscrimination && t.block == block)
            .filter_map(Trial::probe)
            .map(|p| p.correct)
            .collect();
        assert_eq!(dirs.len(), 12);
        assert!(direction_strikes(&dirs) < 3);
    }
}
