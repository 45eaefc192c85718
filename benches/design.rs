use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use fabfruit::{
    generate_schedule, Phase, Probe, Response, ScheduleParams, Session, TaskDesign, TaskSettings,
    Trial, TrialPlayer,
};

const FRUITS: [&str; 12] = [
    "apple", "bananas", "cherries", "coconut", "grape", "kiwi", "lemon", "melon", "orange", "pear",
    "pineapple", "strawberry",
];

struct Correct;

impl TrialPlayer for Correct {
    fn respond(&mut self, _trial: &Trial, probe: &Probe) -> Response {
        Response::pressed(probe.correct, 300.0)
    }
}

fn bench_schedule(c: &mut Criterion) {
    let params = ScheduleParams {
        n_blocks: 9,
        n_items: 6,
        reps: 3,
        choose: 2,
    };
    let mut seed = 0u64;
    c.bench_function("schedule/default", |b| {
        b.iter(|| {
            seed += 1;
            let mut rng = StdRng::seed_from_u64(seed);
            black_box(generate_schedule(params, &mut rng).unwrap())
        });
    });
}

fn bench_design(c: &mut Criterion) {
    let settings = TaskSettings::default();
    let mut seed = 0u64;
    c.bench_function("design/generate", |b| {
        b.iter(|| {
            seed += 1;
            black_box(TaskDesign::generate(&FRUITS, &settings, seed).unwrap())
        });
    });

    let design = TaskDesign::generate(&FRUITS, &settings, 42).unwrap();
    c.bench_function("session/play_all", |b| {
        b.iter_batched(
            || Session::new(design.registry()),
            |mut session| {
                for phase in Phase::ALL {
                    black_box(session.run(design.phase(phase), &mut Correct));
                }
                session.into_ledger()
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_schedule, bench_design);
criterion_main!(benches);
