use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use pingtrip_core::{BaselineState, DetectionCfg, DetectionStateMachine, DriftCfg, DriftCorrector};

// Synthetic range trace: flat surface with periodic passes and small noise.
fn synth_trace(n: usize, surface: i32, object: i32, seed: u32) -> Vec<i32> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x % 7) as i32 - 3
    };
    (0..n)
        .map(|i| {
            let base = if i % 50 >= 45 { object } else { surface };
            (base + next()).max(0)
        })
        .collect()
}

pub fn bench_detection(c: &mut Criterion) {
    let mut g = c.benchmark_group("detection");
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p pingtrip_core --bench detection
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let trace = synth_trace(50_000, 200, 110, 0xC0FFEE);

    for &successive in &[0u32, 2, 5] {
        let cfg = DetectionCfg {
            successive_threshold: successive,
            ..DetectionCfg::default()
        };
        g.bench_function(format!("ticks_successive_{successive}"), |b| {
            b.iter_batched(
                || DetectionStateMachine::new(cfg, 200),
                |mut sm| {
                    let baseline = BaselineState::established(200);
                    for &r in black_box(&trace) {
                        black_box(sm.tick(&baseline, r));
                    }
                    black_box(sm.cumulative_count());
                },
                BatchSize::SmallInput,
            )
        });
    }

    g.bench_function("ticks_with_drift_every_20", |b| {
        b.iter_batched(
            || {
                (
                    DetectionStateMachine::new(DetectionCfg::default(), 200),
                    DriftCorrector::new(DriftCfg::default()),
                    BaselineState::established(200),
                )
            },
            |(mut sm, mut drift, mut baseline)| {
                for (i, &r) in black_box(&trace).iter().enumerate() {
                    sm.tick(&baseline, r);
                    if i % 20 == 19 {
                        black_box(drift.check(&mut baseline, &mut sm));
                    }
                }
                black_box(baseline.distance());
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(detection, bench_detection);
criterion_main!(detection);
