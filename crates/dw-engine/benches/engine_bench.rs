use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use dw_engine::{plan_step, seconds_per_step, Engine, EngineConfig, STEPS_PER_PHRASE};
use dw_ir::{ClockTime, TrackDescriptor};

fn busy_track() -> TrackDescriptor {
    TrackDescriptor {
        bpm: 80.0,
        chord_progression: vec![
            "Cmaj7".into(),
            "Am7".into(),
            "Fmaj7".into(),
            "G7".into(),
        ],
        melody_complexity: 1.0,
        ..TrackDescriptor::default()
    }
}

fn bench_plan_phrase(c: &mut Criterion) {
    let track = busy_track();
    c.bench_function("plan_128_steps", |b| {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut out = Vec::with_capacity(512);
        b.iter(|| {
            out.clear();
            for step in 0..STEPS_PER_PHRASE {
                let t = ClockTime::from_secs(step as f64 * seconds_per_step(track.bpm));
                plan_step(step, t, &track, &mut rng, &mut out);
            }
            black_box(out.len())
        });
    });
}

fn bench_render_second(c: &mut Criterion) {
    let track = busy_track();
    c.bench_function("render_1s_dense_phrase", |b| {
        b.iter(|| {
            let mut engine = Engine::new(EngineConfig {
                sample_rate: 44_100,
                seed: 1,
            });
            let mut rng = Pcg32::seed_from_u64(2);
            let mut events = Vec::new();
            for step in 0..STEPS_PER_PHRASE {
                let t = ClockTime::from_secs(step as f64 * seconds_per_step(track.bpm));
                plan_step(step, t, &track, &mut rng, &mut events);
            }
            for event in events.drain(..) {
                engine.schedule(event);
            }
            black_box(engine.render_frames(44_100).len())
        });
    });
}

criterion_group!(benches, bench_plan_phrase, bench_render_second);
criterion_main!(benches);
