mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use mint::Vector3;
use radfield3d::field::RadiationField;
use radfield3d::tracer::{GridTracerAlgorithm, GridTracerFactory, TracerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEGMENTS: usize = 1024;
const ALGORITHMS: [GridTracerAlgorithm; 2] =
    [GridTracerAlgorithm::Sampling, GridTracerAlgorithm::Bresenham];

fn unit(rng: &mut StdRng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

fn segments(seed: u64, lo: f32, hi: f32) -> Vec<(Vector3<f32>, Vector3<f32>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let point = |rng: &mut StdRng| {
        Vec3::new(unit(rng), unit(rng), unit(rng)) * (hi - lo) + Vec3::splat(lo)
    };
    (0..SEGMENTS)
        .map(|_| (point(&mut rng).into(), point(&mut rng).into()))
        .collect()
}

fn tracer_benches(c: &mut Criterion, name: &str, field: &RadiationField, lo: f32, hi: f32) {
    let segs = segments(0x7AC3_u64 ^ field.voxel_count() as u64, lo, hi);

    for &spv in &[1u32, 4] {
        let mut group = c.benchmark_group(format!("tracer/{name}/samples_{spv}"));
        group.throughput(common::elements_throughput(segs.len()));
        let config = TracerConfig::new().with_samples_per_voxel(spv);

        for &algorithm in &ALGORITHMS {
            let Ok(tracer) = GridTracerFactory::construct_with(field, algorithm, &config) else {
                continue;
            };
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{algorithm:?}")),
                &algorithm,
                |b, _| {
                    b.iter(|| {
                        let mut total = 0;
                        for (start, end) in &segs {
                            total += tracer.trace(*start, *end).len();
                        }
                        black_box(total);
                    });
                },
            );
        }

        group.finish();
    }
}

fn cartesian_benches(c: &mut Criterion) {
    for &voxel in &[0.1f32, 0.02] {
        let Ok(field) = RadiationField::cartesian(Vec3::splat(1.0), Vec3::splat(voxel)) else {
            continue;
        };
        tracer_benches(c, &format!("cartesian_{voxel}"), &field, -0.2, 1.2);
    }
}

fn polar_benches(c: &mut Criterion) {
    let bins = Vec3::new(0.05, std::f32::consts::PI / 18.0, std::f32::consts::PI / 18.0);
    let Ok(field) = RadiationField::polar(1.0, bins) else {
        return;
    };
    tracer_benches(c, "polar", &field, -1.2, 1.2);
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = cartesian_benches, polar_benches
}
criterion_main!(benches);
