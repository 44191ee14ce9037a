use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hepvec::prelude::*;

fn random_column(rng: &mut fastrand::Rng, len: usize) -> Column {
    (0..len).map(|_| rng.f64() * 100.0 - 50.0).collect()
}

fn random_counts(rng: &mut fastrand::Rng, rows: usize) -> Vec<usize> {
    (0..rows).map(|_| rng.usize(0..8)).collect()
}

fn jagged_column(rng: &mut fastrand::Rng, counts: &[usize], offset: f64) -> Nested<Column> {
    let total: usize = counts.iter().sum();
    Nested::from_counts(counts, random_column(rng, total).map(|v| v + offset)).unwrap()
}

fn jagged_vec4s(rng: &mut fastrand::Rng, counts: &[usize]) -> Nested<Vec4Array> {
    let x = jagged_column(rng, counts, 0.0);
    let y = jagged_column(rng, counts, 0.0);
    let z = jagged_column(rng, counts, 0.0);
    let t = jagged_column(rng, counts, 250.0);
    Vec4Array::from_cartesian(x, y, z, t).unwrap()
}

fn broadcast_benchmark(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(0);
    let mut group = c.benchmark_group("broadcast");
    for rows in [1_000, 100_000] {
        let counts = random_counts(&mut rng, rows);
        let particles = jagged_vec4s(&mut rng, &counts);
        let shuffled = random_counts(&mut rng, rows)
            .iter()
            .zip(&counts)
            .map(|(a, b)| (*a).min(*b))
            .collect::<Vec<_>>();
        let other = jagged_vec4s(&mut rng, &shuffled);
        let weights = random_column(&mut rng, rows);
        group.bench_with_input(BenchmarkId::new("same partition", rows), &rows, |b, _| {
            b.iter(|| black_box(particles.try_add(particles.clone()).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("realigned partition", rows), &rows, |b, _| {
            b.iter(|| black_box(particles.try_add(other.clone()).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("per-event scale", rows), &rows, |b, _| {
            b.iter(|| black_box(particles.try_mul(weights.clone()).unwrap()))
        });
    }
    group.finish();
}

fn kernel_benchmark(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(1);
    let counts = random_counts(&mut rng, 100_000);
    let particles = jagged_vec4s(&mut rng, &counts).flatten_all();
    let beta = Vec3::new(0.1, -0.2, 0.3);
    c.bench_function("mass", |b| {
        b.iter(|| {
            particles.clear_cache();
            black_box(particles.mass())
        })
    });
    c.bench_function("boost", |b| b.iter(|| black_box(particles.boost(&beta))));
    c.bench_function("sum", |b| b.iter(|| black_box(particles.sum())));
}

criterion_group!(benches, broadcast_benchmark, kernel_benchmark);
criterion_main!(benches);
