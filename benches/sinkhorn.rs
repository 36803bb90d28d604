use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array3;
use perm_ml::layers::{anneal, sinkhorn};
use perm_ml::{AnnealingConfig, BatchMatrix, SinkhornConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_batch(batch: usize, n: usize) -> BatchMatrix {
    let mut rng = StdRng::seed_from_u64(0);
    let data = Array3::from_shape_fn((batch, n, n), |_| rng.gen_range(-5.0..5.0));
    BatchMatrix::new(data).unwrap()
}

fn bench_sinkhorn(c: &mut Criterion) {
    let x = random_batch(32, 20);
    let cfg = SinkhornConfig::new(0.05, 5).unwrap();

    c.bench_function("sinkhorn_32x20x20", |b| {
        b.iter(|| sinkhorn(x.clone(), &cfg))
    });
}

fn bench_anneal(c: &mut Criterion) {
    let x = random_batch(32, 20);
    let cfg = AnnealingConfig::new(1.0, 0.75, 4, 5).unwrap();

    c.bench_function("anneal_4_rounds_32x20x20", |b| {
        b.iter(|| anneal(x.clone(), &cfg))
    });
}

criterion_group!(benches, bench_sinkhorn, bench_anneal);
criterion_main!(benches);
