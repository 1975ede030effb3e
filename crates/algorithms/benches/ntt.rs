//! Benchmarks for the negacyclic NTT
//!
//! This benchmark suite measures:
//! - Forward and inverse transforms at the full degree for every preset prime
//! - Padded forward transforms used by rank-minimizing packing
//! - Sparse inverse transforms
//! - Mini transforms at small degrees

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use evi_algorithms::ntt::Ntt;
use evi_params::{DEGREE, IP0, IP1, QF0};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn random_poly(rng: &mut ChaCha20Rng, len: usize, p: u64) -> Vec<u64> {
    (0..len).map(|_| rng.gen_range(0..p)).collect()
}

fn primes() -> Vec<(&'static str, u64)> {
    vec![
        ("ip0_q", IP0.prime_q),
        ("ip0_p", IP0.prime_p),
        ("ip1_q", IP1.prime_q),
        ("qf0_q", QF0.prime_q),
    ]
}

/// Forward transform at DEGREE
fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_forward");
    let mut rng = ChaCha20Rng::seed_from_u64(42);

    for (label, p) in primes() {
        let ntt = Ntt::new(DEGREE, p).expect("NTT construction failed");
        let poly = random_poly(&mut rng, DEGREE, p);
        group.bench_with_input(BenchmarkId::from_parameter(label), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.forward(&mut op).expect("forward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Inverse transform at DEGREE
fn bench_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_backward");
    let mut rng = ChaCha20Rng::seed_from_u64(42);

    for (label, p) in primes() {
        let ntt = Ntt::new(DEGREE, p).expect("NTT construction failed");
        let mut poly = random_poly(&mut rng, DEGREE, p);
        ntt.forward(&mut poly).expect("forward failed");
        group.bench_with_input(BenchmarkId::from_parameter(label), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.backward(&mut op).expect("backward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Padded forward against the zero-padded full transform
fn bench_padded(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_forward_padded");
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let ntt = Ntt::new(DEGREE, QF0.prime_q).expect("NTT construction failed");

    for pad in [32usize, 256, 1024] {
        let mut poly = vec![0u64; DEGREE];
        poly[..pad].copy_from_slice(&random_poly(&mut rng, pad, QF0.prime_q));
        group.bench_with_input(BenchmarkId::new("padded", pad), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.forward_padded(&mut op, pad).expect("padded forward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("full", pad), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.forward(&mut op).expect("forward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Sparse inverse for a few group sizes
fn bench_sparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_backward_sparse");
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    let ntt = Ntt::new(DEGREE, QF0.prime_q).expect("NTT construction failed");
    let poly = random_poly(&mut rng, DEGREE, QF0.prime_q);

    for fullmod in [32usize, 256, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(fullmod), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.backward_sparse(&mut op, fullmod).expect("sparse backward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

/// Round trip of the mini transform
fn bench_mini_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_mini_roundtrip");
    let mut rng = ChaCha20Rng::seed_from_u64(11);

    for mini in [16usize, 128] {
        let ntt = Ntt::new_mini(DEGREE, QF0.prime_q, mini).expect("NTT construction failed");
        let poly = random_poly(&mut rng, mini, QF0.prime_q);
        group.bench_with_input(BenchmarkId::from_parameter(mini), &poly, |b, poly| {
            b.iter_batched(
                || poly.clone(),
                |mut op| {
                    ntt.forward(&mut op).expect("forward failed");
                    ntt.backward(&mut op).expect("backward failed");
                    black_box(op)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_forward,
    bench_backward,
    bench_padded,
    bench_sparse,
    bench_mini_roundtrip
);
criterion_main!(benches);
