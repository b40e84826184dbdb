//! Benchmarks for the transformation: batch (per backend) vs fused loop
//!
//! # Benchmark Methodology
//!
//! - Input sizes: 1K, 100K and 1M elements drawn uniformly from [0, 1)
//! - Batch variant on Scalar, SSE2 and AVX2 backends
//! - Loop variant, allocating and into a reused buffer
//! - Parallel variant when built with `--features parallel`
//! - Throughput reported in elements/second
//!
//! # What to expect
//!
//! The batch variant writes roughly seven full-length temporaries per call,
//! so once the input stops fitting in cache it is bandwidth bound and SIMD
//! width barely matters. The fused loop touches each element once.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use loopfuse::{transform_batch, transform_loop, transform_loop_into, Backend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate uniform [0, 1) test data with a fixed seed
fn generate_test_data(size: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..size).map(|_| rng.gen::<f64>()).collect()
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for size in [1_000, 100_000, 1_000_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        let data = generate_test_data(*size);

        for backend in [Backend::Scalar, Backend::SSE2, Backend::AVX2] {
            if !loopfuse::is_backend_available(backend) {
                continue;
            }
            group.bench_with_input(
                BenchmarkId::new(format!("batch_{backend}"), size),
                &data,
                |bencher, data| {
                    bencher.iter(|| black_box(transform_batch(black_box(data), backend).unwrap()));
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("loop", size), &data, |bencher, data| {
            bencher.iter(|| black_box(transform_loop(black_box(data)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("loop_into", size), &data, |bencher, data| {
            let mut out = vec![0.0; data.len()];
            bencher.iter(|| {
                transform_loop_into(black_box(data), &mut out).unwrap();
                black_box(&out);
            });
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", size), &data, |bencher, data| {
            bencher.iter(|| black_box(loopfuse::transform_parallel(black_box(data)).unwrap()));
        });
    }

    group.finish();
}

/// Cost of the individual whole-array steps the batch variant is built from
fn bench_array_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_steps");
    let size = 100_000;
    group.throughput(Throughput::Elements(size as u64));

    let data = generate_test_data(size);
    let x = loopfuse::Array::from_slice(&data);

    group.bench_function("square", |bencher| bencher.iter(|| black_box(x.square())));
    group.bench_function("gt", |bencher| bencher.iter(|| black_box(x.gt(0.5))));
    group.bench_function("ln_1p", |bencher| bencher.iter(|| black_box(x.ln_1p())));
    group.bench_function("exp", |bencher| bencher.iter(|| black_box(x.exp())));

    group.finish();
}

criterion_group!(benches, bench_transform, bench_array_steps);
criterion_main!(benches);
