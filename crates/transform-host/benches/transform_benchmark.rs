//! Criterion benchmarks for the host adapter.
//!
//! Run with: cargo bench --package transform-host

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use transform_host::{HostConfig, ResultEncoding, TransformEngine, TransformKind};

const IDENTITY_IN_PLACE: &str = include_str!("../tests/wasm/identity_in_place.wat");
const ALLOCATED_RESULT: &str = include_str!("../tests/wasm/allocated_result.wat");

fn source_of(len: usize) -> String {
    "int x = 0; ".repeat(len / 11 + 1)[..len].to_string()
}

/// Benchmark compilation against cache hits.
fn bench_module_load(c: &mut Criterion) {
    let wasm = wat::parse_str(IDENTITY_IN_PLACE).expect("Failed to parse WAT");

    c.bench_function("module_compilation", |b| {
        b.iter(|| {
            let engine = TransformEngine::new(HostConfig::default()).unwrap();
            black_box(engine.load(black_box(&wasm)).unwrap())
        });
    });

    let engine = TransformEngine::new(HostConfig::default()).unwrap();
    let _ = engine.load(&wasm).unwrap();
    c.bench_function("module_cache_hit", |b| {
        b.iter(|| black_box(engine.load(black_box(&wasm)).unwrap()));
    });
}

/// Benchmark instantiation including the heap reservation.
fn bench_instantiation(c: &mut Criterion) {
    let wasm = wat::parse_str(IDENTITY_IN_PLACE).expect("Failed to parse WAT");
    let engine = TransformEngine::new(HostConfig::default()).unwrap();
    let module = engine.load(&wasm).unwrap();

    c.bench_function("instantiate", |b| {
        b.iter(|| black_box(engine.instantiate(&module).unwrap()));
    });
}

/// Benchmark calls under both result encodings for growing sources.
fn bench_transform_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_call");

    for (label, wat, encoding) in [
        (
            "length_prefixed",
            IDENTITY_IN_PLACE,
            ResultEncoding::LengthPrefixed,
        ),
        ("nul_terminated", ALLOCATED_RESULT, ResultEncoding::NulTerminated),
    ] {
        let config = HostConfig::builder().encoding(encoding).build().unwrap();
        let engine = TransformEngine::new(config).unwrap();
        let module = engine.load(&wat::parse_str(wat).unwrap()).unwrap();
        let mut instance = engine.instantiate(&module).unwrap();

        for size in [16, 1_024, 64 * 1_024] {
            let source = source_of(size);
            group.throughput(Throughput::Bytes(u64::try_from(size).unwrap()));
            group.bench_with_input(BenchmarkId::new(label, size), &source, |b, source| {
                b.iter(|| {
                    black_box(
                        instance
                            .transform(black_box(source), TransformKind::Identity)
                            .unwrap(),
                    )
                });
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_module_load,
    bench_instantiation,
    bench_transform_calls
);
criterion_main!(benches);
