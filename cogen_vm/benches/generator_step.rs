//! Generator Step Benchmarks
//!
//! Measures the cost of the suspend/resume round trip.
//!
//! # Benchmark Categories
//!
//! 1. **Step Throughput**: plain steps through a counting loop
//! 2. **Exchange**: steps that deliver a value and read it back
//! 3. **Lifecycle**: create, drain and drop, including pool turnover
//! 4. **Collection**: per-step collection on versus off

use cogen_core::Value;
use cogen_vm::bytecode::{Procedure, ProcedureBuilder};
use cogen_vm::{Engine, EngineConfig, Generator};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

// =============================================================================
// Generator Bodies
// =============================================================================

/// for i in 0..n { yield(i) }
fn count_to() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("count_to", 1);
    let n = b.param(0);
    let (i, one, cond, reply) = (
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
        b.alloc_register(),
    );
    let top = b.new_label();
    let done = b.new_label();
    b.emit_load_int(i, 0);
    b.emit_load_int(one, 1);
    b.bind_label(top);
    b.emit_lt(cond, i, n);
    b.emit_jump_if_false(cond, done);
    b.emit_yield(reply, Some(i));
    b.emit_add(i, i, one);
    b.emit_jump(top);
    b.bind_label(done);
    b.emit_return_none();
    b.finish().expect("count_to builds")
}

/// acc = arg; loop { reply = yield(acc); acc = acc + retrieve(reply) }
fn accumulate() -> Arc<Procedure> {
    let mut b = ProcedureBuilder::new("accumulate", 1);
    let acc = b.param(0);
    let (reply, v) = (b.alloc_register(), b.alloc_register());
    let top = b.new_label();
    b.bind_label(top);
    b.emit_yield(reply, Some(acc));
    b.emit_retrieve(v, reply);
    b.emit_add(acc, acc, v);
    b.emit_jump(top);
    b.finish().expect("accumulate builds")
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_step_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_throughput");
    let body = count_to();

    for &n in &[16_i64, 256, 4096] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let engine = Engine::new();
            b.iter(|| {
                let generator = Generator::new(&engine, Arc::clone(&body), n).expect("pool");
                let mut steps = 0_u64;
                while generator.step().expect("no fault") {
                    steps += 1;
                }
                black_box(steps)
            });
        });
    }

    group.finish();
}

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");
    group.throughput(Throughput::Elements(1));

    group.bench_function("step_with_int", |b| {
        let engine = Engine::new();
        let generator = Generator::new(&engine, accumulate(), 0_i64).expect("pool");
        generator.step().expect("no fault");
        b.iter(|| {
            generator.step_with(black_box(1_i64)).expect("no fault");
            black_box(generator.value().retrieve_int())
        });
    });

    group.finish();
}

fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifecycle");
    let body = count_to();

    group.bench_function("create_drop", |b| {
        let engine = Engine::new();
        b.iter(|| {
            let generator = Generator::new(&engine, Arc::clone(&body), Value::Int(1));
            black_box(generator.is_ok())
        });
    });

    group.bench_function("create_suspend_drop", |b| {
        let engine = Engine::new();
        b.iter(|| {
            let generator = Generator::new(&engine, Arc::clone(&body), 8_i64).expect("pool");
            black_box(generator.step().expect("no fault"))
        });
    });

    group.finish();
}

fn bench_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection");
    let body = count_to();

    for collect in [true, false] {
        let config = EngineConfig::default().with_collect_after_step(collect);
        group.bench_with_input(
            BenchmarkId::new("collect_after_step", collect),
            &config,
            |b, config| {
                let engine = Engine::with_config(config.clone());
                b.iter(|| {
                    let generator =
                        Generator::new(&engine, Arc::clone(&body), 256_i64).expect("pool");
                    while generator.step().expect("no fault") {}
                    black_box(engine.heap().statistics().live)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    generator_benches,
    bench_step_throughput,
    bench_exchange,
    bench_lifecycle,
    bench_collection,
);

criterion_main!(generator_benches);
