//! Criterion benchmarks for level and hierarchy advances.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use nova_bench::{reference_hierarchy, reference_level, source_level};
use nova_engine::{AdvanceConfig, ButcherTableau, IntegratorConfig, LevelLinks};
use nova_grid::PhysicalBoundaryFill;

fn bench_single_stage_64x64(c: &mut Criterion) {
    let mut level = reference_level(42, AdvanceConfig::default());
    let fill = PhysicalBoundaryFill::for_schema(level.schema());
    let dt = level.estimate_dt().unwrap().dt;

    c.bench_function("single_stage_64x64", |b| {
        b.iter(|| {
            let outcome = level.advance(dt, LevelLinks::single(&fill)).unwrap();
            black_box(&outcome);
        });
    });
}

fn bench_ssp_rk3_64x64(c: &mut Criterion) {
    let config = AdvanceConfig {
        integrator: IntegratorConfig::MethodOfLines(ButcherTableau::ssp_rk3()),
        ..AdvanceConfig::default()
    };
    let mut level = reference_level(42, config);
    let fill = PhysicalBoundaryFill::for_schema(level.schema());
    let dt = level.estimate_dt().unwrap().dt;

    c.bench_function("ssp_rk3_64x64", |b| {
        b.iter(|| {
            let outcome = level.advance(dt, LevelLinks::single(&fill)).unwrap();
            black_box(&outcome);
        });
    });
}

fn bench_sources_32x32(c: &mut Criterion) {
    let mut level = source_level(42);
    let fill = PhysicalBoundaryFill::for_schema(level.schema());
    let dt = level.estimate_dt().unwrap().dt;

    c.bench_function("sources_32x32", |b| {
        b.iter(|| {
            let outcome = level.advance(dt, LevelLinks::single(&fill)).unwrap();
            black_box(&outcome);
        });
    });
}

fn bench_two_level_hierarchy(c: &mut Criterion) {
    let mut h = reference_hierarchy(42);
    let dt = h.estimate_dt().unwrap();

    c.bench_function("two_level_hierarchy", |b| {
        b.iter(|| {
            let taken = h.advance(dt).unwrap();
            black_box(taken);
        });
    });
}

criterion_group!(
    benches,
    bench_single_stage_64x64,
    bench_ssp_rk3_64x64,
    bench_sources_32x32,
    bench_two_level_hierarchy
);
criterion_main!(benches);
