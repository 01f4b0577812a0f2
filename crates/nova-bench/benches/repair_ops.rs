//! Criterion benchmarks for state repair and primitive conversion.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use nova_bench::reference_schema;
use nova_core::PrimitiveLayout;
use nova_state::{cons_to_prim, RepairConfig, RepairPolicy};
use nova_test_utils::{periodic_geometry, perturbed_state, FlowSpec, IdealGasEos};

fn bench_clean_64x64(c: &mut Criterion) {
    let schema = reference_schema();
    let geom = periodic_geometry(2, 64);
    let mut state = perturbed_state(&schema, &geom, 2, FlowSpec::default(), 0.1, 7);
    let rho = schema.density();
    for (i, cell) in state.data_mut().chunks_mut(schema.ncomp()).enumerate() {
        if i % 97 == 0 {
            cell[rho] = -1e-3;
        }
    }
    let policy = RepairPolicy::new(schema.clone(), RepairConfig::default());

    c.bench_function("repair_clean_64x64", |b| {
        b.iter(|| {
            let mut s = state.clone();
            let report = policy.clean(&mut s, 2);
            black_box(report);
        });
    });
}

fn bench_cons_to_prim_64x64(c: &mut Criterion) {
    let schema = reference_schema();
    let layout = PrimitiveLayout::from_schema(&schema);
    let geom = periodic_geometry(2, 64);
    let state = perturbed_state(&schema, &geom, 2, FlowSpec::default(), 0.1, 7);
    let eos = IdealGasEos::new(1.4);

    c.bench_function("cons_to_prim_64x64", |b| {
        b.iter(|| {
            let q = cons_to_prim(&schema, &layout, &state, &eos, 2).unwrap();
            black_box(&q);
        });
    });
}

criterion_group!(benches, bench_clean_64x64, bench_cons_to_prim_64x64);
criterion_main!(benches);
