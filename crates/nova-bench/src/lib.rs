//! Benchmark profiles for the Nova level advance.
//!
//! - [`reference_level`]: 64x64 periodic level, Rusanov fluxes, no sources
//! - [`source_level`]: 32x32 level with gravity, sponge, and thermal relaxation
//! - [`reference_hierarchy`]: two-level 1-D hierarchy with a central fine patch

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use nova_core::{GridBox, StateSchema};
use nova_engine::{AdvanceConfig, AdvanceController, AdvanceServices, AmrHierarchy};
use nova_sources::{
    assemble_sources, GravityConfig, SourceServices, SourcesConfig, SpongeConfig, ThermoConfig,
};
use nova_test_utils::{
    periodic_geometry, perturbed_state, FlowSpec, IdealGasEos, RusanovSolver, UniformFieldSolver,
};

const GHOSTS: usize = 2;

fn services() -> AdvanceServices {
    AdvanceServices::new(Arc::new(RusanovSolver), Arc::new(IdealGasEos::new(1.4)))
}

/// A 2-D schema with two species.
pub fn reference_schema() -> Arc<StateSchema> {
    Arc::new(
        StateSchema::builder()
            .ndim(2)
            .species(["fuel", "ash"])
            .build()
            .expect("reference schema is valid"),
    )
}

/// Build a 64x64 periodic level with seeded perturbations and no sources.
pub fn reference_level(seed: u64, config: AdvanceConfig) -> AdvanceController {
    let schema = reference_schema();
    let geom = periodic_geometry(2, 64);
    let state = perturbed_state(&schema, &geom, GHOSTS, FlowSpec::default(), 0.1, seed);
    AdvanceController::new(schema, geom, state, 0.0, Vec::new(), services(), config)
        .expect("reference level is valid")
}

/// Build a 32x32 level with uniform gravity, a sponge, and thermal
/// relaxation.
pub fn source_level(seed: u64) -> AdvanceController {
    let schema = reference_schema();
    let geom = periodic_geometry(2, 32);
    let state = perturbed_state(&schema, &geom, GHOSTS, FlowSpec::default(), 0.1, seed);
    let eos = Arc::new(IdealGasEos::new(1.4));
    let sources = assemble_sources(
        &SourcesConfig {
            thermo: Some(ThermoConfig::default()),
            sponge: Some(SpongeConfig::default()),
            gravity: Some(GravityConfig::default()),
            ..SourcesConfig::default()
        },
        &SourceServices::new()
            .eos(eos)
            .poisson(Arc::new(UniformFieldSolver::new([0.0, -1.0, 0.0]))),
    )
    .expect("source profile is valid");
    AdvanceController::new(
        schema,
        geom,
        state,
        0.0,
        sources,
        services(),
        AdvanceConfig::default(),
    )
    .expect("source level is valid")
}

/// Build a 1-D hierarchy: 256 base cells with a refined patch over the
/// middle half.
pub fn reference_hierarchy(seed: u64) -> AmrHierarchy {
    let schema = Arc::new(
        StateSchema::builder()
            .ndim(1)
            .build()
            .expect("1-D schema is valid"),
    );
    let base = periodic_geometry(1, 256);
    let fine = base
        .refine(GridBox::new(1, [128, 0, 0], [383, 0, 0]), 2)
        .expect("fine patch is valid");
    let levels = [base, fine]
        .into_iter()
        .enumerate()
        .map(|(l, geom)| {
            let state =
                perturbed_state(&schema, &geom, GHOSTS, FlowSpec::default(), 0.1, seed + l as u64);
            AdvanceController::new(
                Arc::clone(&schema),
                geom,
                state,
                0.0,
                Vec::new(),
                services(),
                AdvanceConfig::default(),
            )
            .expect("hierarchy level is valid")
        })
        .collect();
    AmrHierarchy::new(levels, 2).expect("reference hierarchy is valid")
}
