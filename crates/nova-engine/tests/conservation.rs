//! Integration test: composite conservation of mass, momentum, and total
//! energy across single levels and subcycled hierarchies with reflux.

use std::sync::Arc;

use nova_core::{
    Direction, FaceFluxes, GridBox, HydroError, HydroOutcome, HydroRequest, HyperbolicSolver,
    LevelGeometry, StateSchema,
};
use nova_engine::config::{AdvanceConfig, ButcherTableau, IntegratorConfig};
use nova_engine::{AdvanceController, AdvanceServices, AmrHierarchy};
use nova_test_utils::{periodic_geometry, perturbed_state, FlowSpec, IdealGasEos, RusanovSolver};

const GHOSTS: usize = 2;
const RATIO: i64 = 2;

fn services(hydro: Arc<dyn HyperbolicSolver>) -> AdvanceServices {
    AdvanceServices::new(hydro, Arc::new(IdealGasEos::new(1.4)))
}

/// Rusanov fluxes reported with a wave speed `factor` times the true one,
/// so every attempt at the estimated step overshoots the CFL limit.
struct Exaggerated {
    factor: f64,
}

impl HyperbolicSolver for Exaggerated {
    fn name(&self) -> &str {
        "exaggerated"
    }

    fn compute_fluxes(
        &self,
        req: &HydroRequest<'_>,
        fluxes: &mut FaceFluxes,
    ) -> Result<HydroOutcome, HydroError> {
        let outcome = RusanovSolver.compute_fluxes(req, fluxes)?;
        Ok(HydroOutcome {
            max_wave_speed: outcome.max_wave_speed.map(|s| s * self.factor),
        })
    }
}

fn flow() -> FlowSpec {
    FlowSpec {
        velocity: [0.3, -0.2, 0.0],
        ..FlowSpec::default()
    }
}

fn level(
    schema: &Arc<StateSchema>,
    geom: LevelGeometry,
    seed: u64,
    config: &AdvanceConfig,
    hydro: Arc<dyn HyperbolicSolver>,
) -> AdvanceController {
    let state = perturbed_state(schema, &geom, GHOSTS, flow(), 0.1, seed);
    AdvanceController::new(
        Arc::clone(schema),
        geom,
        state,
        0.0,
        Vec::new(),
        services(hydro),
        config.clone(),
    )
    .unwrap()
}

/// Base level of `n` cells per direction plus one level per box in
/// `patches`, each given in the indices of its own level.
fn hierarchy(ndim: usize, n: i64, patches: &[GridBox], config: AdvanceConfig) -> AmrHierarchy {
    hierarchy_with(ndim, n, patches, config, |_| Arc::new(RusanovSolver))
}

/// As [`hierarchy`] with the hydro solver of each level chosen by `hydro`.
fn hierarchy_with(
    ndim: usize,
    n: i64,
    patches: &[GridBox],
    config: AdvanceConfig,
    hydro: impl Fn(usize) -> Arc<dyn HyperbolicSolver>,
) -> AmrHierarchy {
    let schema = Arc::new(StateSchema::builder().ndim(ndim).build().unwrap());
    let mut geoms = vec![periodic_geometry(ndim, n)];
    for patch in patches {
        let parent = geoms.last().unwrap();
        geoms.push(parent.refine(*patch, RATIO).unwrap());
    }
    let levels = geoms
        .into_iter()
        .enumerate()
        .map(|(l, g)| level(&schema, g, 11 + l as u64, &config, hydro(l)))
        .collect();
    AmrHierarchy::new(levels, RATIO).unwrap()
}

fn totals(h: &AmrHierarchy) -> Vec<f64> {
    let schema = h.levels()[0].schema().clone();
    let mut comps = vec![schema.density(), schema.eden()];
    comps.extend(Direction::active(schema.ndim()).map(|d| schema.momentum(d)));
    comps.into_iter().map(|c| h.sum_conserved(c)).collect()
}

fn assert_conserved(before: &[f64], after: &[f64]) {
    for (b, a) in before.iter().zip(after) {
        let scale = b.abs().max(1.0);
        assert!(
            (a - b).abs() <= 1e-12 * scale,
            "total drifted from {b} to {a}"
        );
    }
}

fn run(h: &mut AmrHierarchy, steps: usize) {
    for _ in 0..steps {
        let dt = h.estimate_dt().unwrap();
        let taken = h.advance(dt).unwrap();
        assert!(taken > 0.0 && taken <= dt);
    }
}

#[test]
fn single_level_conserves() {
    let mut h = hierarchy(1, 32, &[], AdvanceConfig::default());
    let before = totals(&h);
    run(&mut h, 5);
    assert_conserved(&before, &totals(&h));
    assert!(h.time() > 0.0);
}

#[test]
fn method_of_lines_conserves() {
    for tableau in [ButcherTableau::ssp_rk2(), ButcherTableau::ssp_rk3()] {
        let config = AdvanceConfig {
            integrator: IntegratorConfig::MethodOfLines(tableau),
            ..AdvanceConfig::default()
        };
        let mut h = hierarchy(2, 8, &[], config);
        let before = totals(&h);
        run(&mut h, 3);
        assert_conserved(&before, &totals(&h));
    }
}

#[test]
fn two_levels_in_one_dimension_conserve() {
    let patch = GridBox::new(1, [8, 0, 0], [23, 0, 0]);
    let mut h = hierarchy(1, 16, &[patch], AdvanceConfig::default());
    let before = totals(&h);
    run(&mut h, 4);
    assert_conserved(&before, &totals(&h));
}

#[test]
fn two_levels_in_two_dimensions_conserve() {
    let patch = GridBox::new(2, [4, 4, 0], [11, 11, 0]);
    let mut h = hierarchy(2, 8, &[patch], AdvanceConfig::default());
    let before = totals(&h);
    run(&mut h, 3);
    assert_conserved(&before, &totals(&h));
}

#[test]
fn three_levels_conserve() {
    let patches = [
        GridBox::new(1, [8, 0, 0], [23, 0, 0]),
        GridBox::new(1, [24, 0, 0], [39, 0, 0]),
    ];
    let mut h = hierarchy(1, 16, &patches, AdvanceConfig::default());
    let before = totals(&h);
    run(&mut h, 3);
    assert_conserved(&before, &totals(&h));
}

#[test]
fn fine_levels_stay_in_step_with_the_base() {
    let patch = GridBox::new(1, [8, 0, 0], [23, 0, 0]);
    let mut h = hierarchy(1, 16, &[patch], AdvanceConfig::default());
    run(&mut h, 2);
    let coarse = h.levels()[0].time();
    let fine = h.levels()[1].time();
    assert!((coarse - fine).abs() <= 1e-12 * coarse);
    assert!(h.levels()[1].retry().fixed_interval());
    assert!(!h.levels()[0].retry().fixed_interval());
}

#[test]
fn subcycled_fine_level_conserves() {
    let patch = GridBox::new(2, [4, 4, 0], [11, 11, 0]);
    let mut h = hierarchy_with(2, 8, &[patch], AdvanceConfig::default(), |l| match l {
        0 => Arc::new(RusanovSolver),
        _ => Arc::new(Exaggerated { factor: 3.0 }),
    });
    let before = totals(&h);
    let dt = h.estimate_dt().unwrap();
    assert_eq!(h.advance(dt).unwrap(), dt);
    let fine = &h.levels()[1];
    assert!(fine.last_metrics().substeps > 1);
    assert_eq!(fine.last_metrics().dt_taken, 0.5 * dt);
    assert!((fine.time() - h.levels()[0].time()).abs() <= 1e-12 * h.time());
    assert_conserved(&before, &totals(&h));
    run(&mut h, 2);
    assert_conserved(&before, &totals(&h));
}

#[test]
fn retried_base_step_conserves() {
    let patch = GridBox::new(2, [4, 4, 0], [11, 11, 0]);
    let mut h = hierarchy_with(2, 8, &[patch], AdvanceConfig::default(), |l| match l {
        0 => Arc::new(Exaggerated { factor: 3.0 }),
        _ => Arc::new(RusanovSolver),
    });
    let before = totals(&h);
    let dt = h.estimate_dt().unwrap();
    let taken = h.advance(dt).unwrap();
    assert!(taken < dt);
    assert!(h.levels()[0].last_metrics().retries > 0);
    assert!((h.levels()[1].time() - h.time()).abs() <= 1e-12 * h.time());
    assert_conserved(&before, &totals(&h));
    run(&mut h, 2);
    assert_conserved(&before, &totals(&h));
}

#[test]
fn coarse_cells_under_fine_patch_hold_the_fine_average() {
    let patch = GridBox::new(1, [8, 0, 0], [23, 0, 0]);
    let mut h = hierarchy(1, 16, &[patch], AdvanceConfig::default());
    run(&mut h, 1);
    let rho = h.levels()[0].schema().density();
    let coarse = h.levels()[0].state();
    let fine = h.levels()[1].state();
    for i in 4..12 {
        let avg = 0.5 * (fine.get([2 * i, 0, 0], rho) + fine.get([2 * i + 1, 0, 0], rho));
        assert!((coarse.get([i, 0, 0], rho) - avg).abs() < 1e-14);
    }
}

#[test]
fn hierarchy_rejects_misnumbered_levels() {
    let schema = Arc::new(StateSchema::builder().ndim(1).build().unwrap());
    let config = AdvanceConfig::default();
    let levels = vec![
        level(&schema, periodic_geometry(1, 8), 1, &config, Arc::new(RusanovSolver)),
        level(&schema, periodic_geometry(1, 8), 2, &config, Arc::new(RusanovSolver)),
    ];
    match AmrHierarchy::new(levels, RATIO) {
        Err(nova_engine::ConfigError::InvalidHierarchy { .. }) => {}
        other => panic!("expected InvalidHierarchy, got {other:?}"),
    }
}

#[test]
fn hierarchy_rejects_unit_ratio() {
    let schema = Arc::new(StateSchema::builder().ndim(1).build().unwrap());
    let config = AdvanceConfig::default();
    let levels = vec![level(&schema, periodic_geometry(1, 8), 1, &config, Arc::new(RusanovSolver))];
    assert!(matches!(
        AmrHierarchy::new(levels, 1),
        Err(nova_engine::ConfigError::InvalidHierarchy { .. })
    ));
}
