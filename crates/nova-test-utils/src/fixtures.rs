//! Seeded level geometries and states.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use nova_core::{
    BoundaryKind, Direction, GridBox, LevelGeometry, StateArray, StateSchema,
};

/// A single-patch level of `n` cells per active direction with unit
/// domain length and periodic boundaries.
pub fn periodic_geometry(ndim: usize, n: i64) -> LevelGeometry {
    geometry(ndim, n, BoundaryKind::Periodic)
}

/// As [`periodic_geometry`] with outflow boundaries.
pub fn outflow_geometry(ndim: usize, n: i64) -> LevelGeometry {
    geometry(ndim, n, BoundaryKind::Outflow)
}

fn geometry(ndim: usize, n: i64, kind: BoundaryKind) -> LevelGeometry {
    let h = 1.0 / n as f64;
    LevelGeometry::single_patch(GridBox::with_size(ndim, [n, n, n]), [h; 3], [[kind; 2]; 3])
        .expect("fixture geometry is valid")
}

/// Uniform primitive description of a gamma-law flow.
#[derive(Clone, Copy, Debug)]
pub struct FlowSpec {
    pub rho: f64,
    pub velocity: [f64; 3],
    pub pressure: f64,
    pub gamma: f64,
}

impl Default for FlowSpec {
    fn default() -> Self {
        Self {
            rho: 1.0,
            velocity: [0.0; 3],
            pressure: 1.0,
            gamma: 1.4,
        }
    }
}

fn write_cell(schema: &StateSchema, cell: &mut [f64], flow: &FlowSpec) {
    cell.iter_mut().for_each(|v| *v = 0.0);
    let rho = flow.rho;
    cell[schema.density()] = rho;
    let mut ke = 0.0;
    for dir in Direction::ALL {
        let v = flow.velocity[dir.index()];
        cell[schema.momentum(dir)] = rho * v;
        ke += 0.5 * rho * v * v;
    }
    let rhoe = flow.pressure / (flow.gamma - 1.0);
    cell[schema.eint()] = rhoe;
    cell[schema.eden()] = rhoe + ke;
    cell[schema.temp()] = (flow.gamma - 1.0) * rhoe / rho;
    let nspec = schema.nspec();
    for c in schema.species() {
        cell[c] = rho / nspec as f64;
    }
}

/// Every cell (ghosts included) set to `flow`.
pub fn uniform_state(
    schema: &StateSchema,
    geom: &LevelGeometry,
    ng: usize,
    flow: FlowSpec,
) -> StateArray {
    let mut s = StateArray::new(*geom.valid(), ng, schema.ncomp());
    let region = *s.region();
    for p in region.cells() {
        write_cell(schema, s.cell_mut(p), &flow);
    }
    s
}

/// `flow` with seeded relative perturbations of density, velocity, and
/// pressure of at most `amplitude`.
pub fn perturbed_state(
    schema: &StateSchema,
    geom: &LevelGeometry,
    ng: usize,
    flow: FlowSpec,
    amplitude: f64,
    seed: u64,
) -> StateArray {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut s = StateArray::new(*geom.valid(), ng, schema.ncomp());
    let region = *s.region();
    for p in region.cells() {
        let mut local = flow;
        local.rho *= 1.0 + amplitude * rng.random_range(-1.0..1.0);
        local.pressure *= 1.0 + amplitude * rng.random_range(-1.0..1.0);
        for v in local.velocity.iter_mut() {
            *v += amplitude * rng.random_range(-1.0..1.0);
        }
        for dir in Direction::ALL.into_iter().skip(geom.ndim()) {
            local.velocity[dir.index()] = flow.velocity[dir.index()];
        }
        write_cell(schema, s.cell_mut(p), &local);
    }
    s
}
