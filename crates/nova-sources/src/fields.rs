//! Per-cell derived quantities shared by the source kernels.

use nova_core::{Direction, StateSchema};

/// Velocity of a cell record.
pub(crate) fn velocity(schema: &StateSchema, cell: &[f64]) -> [f64; 3] {
    let rho = cell[schema.density()];
    let mut v = [0.0; 3];
    for dir in Direction::ALL {
        v[dir.index()] = cell[schema.momentum(dir)] / rho;
    }
    v
}

/// Mass fractions of a cell record; empty without species.
pub(crate) fn mass_fractions(schema: &StateSchema, cell: &[f64]) -> Vec<f64> {
    let rho = cell[schema.density()];
    schema.species().map(|c| cell[c] / rho).collect()
}

/// `x - center`, zero along inactive directions.
pub(crate) fn offset(ndim: usize, x: [f64; 3], center: [f64; 3]) -> [f64; 3] {
    std::array::from_fn(|d| if d < ndim { x[d] - center[d] } else { 0.0 })
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
