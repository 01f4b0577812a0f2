//! Integrated change a source rate makes to the conserved totals.

use nova_core::{Direction, LevelGeometry, LevelId, SourceKind, StateArray, StateSchema};

/// Volume-integrated change of mass, momentum and total energy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SourceChange {
    /// Added mass.
    pub mass: f64,
    /// Added momentum per direction.
    pub momentum: [f64; 3],
    /// Added total energy.
    pub energy: f64,
}

impl SourceChange {
    /// Whether every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.mass == 0.0 && self.energy == 0.0 && self.momentum.iter().all(|&m| m == 0.0)
    }
}

/// Integrate `dt * rate` over the valid cells of a level.
pub fn evaluate_source_change(
    schema: &StateSchema,
    geom: &LevelGeometry,
    rate: &StateArray,
    dt: f64,
) -> SourceChange {
    let scale = dt * geom.cell_volume();
    let mut change = SourceChange {
        mass: scale * rate.sum_valid(schema.density()),
        energy: scale * rate.sum_valid(schema.eden()),
        ..SourceChange::default()
    };
    for dir in Direction::active(schema.ndim()) {
        change.momentum[dir.index()] = scale * rate.sum_valid(schema.momentum(dir));
    }
    change
}

/// Log a nonzero change at debug level.
pub fn log_source_change(kind: SourceKind, level: LevelId, change: &SourceChange) {
    if change.is_zero() {
        return;
    }
    log::debug!(
        "level {level} source '{kind}': dmass={:.6e} dmom=[{:.6e}, {:.6e}, {:.6e}] denergy={:.6e}",
        change.mass,
        change.momentum[0],
        change.momentum[1],
        change.momentum[2],
        change.energy,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_test_utils::periodic_geometry;

    #[test]
    fn integrates_over_valid_cells() {
        let schema = StateSchema::builder().ndim(1).build().unwrap();
        let geom = periodic_geometry(1, 4);
        let mut rate = StateArray::new(*geom.valid(), 2, schema.ncomp());
        rate.fill(1.0);
        let change = evaluate_source_change(&schema, &geom, &rate, 0.5);
        assert!((change.mass - 0.5).abs() < 1e-15);
        assert!((change.energy - 0.5).abs() < 1e-15);
        assert!((change.momentum[0] - 0.5).abs() < 1e-15);
        assert_eq!(change.momentum[1], 0.0);
    }
}
