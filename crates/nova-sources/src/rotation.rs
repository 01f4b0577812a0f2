//! Fictitious forces of a rotating frame.

use nova_core::{Direction, SourceError, SourceKind};
use nova_source::{SourceContext, SourceTerm};

use crate::config::RotationConfig;
use crate::fields::{cross, dot, offset, velocity};

/// Coriolis, centrifugal, and Euler accelerations,
/// `a = -2 Omega x v - Omega x (Omega x r) - dOmega/dt x r`.
pub struct RotationSource {
    config: RotationConfig,
}

impl RotationSource {
    /// Frame rotating as configured.
    pub fn new(config: RotationConfig) -> Self {
        Self { config }
    }

    /// Acceleration at offset `r` from the axis origin, velocity `v`.
    pub fn acceleration(&self, r: [f64; 3], v: [f64; 3]) -> [f64; 3] {
        let omega = self.config.omega;
        let coriolis = cross(omega, v);
        let centrifugal = cross(omega, cross(omega, r));
        let euler = cross(self.config.omega_dot, r);
        std::array::from_fn(|d| -2.0 * coriolis[d] - centrifugal[d] - euler[d])
    }
}

impl SourceTerm for RotationSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Rotation
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let out = ctx.output();
        for p in state.valid().cells() {
            let cell = state.cell(p);
            let rho = cell[schema.density()];
            let v = velocity(schema, cell);
            let r = offset(geom.ndim(), geom.cell_center(p), self.config.center);
            let a = self.acceleration(r, v);
            let o = out.cell_mut(p);
            for dir in Direction::ALL {
                o[schema.momentum(dir)] = rho * a[dir.index()];
            }
            o[schema.eden()] = rho * dot(v, a);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spinning(omega_dot: [f64; 3]) -> RotationSource {
        RotationSource::new(RotationConfig {
            center: [0.0; 3],
            omega: [0.0, 0.0, 1.0],
            omega_dot,
        })
    }

    #[test]
    fn coriolis_does_no_work() {
        let a = spinning([0.0; 3]).acceleration([0.0; 3], [1.0, 0.0, 0.0]);
        assert_eq!(a, [0.0, -2.0, 0.0]);
        assert_eq!(dot(a, [1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn centrifugal_points_outward() {
        let a = spinning([0.0; 3]).acceleration([0.25, 0.0, 0.0], [0.0; 3]);
        assert_eq!(a, [0.25, 0.0, 0.0]);
    }

    #[test]
    fn euler_term_opposes_spin_up() {
        let s = RotationSource::new(RotationConfig {
            omega_dot: [0.0, 0.0, 2.0],
            ..RotationConfig::default()
        });
        let a = s.acceleration([1.0, 0.0, 0.0], [0.0; 3]);
        assert_eq!(a, [0.0, -2.0, 0.0]);
    }
}
