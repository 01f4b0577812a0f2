//! Hybrid (radial, angular, vertical) momentum.
//!
//! The hybrid components shadow the Cartesian momentum about a vertical
//! axis through `center`: `m_R = (x m_x + y m_y) / R`,
//! `l = x m_y - y m_x`, `m_z`. They are evolved by the flux update, with
//! face fluxes projected from the Cartesian momentum fluxes, and by this
//! term's rate. Once an attempt's update is applied they are written back
//! into the Cartesian momenta, so `l` is conserved to round-off by the
//! advection itself. Changes made outside that path (reflux, averaging)
//! are carried into them by [`sync`](SourceTerm::sync).

use std::sync::Arc;

use nova_core::{
    Direction, Eos, EosInput, FaceFluxes, IntVect, LevelGeometry, SourceError, SourceKind,
    StateArray, StateSchema,
};
use nova_source::{SourceContext, SourceTerm};

use crate::config::HybridConfig;
use crate::fields::{mass_fractions, offset};

/// Hybrid components of the Cartesian vector `m` at offset `r`.
pub fn linear_to_hybrid(r: [f64; 3], m: [f64; 3]) -> [f64; 3] {
    let radius = (r[0] * r[0] + r[1] * r[1]).sqrt();
    let radial = if radius > 0.0 {
        (r[0] * m[0] + r[1] * m[1]) / radius
    } else {
        0.0
    };
    [radial, r[0] * m[1] - r[1] * m[0], m[2]]
}

/// Cartesian vector with hybrid components `h` at offset `r`.
pub fn hybrid_to_linear(r: [f64; 3], h: [f64; 3]) -> [f64; 3] {
    let radius = (r[0] * r[0] + r[1] * r[1]).sqrt();
    if radius == 0.0 {
        return [0.0, 0.0, h[2]];
    }
    let (c, s) = (r[0] / radius, r[1] / radius);
    let tangential = h[1] / radius;
    [c * h[0] - s * tangential, s * h[0] + c * tangential, h[2]]
}

fn cartesian(schema: &StateSchema, cell: &[f64]) -> [f64; 3] {
    let mut m = [0.0; 3];
    for dir in Direction::ALL {
        m[dir.index()] = cell[schema.momentum(dir)];
    }
    m
}

/// Horizontal unit vector away from the axis; zero on it.
fn radial_unit(r: [f64; 3]) -> [f64; 2] {
    let radius = r[0].hypot(r[1]);
    if radius > 0.0 {
        [r[0] / radius, r[1] / radius]
    } else {
        [0.0, 0.0]
    }
}

fn missing_components() -> SourceError {
    SourceError::ExecutionFailed {
        kind: SourceKind::HybridMomentum,
        reason: "state has no hybrid momentum components".to_string(),
    }
}

/// Evolves the hybrid momentum components.
///
/// The rate is the hybrid projection of the summed Cartesian momentum
/// rates of every preceding kind, plus the geometric radial term
/// `rho v_phi^2 / R + p div(R_hat)`. The divergence is taken over the
/// same faces as the flux update, so a gas at rest in uniform pressure
/// stays at rest.
pub struct HybridMomentumSource {
    eos: Arc<dyn Eos>,
    config: HybridConfig,
}

impl HybridMomentumSource {
    /// Hybrid decomposition about `config.center`; pressure through `eos`.
    pub fn new(eos: Arc<dyn Eos>, config: HybridConfig) -> Self {
        Self { eos, config }
    }

    fn cell_offset(&self, geom: &LevelGeometry, p: IntVect) -> [f64; 3] {
        offset(geom.ndim(), geom.cell_center(p), self.config.center)
    }

    /// Offset of the low face of cell `p` normal to `d`.
    fn face_offset(&self, geom: &LevelGeometry, p: IntVect, d: usize) -> [f64; 3] {
        let mut x = geom.cell_center(p);
        x[d] -= 0.5 * geom.dx()[d];
        offset(geom.ndim(), x, self.config.center)
    }

    /// Discrete divergence of the radial unit vector over the faces of `p`.
    fn radial_divergence(&self, geom: &LevelGeometry, p: IntVect) -> f64 {
        let dx = geom.dx();
        (0..geom.ndim().min(2))
            .map(|d| {
                let mut hi = p;
                hi[d] += 1;
                let upper = radial_unit(self.face_offset(geom, hi, d))[d];
                let lower = radial_unit(self.face_offset(geom, p, d))[d];
                (upper - lower) / dx[d]
            })
            .sum()
    }

    fn pressure(&self, schema: &StateSchema, cell: &[f64]) -> Result<f64, SourceError> {
        let rho = cell[schema.density()];
        let x = mass_fractions(schema, cell);
        self.eos
            .evaluate(
                EosInput::RhoE {
                    rho,
                    e: cell[schema.eint()] / rho,
                },
                &x,
            )
            .map(|s| s.pressure)
            .map_err(|error| SourceError::Eos {
                kind: SourceKind::HybridMomentum,
                error,
            })
    }
}

impl SourceTerm for HybridMomentumSource {
    fn kind(&self) -> SourceKind {
        SourceKind::HybridMomentum
    }

    fn after(&self) -> Vec<SourceKind> {
        vec![
            SourceKind::External,
            SourceKind::Sponge,
            SourceKind::Gravity,
            SourceKind::Rotation,
        ]
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let [rad, ang, vert] = schema.hybrid().ok_or_else(missing_components)?;
        let preceding = ctx.preceding();
        let out = ctx.output();
        for p in state.valid().cells() {
            let mut s = [0.0; 3];
            for c in preceding.iter() {
                let m = cartesian(schema, c.rate().cell(p));
                for (acc, v) in s.iter_mut().zip(m) {
                    *acc += v;
                }
            }
            let r = self.cell_offset(geom, p);
            let mut h = linear_to_hybrid(r, s);
            let cell = state.cell(p);
            let radius = r[0].hypot(r[1]);
            if radius > 0.0 {
                let l = cell[ang];
                h[0] += l * l / (cell[schema.density()] * radius.powi(3));
            }
            h[0] += self.pressure(schema, cell)? * self.radial_divergence(geom, p);
            let o = out.cell_mut(p);
            for (comp, v) in [rad, ang, vert].into_iter().zip(h) {
                o[comp] = v;
            }
        }
        Ok(())
    }

    fn couple_fluxes(&self, schema: &StateSchema, geom: &LevelGeometry, fluxes: &mut FaceFluxes) {
        let Some(hybrid) = schema.hybrid() else {
            return;
        };
        for d in 0..fluxes.ndir() {
            let fa = fluxes.dir_mut(d);
            let faces = *fa.faces();
            for p in faces.cells() {
                let mut m = [0.0; 3];
                for dir in Direction::ALL {
                    m[dir.index()] = fa.get(p, schema.momentum(dir));
                }
                let h = linear_to_hybrid(self.face_offset(geom, p, d), m);
                for (comp, v) in hybrid.iter().zip(h) {
                    fa.set(p, *comp, v);
                }
            }
        }
    }

    fn feed_back(
        &self,
        schema: &StateSchema,
        geom: &LevelGeometry,
        state: &mut StateArray,
        ng: usize,
    ) -> bool {
        let Some(hybrid) = schema.hybrid() else {
            return false;
        };
        let target = state.valid().grow(ng.min(state.nghost()));
        let mut changed = false;
        for p in target.cells() {
            let r = self.cell_offset(geom, p);
            let on_axis = r[0].hypot(r[1]) == 0.0;
            let cell = state.cell_mut(p);
            let m = hybrid_to_linear(r, hybrid.map(|c| cell[c]));
            for dir in Direction::ALL {
                // The axis has no horizontal decomposition; keep the Cartesian part.
                if on_axis && dir != Direction::Z {
                    continue;
                }
                let comp = schema.momentum(dir);
                let v = m[dir.index()];
                if cell[comp].to_bits() != v.to_bits() {
                    cell[comp] = v;
                    changed = true;
                }
            }
        }
        changed
    }

    fn sync(
        &self,
        schema: &StateSchema,
        geom: &LevelGeometry,
        state: &mut StateArray,
        ng: usize,
    ) -> bool {
        let Some(hybrid) = schema.hybrid() else {
            return false;
        };
        let target = state.valid().grow(ng.min(state.nghost()));
        let mut changed = false;
        for p in target.cells() {
            let r = self.cell_offset(geom, p);
            let cell = state.cell_mut(p);
            let h = linear_to_hybrid(r, cartesian(schema, cell));
            for (comp, v) in hybrid.iter().zip(h) {
                if cell[*comp].to_bits() != v.to_bits() {
                    cell[*comp] = v;
                    changed = true;
                }
            }
        }
        changed
    }
}
