//! Thermal conduction and species diffusion.

use std::sync::Arc;

use nova_core::{
    DiffusedQuantity, DiffusionRequest, DiffusionSolver, Direction, FaceFluxes, LevelGeometry,
    SolveError, SourceError, SourceKind, StateArray, StateSchema,
};
use nova_grid::bc_codes;
use nova_source::{Centering, SourceContext, SourceTerm};

use crate::config::DiffusionConfig;

/// Diffusion as the divergence of collaborator-computed face fluxes.
///
/// Conductive fluxes of temperature carry both energies; in 1-D each
/// species diffuses its mass fraction with coefficient `rho D`. The
/// combined fluxes are posted so the flux registers see the same
/// transport the source applies.
pub struct DiffusionSource {
    solver: Arc<dyn DiffusionSolver>,
    config: DiffusionConfig,
}

impl DiffusionSource {
    /// Diffusion through `solver`.
    pub fn new(solver: Arc<dyn DiffusionSolver>, config: DiffusionConfig) -> Self {
        Self { solver, config }
    }

    fn solve(
        &self,
        ctx: &SourceContext<'_>,
        quantity: DiffusedQuantity,
        field: &StateArray,
        coefficient: &StateArray,
    ) -> Result<FaceFluxes, SourceError> {
        let solution = self
            .solver
            .apply_op(&DiffusionRequest {
                level: ctx.level(),
                geom: ctx.geom(),
                quantity,
                field,
                coefficient,
                bc: bc_codes(ctx.geom()),
                time: ctx.time(),
            })
            .map_err(|error| SourceError::SolveFailed {
                kind: SourceKind::Diffusion,
                error,
            })?;
        log::trace!(
            "diffusion {quantity:?} on level {}: residual {:.3e}",
            ctx.level(),
            solution.residual
        );
        if !solution.converged {
            return Err(SourceError::SolveFailed {
                kind: SourceKind::Diffusion,
                error: SolveError::NotConverged {
                    solver: "diffusion".to_string(),
                    residual: solution.residual,
                    iterations: 0,
                },
            });
        }
        Ok(solution.fluxes)
    }
}

/// One-component copy of `comp` over the whole region of `state`,
/// divided by the `rho` component when given.
fn extract(state: &StateArray, comp: usize, rho: Option<usize>) -> StateArray {
    let mut field = StateArray::new(*state.valid(), state.nghost(), 1);
    let region = *state.region();
    for p in region.cells() {
        let cell = state.cell(p);
        let v = match rho {
            Some(r) => cell[comp] / cell[r],
            None => cell[comp],
        };
        field.set(p, 0, v);
    }
    field
}

impl SourceTerm for DiffusionSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Diffusion
    }

    fn flux_centering(&self) -> Centering {
        if self.config.new_time_only {
            Centering::NewTimeOnly
        } else {
            Centering::TimeCentered
        }
    }

    fn centering(&self, _schema: &StateSchema, _comp: usize) -> Centering {
        self.flux_centering()
    }

    /// Explicit conduction limit `0.5 dx^2 / D` with thermal diffusivity
    /// `D = k / (rho c_v)` and `c_v` taken as `e / T` per cell.
    fn max_dt(
        &self,
        schema: &StateSchema,
        geom: &LevelGeometry,
        state: &StateArray,
    ) -> Option<f64> {
        if self.config.conductivity <= 0.0 {
            return None;
        }
        let dx2 = geom.min_dx().powi(2);
        let mut dt = f64::INFINITY;
        for p in state.valid().cells() {
            let cell = state.cell(p);
            let (rho, rhoe, t) = (cell[schema.density()], cell[schema.eint()], cell[schema.temp()]);
            if rho <= 0.0 || rhoe <= 0.0 || t <= 0.0 {
                continue;
            }
            let cv = rhoe / (rho * t);
            let diffusivity = self.config.conductivity / (rho * cv);
            dt = dt.min(0.5 * dx2 / diffusivity);
        }
        dt.is_finite().then_some(dt)
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let mut total = FaceFluxes::new(*state.valid(), schema.ncomp());

        let temperature = extract(state, schema.temp(), None);
        let mut conductivity = temperature.zeros_like();
        conductivity.fill(self.config.conductivity);
        let heat = self.solve(ctx, DiffusedQuantity::Temperature, &temperature, &conductivity)?;
        for d in 0..total.ndir() {
            let faces = *heat.dir(d).faces();
            for f in faces.cells() {
                let q = heat.dir(d).get(f, 0);
                let face = total.dir_mut(d).face_mut(f);
                face[schema.eden()] = q;
                face[schema.eint()] = q;
            }
        }

        if let (Some(diffusivity), 1) = (self.config.species_diffusivity, geom.ndim()) {
            let density = extract(state, schema.density(), None);
            let mut coefficient = density.clone();
            coefficient.data_mut().iter_mut().for_each(|v| *v *= diffusivity);
            for (k, comp) in schema.species().enumerate() {
                let fraction = extract(state, comp, Some(schema.density()));
                let fluxes =
                    self.solve(ctx, DiffusedQuantity::Species(k), &fraction, &coefficient)?;
                let d = Direction::X.index();
                let faces = *fluxes.dir(d).faces();
                for f in faces.cells() {
                    total.dir_mut(d).set(f, comp, fluxes.dir(d).get(f, 0));
                }
            }
        }

        let dx = geom.dx();
        let out = ctx.output();
        for p in state.valid().cells() {
            let o = out.cell_mut(p);
            for (c, v) in o.iter_mut().enumerate() {
                *v = -total.divergence(p, c, dx);
            }
        }
        ctx.post_fluxes(total);
        Ok(())
    }
}
