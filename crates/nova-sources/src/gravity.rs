//! Self-gravity: potential solves and the gravitational source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use nova_core::{
    Direction, LevelGeometry, LevelId, PoissonRequest, PoissonSolver, SolveError, SolveMode,
    SourceError, SourceKind, StateArray, StateSchema, TimeLevel,
};
use nova_source::{Centering, SourceContext, SourceTerm};

use crate::config::{GravityConfig, GravityEnergy, GravityMode};

// ── Service ────────────────────────────────────────────────────────

/// Computes the gravitational potential of a level.
///
/// In [`GravityMode::LevelWithCorrection`] the old-time evaluation runs
/// both a level and a composite solve and caches their difference per
/// level; the new-time evaluation adds that lagged correction to a fresh
/// level solve.
pub struct GravityService {
    solver: Arc<dyn PoissonSolver>,
    config: GravityConfig,
    corrections: Mutex<HashMap<LevelId, StateArray>>,
}

impl GravityService {
    /// Service backed by `solver`.
    pub fn new(solver: Arc<dyn PoissonSolver>, config: GravityConfig) -> Self {
        Self {
            solver,
            config,
            corrections: Mutex::new(HashMap::new()),
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &GravityConfig {
        &self.config
    }

    fn solve(
        &self,
        geom: &LevelGeometry,
        rhs: &StateArray,
        mode: SolveMode,
        time: f64,
    ) -> Result<StateArray, SourceError> {
        let failed = |error| SourceError::SolveFailed {
            kind: SourceKind::Gravity,
            error,
        };
        let solution = self
            .solver
            .solve(&PoissonRequest {
                level: geom.level(),
                geom,
                rhs,
                mode,
                time,
            })
            .map_err(failed)?;
        log::trace!(
            "gravity {mode:?} solve on level {}: residual {:.3e} after {} iterations",
            geom.level(),
            solution.residual,
            solution.iterations
        );
        if !solution.converged {
            return Err(failed(SolveError::NotConverged {
                solver: format!("poisson ({mode:?})"),
                residual: solution.residual,
                iterations: solution.iterations,
            }));
        }
        if solution.phi.nghost() == 0 {
            return Err(failed(SolveError::InvalidInput {
                reason: "potential returned without ghost cells".to_string(),
            }));
        }
        Ok(solution.phi)
    }

    /// Potential for `state` at `time`, one component with ghost cells.
    pub fn potential(
        &self,
        schema: &StateSchema,
        geom: &LevelGeometry,
        state: &StateArray,
        time: f64,
        time_level: TimeLevel,
    ) -> Result<StateArray, SourceError> {
        let mut rhs = StateArray::new(*state.valid(), state.nghost(), 1);
        let region = *rhs.region();
        for p in region.cells() {
            rhs.set(p, 0, self.config.four_pi_g * state.get(p, schema.density()));
        }
        match self.config.mode {
            GravityMode::Level => self.solve(geom, &rhs, SolveMode::Level, time),
            GravityMode::Composite => self.solve(geom, &rhs, SolveMode::Composite, time),
            GravityMode::LevelWithCorrection => {
                let mut phi = self.solve(geom, &rhs, SolveMode::Level, time)?;
                let mut cache = self
                    .corrections
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if time_level == TimeLevel::Old {
                    let mut correction = self.solve(geom, &rhs, SolveMode::Composite, time)?;
                    let ng = correction.nghost();
                    correction.add_scaled(&phi, -1.0, ng)?;
                    cache.insert(geom.level(), correction);
                }
                match cache.get(&geom.level()) {
                    Some(correction) => {
                        let ng = phi.nghost();
                        phi.add_scaled(correction, 1.0, ng)?;
                    }
                    None => log::warn!(
                        "no lagged gravity correction for level {}; using the level solve",
                        geom.level()
                    ),
                }
                Ok(phi)
            }
        }
    }

    /// Drop cached corrections, e.g. after regridding.
    pub fn reset(&self) {
        self.corrections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// ── Source ─────────────────────────────────────────────────────────

/// Centered-difference acceleration `g = -grad(phi)` at a valid cell.
pub fn acceleration(phi: &StateArray, geom: &LevelGeometry, p: [i64; 3]) -> [f64; 3] {
    let dx = geom.dx();
    let mut g = [0.0; 3];
    for dir in Direction::active(geom.ndim()) {
        let d = dir.index();
        let (mut lo, mut hi) = (p, p);
        lo[d] -= 1;
        hi[d] += 1;
        g[d] = -(phi.get(hi, 0) - phi.get(lo, 0)) / (2.0 * dx[d]);
    }
    g
}

/// Gravitational momentum and energy source.
pub struct GravitySource {
    service: Arc<GravityService>,
}

impl GravitySource {
    /// Source drawing its potential from `service`.
    pub fn new(service: Arc<GravityService>) -> Self {
        Self { service }
    }

    fn conservative(&self) -> bool {
        self.service.config.energy == GravityEnergy::Conservative
    }
}

impl SourceTerm for GravitySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Gravity
    }

    fn centering(&self, schema: &StateSchema, comp: usize) -> Centering {
        if self.conservative() && comp == schema.eden() {
            Centering::NewTimeOnly
        } else {
            Centering::TimeCentered
        }
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let phi = self
            .service
            .potential(schema, geom, state, ctx.time(), ctx.time_level())?;
        let mass_fluxes = match (self.conservative(), ctx.time_level()) {
            (true, TimeLevel::New) => ctx.hydro_fluxes(),
            _ => None,
        };
        let dx = geom.dx();
        let out = ctx.output();
        for p in state.valid().cells() {
            let cell = state.cell(p);
            let rho = cell[schema.density()];
            let g = acceleration(&phi, geom, p);
            let o = out.cell_mut(p);
            let mut work = 0.0;
            for dir in Direction::ALL {
                let d = dir.index();
                o[schema.momentum(dir)] = rho * g[d];
                work += cell[schema.momentum(dir)] * g[d];
            }
            o[schema.eden()] = match mass_fluxes {
                Some(fluxes) => {
                    let mut e = 0.0;
                    for dir in Direction::active(geom.ndim()) {
                        let d = dir.index();
                        let (mut lo, mut hi) = (p, p);
                        lo[d] -= 1;
                        hi[d] += 1;
                        let f_lo = fluxes.dir(d).get(p, schema.density());
                        let f_hi = fluxes.dir(d).get(hi, schema.density());
                        let phi_c = phi.get(p, 0);
                        e -= 0.5
                            * (f_lo * (phi_c - phi.get(lo, 0)) + f_hi * (phi.get(hi, 0) - phi_c))
                            / dx[d];
                    }
                    e
                }
                None => work,
            };
        }
        Ok(())
    }
}
