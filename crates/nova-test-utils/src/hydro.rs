//! Hyperbolic flux mocks.

use std::sync::atomic::{AtomicUsize, Ordering};

use nova_core::{
    Direction, FaceFluxes, HydroError, HydroOutcome, HydroRequest, HyperbolicSolver, IntVect,
};

/// First-order Rusanov (local Lax-Friedrichs) fluxes.
///
/// Requires one filled ghost cell. Temperature and hybrid-momentum
/// components carry zero flux; the hybrid ones are filled from the
/// Cartesian momentum fluxes by the hybrid source term.
#[derive(Clone, Copy, Debug, Default)]
pub struct RusanovSolver;

impl RusanovSolver {
    fn physical_flux(req: &HydroRequest<'_>, p: IntVect, dir: Direction, out: &mut [f64]) {
        let s = req.schema;
        let q = req.layout;
        let u = req.conserved.cell(p);
        let prim = req.primitive.cell(p);
        let vn = prim[q.velocity(dir)];
        let pres = prim[q.pressure()];
        out.iter_mut().for_each(|v| *v = 0.0);
        out[s.density()] = u[s.density()] * vn;
        for m in Direction::ALL {
            out[s.momentum(m)] = u[s.momentum(m)] * vn;
        }
        out[s.momentum(dir)] += pres;
        out[s.eden()] = (u[s.eden()] + pres) * vn;
        out[s.eint()] = u[s.eint()] * vn;
        for c in s.advected().chain(s.species()).chain(s.aux()) {
            out[c] = u[c] * vn;
        }
    }

    fn advected_comps(req: &HydroRequest<'_>) -> Vec<usize> {
        let s = req.schema;
        let mut comps = vec![s.density(), s.eden(), s.eint()];
        comps.extend(s.momenta());
        comps.extend(s.advected().chain(s.species()).chain(s.aux()));
        comps
    }
}

impl HyperbolicSolver for RusanovSolver {
    fn name(&self) -> &str {
        "rusanov"
    }

    fn compute_fluxes(
        &self,
        req: &HydroRequest<'_>,
        fluxes: &mut FaceFluxes,
    ) -> Result<HydroOutcome, HydroError> {
        let ncomp = req.schema.ncomp();
        let q = req.layout;
        let dissipated = Self::advected_comps(req);
        let mut fl = vec![0.0; ncomp];
        let mut fr = vec![0.0; ncomp];
        let mut outcome = HydroOutcome::default();
        for dir in Direction::active(req.geom.ndim()) {
            let d = dir.index();
            let faces = *fluxes.dir(d).faces();
            for f in faces.cells() {
                let mut l = f;
                l[d] -= 1;
                Self::physical_flux(req, l, dir, &mut fl);
                Self::physical_flux(req, f, dir, &mut fr);
                let speed = |p: IntVect| {
                    req.primitive.get(p, q.velocity(dir)).abs()
                        + req.primitive.get(p, q.sound_speed())
                };
                let smax = speed(l).max(speed(f));
                outcome.max_wave_speed[d] = outcome.max_wave_speed[d].max(smax);
                let ul = req.conserved.cell(l);
                let ur = req.conserved.cell(f);
                let out = fluxes.dir_mut(d).face_mut(f);
                for &c in &dissipated {
                    out[c] = 0.5 * (fl[c] + fr[c]) - 0.5 * smax * (ur[c] - ul[c]);
                }
                if out.iter().any(|v| !v.is_finite()) {
                    return Err(HydroError::NonFinite { face: f, dir: d });
                }
            }
        }
        Ok(outcome)
    }
}

/// Zero fluxes with a prescribed wave speed, for steering CFL diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct FixedWaveSpeedHydro {
    pub speed: f64,
}

impl FixedWaveSpeedHydro {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }
}

impl HyperbolicSolver for FixedWaveSpeedHydro {
    fn name(&self) -> &str {
        "fixed_wave_speed"
    }

    fn compute_fluxes(
        &self,
        req: &HydroRequest<'_>,
        _fluxes: &mut FaceFluxes,
    ) -> Result<HydroOutcome, HydroError> {
        let mut outcome = HydroOutcome::default();
        for d in 0..req.geom.ndim() {
            outcome.max_wave_speed[d] = self.speed;
        }
        Ok(outcome)
    }
}

/// Fails deterministically after a configurable number of successful calls.
///
/// Successful calls delegate to [`RusanovSolver`].
pub struct FailingHydro {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingHydro {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl HyperbolicSolver for FailingHydro {
    fn name(&self) -> &str {
        "failing"
    }

    fn compute_fluxes(
        &self,
        req: &HydroRequest<'_>,
        fluxes: &mut FaceFluxes,
    ) -> Result<HydroOutcome, HydroError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(HydroError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        RusanovSolver.compute_fluxes(req, fluxes)
    }
}
