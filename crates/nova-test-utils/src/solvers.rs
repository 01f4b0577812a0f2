//! Linear-solve mocks for gravity and diffusion.

use nova_core::{
    DiffusionRequest, DiffusionSolution, DiffusionSolver, Direction, FaceFluxes, PoissonRequest,
    PoissonSolver, PotentialSolution, SolveError, SolveMode, StateArray,
};

/// Returns the potential of a uniform field, `phi = -g . x`, ignoring the
/// density. Level and composite solves may be given different fields.
#[derive(Clone, Copy, Debug)]
pub struct UniformFieldSolver {
    pub level_g: [f64; 3],
    pub composite_g: [f64; 3],
}

impl UniformFieldSolver {
    pub fn new(g: [f64; 3]) -> Self {
        Self {
            level_g: g,
            composite_g: g,
        }
    }

    pub fn with_composite(mut self, g: [f64; 3]) -> Self {
        self.composite_g = g;
        self
    }
}

impl PoissonSolver for UniformFieldSolver {
    fn solve(&self, req: &PoissonRequest<'_>) -> Result<PotentialSolution, SolveError> {
        let g = match req.mode {
            SolveMode::Level => self.level_g,
            SolveMode::Composite => self.composite_g,
        };
        let ng = req.rhs.nghost().max(1);
        let mut phi = StateArray::new(*req.rhs.valid(), ng, 1);
        let region = *phi.region();
        for p in region.cells() {
            let x = req.geom.cell_center(p);
            let v: f64 = (0..3).map(|d| -g[d] * x[d]).sum();
            phi.set(p, 0, v);
        }
        Ok(PotentialSolution {
            phi,
            converged: true,
            residual: 0.0,
            iterations: 1,
        })
    }
}

/// Always reports non-convergence.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonConvergingPoisson;

impl PoissonSolver for NonConvergingPoisson {
    fn solve(&self, req: &PoissonRequest<'_>) -> Result<PotentialSolution, SolveError> {
        Ok(PotentialSolution {
            phi: StateArray::new(*req.rhs.valid(), req.rhs.nghost().max(1), 1),
            converged: false,
            residual: 1.0,
            iterations: 100,
        })
    }
}

/// Explicit central-difference fluxes `-k grad(field)` with face-averaged
/// coefficients. Requires one filled ghost cell.
#[derive(Clone, Copy, Debug, Default)]
pub struct CentralDifferenceDiffusion;

impl DiffusionSolver for CentralDifferenceDiffusion {
    fn apply_op(&self, req: &DiffusionRequest<'_>) -> Result<DiffusionSolution, SolveError> {
        if req.field.nghost() == 0 {
            return Err(SolveError::InvalidInput {
                reason: "diffused field needs one ghost cell".to_string(),
            });
        }
        let dx = req.geom.dx();
        let mut fluxes = FaceFluxes::new(*req.field.valid(), 1);
        for dir in Direction::active(req.geom.ndim()) {
            let d = dir.index();
            let faces = *fluxes.dir(d).faces();
            for f in faces.cells() {
                let mut l = f;
                l[d] -= 1;
                let k = 0.5 * (req.coefficient.get(l, 0) + req.coefficient.get(f, 0));
                let grad = (req.field.get(f, 0) - req.field.get(l, 0)) / dx[d];
                fluxes.dir_mut(d).set(f, 0, -k * grad);
            }
        }
        Ok(DiffusionSolution {
            fluxes,
            converged: true,
            residual: 0.0,
        })
    }
}

/// Returns zero fluxes flagged as unconverged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonConvergingDiffusion;

impl DiffusionSolver for NonConvergingDiffusion {
    fn apply_op(&self, req: &DiffusionRequest<'_>) -> Result<DiffusionSolution, SolveError> {
        Ok(DiffusionSolution {
            fluxes: FaceFluxes::new(*req.field.valid(), 1),
            converged: false,
            residual: 0.5,
        })
    }
}
