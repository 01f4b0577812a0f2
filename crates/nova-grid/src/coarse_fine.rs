//! Ghost fill for fine levels from the next coarser level.

use nova_core::{FillError, GhostFill, IntVect, LevelGeometry, StateArray};

use crate::boundary::PhysicalBoundaryFill;
use crate::error::GridError;

/// Index of the coarse cell containing fine cell `p`.
pub fn coarse_index(p: IntVect, ndim: usize, ratio: i64) -> IntVect {
    let mut c = p;
    for d in 0..ndim {
        c[d] = p[d].div_euclid(ratio);
    }
    c
}

/// Piecewise-constant prolongation of every component from `coarse` into
/// the cells of `fine` inside `target`.
pub fn prolong(
    coarse: &StateArray,
    fine: &mut StateArray,
    target: &nova_core::GridBox,
    ratio: i64,
) -> Result<(), GridError> {
    if coarse.ncomp() != fine.ncomp() {
        return Err(GridError::ComponentMismatch {
            fine: fine.ncomp(),
            coarse: coarse.ncomp(),
        });
    }
    let ndim = target.ndim();
    for p in target.cells() {
        let c = coarse_index(p, ndim, ratio);
        if !coarse.region().contains(c) {
            return Err(GridError::OutsideCoarseData { point: c });
        }
        fine.cell_mut(p).copy_from_slice(coarse.cell(c));
    }
    Ok(())
}

/// Fills a fine level's ghost cells: physical boundaries first, then every
/// remaining ghost by piecewise-constant injection from the coarse level,
/// linearly interpolated in time between the coarse old and new states.
#[derive(Debug)]
pub struct CoarseFineFill<'a> {
    physical: PhysicalBoundaryFill,
    coarse_old: &'a StateArray,
    coarse_new: &'a StateArray,
    t_old: f64,
    t_new: f64,
    ratio: i64,
}

impl<'a> CoarseFineFill<'a> {
    /// Fill from the coarse states at `t_old` and `t_new`.
    pub fn new(
        physical: PhysicalBoundaryFill,
        coarse_old: &'a StateArray,
        coarse_new: &'a StateArray,
        t_old: f64,
        t_new: f64,
        ratio: i64,
    ) -> Self {
        Self {
            physical,
            coarse_old,
            coarse_new,
            t_old,
            t_new,
            ratio,
        }
    }

    fn time_weight(&self, time: f64) -> Result<f64, FillError> {
        let span = self.t_new - self.t_old;
        let tol = 1e-12 * span.abs().max(self.t_new.abs()).max(1.0);
        if time < self.t_old - tol || time > self.t_new + tol {
            return Err(FillError::TimeOutOfRange {
                time,
                t_old: self.t_old,
                t_new: self.t_new,
            });
        }
        if span <= 0.0 {
            return Ok(1.0);
        }
        Ok(((time - self.t_old) / span).clamp(0.0, 1.0))
    }
}

impl GhostFill for CoarseFineFill<'_> {
    fn fill_patch(
        &self,
        state: &mut StateArray,
        geom: &LevelGeometry,
        time: f64,
    ) -> Result<(), FillError> {
        if state.ncomp() != self.coarse_old.ncomp() {
            return Err(FillError::Failed {
                reason: GridError::ComponentMismatch {
                    fine: state.ncomp(),
                    coarse: self.coarse_old.ncomp(),
                }
                .to_string(),
            });
        }
        let alpha = self.time_weight(time)?;
        let unfilled = self.physical.fill_physical(state, geom);
        for (p, img) in unfilled {
            let c = coarse_index(img.point, geom.ndim(), self.ratio);
            if !self.coarse_old.region().contains(c) {
                return Err(FillError::Failed {
                    reason: GridError::OutsideCoarseData { point: c }.to_string(),
                });
            }
            let old = self.coarse_old.cell(c);
            let new = self.coarse_new.cell(c);
            for comp in 0..state.ncomp() {
                let v = (1.0 - alpha) * old[comp] + alpha * new[comp];
                state.set(p, comp, self.physical.sign(comp, img.flips) * v);
            }
        }
        Ok(())
    }
}
