//! Attempt-local flux staging.

use nova_core::{FaceArray, FaceFluxes, GridBox, LevelId};

use crate::completion::SubcycleComplete;
use crate::error::FluxError;
use crate::register::FluxRegister;

/// Stages the time-integrated face fluxes of one level attempt.
///
/// Nothing reaches a [`FluxRegister`] until [`commit`](Self::commit),
/// which the controller calls only for an accepted attempt. A rejected
/// attempt is dropped with [`discard`](Self::discard).
#[derive(Clone, Debug)]
pub struct FluxAccumulator {
    level: LevelId,
    staged: FaceFluxes,
    dt: f64,
    substep: usize,
    contributions: usize,
}

impl FluxAccumulator {
    /// Empty staging for a level patch.
    pub fn new(level: LevelId, cells: GridBox, ncomp: usize) -> Self {
        Self {
            level,
            staged: FaceFluxes::new(cells, ncomp),
            dt: 0.0,
            substep: 0,
            contributions: 0,
        }
    }

    /// Start staging an attempt of size `dt`, sub-step `substep` of the
    /// enclosing coarse step.
    pub fn begin_attempt(&mut self, dt: f64, substep: usize) {
        self.staged.clear();
        self.dt = dt;
        self.substep = substep;
        self.contributions = 0;
    }

    /// Stage `scale * fluxes` for one direction.
    pub fn add_flux(
        &mut self,
        dir: usize,
        fluxes: &FaceArray,
        scale: f64,
    ) -> Result<(), FluxError> {
        let target = self.staged.dir_mut(dir);
        if target.faces() != fluxes.faces() || target.ncomp() != fluxes.ncomp() {
            return Err(FluxError::Shape(nova_core::ArrayError::ShapeMismatch {
                expected_cells: target.faces().num_cells(),
                expected_ncomp: target.ncomp(),
                found_cells: fluxes.faces().num_cells(),
                found_ncomp: fluxes.ncomp(),
            }));
        }
        for (d, s) in target.data_mut().iter_mut().zip(fluxes.data()) {
            *d += scale * s;
        }
        self.contributions += 1;
        Ok(())
    }

    /// Stage `scale * fluxes` for every direction.
    pub fn add_fluxes(&mut self, fluxes: &FaceFluxes, scale: f64) -> Result<(), FluxError> {
        self.staged.add_scaled(fluxes, scale)?;
        self.contributions += 1;
        Ok(())
    }

    /// Time-integrated fluxes staged so far.
    pub fn staged(&self) -> &FaceFluxes {
        &self.staged
    }

    /// Number of staging calls since the attempt began.
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    /// Drop the staged fluxes of a rejected attempt.
    pub fn discard(&mut self) {
        self.staged.clear();
        self.contributions = 0;
    }

    /// Move the staged fluxes of an accepted attempt into the registers.
    ///
    /// `as_coarse` is the register toward the finer level (this level
    /// writes its coarse side and extends the time the fine level must
    /// cover); `as_fine` the register toward the coarser level (this level
    /// writes its fine side and signals sub-step completion).
    pub fn commit(
        &mut self,
        as_coarse: Option<&mut FluxRegister>,
        as_fine: Option<&mut FluxRegister>,
    ) -> Result<(), FluxError> {
        if let Some(reg) = as_coarse {
            reg.crse_add(&self.staged, 1.0)?;
            reg.add_coarse_time(self.dt);
        }
        if let Some(reg) = as_fine {
            reg.fine_add(&self.staged, 1.0)?;
            let sent = reg.completion_sender().send(SubcycleComplete {
                level: self.level,
                substep: self.substep,
                dt: self.dt,
            });
            if !sent {
                log::warn!("level {} completion signal dropped", self.level);
            }
        }
        self.discard();
        Ok(())
    }
}
