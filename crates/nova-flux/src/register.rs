//! Coarse-fine flux registers and reflux.

use nova_core::{
    ArrayError, Direction, FaceFluxes, GridBox, IntVect, LevelGeometry, LevelId, Side, StateArray,
};

use crate::completion::{CompletionSender, CompletionTracker};
use crate::error::FluxError;

/// Relative slack allowed between covered fine time and the coarse step.
const TIME_TOLERANCE: f64 = 1e-10;

/// Face buffers on one side of the fine patch, in coarse face indices.
#[derive(Clone, Debug)]
struct RegisterFace {
    dir: usize,
    side: Side,
    /// Coarse faces, one index thick along `dir`.
    faces: GridBox,
    /// `sum F_c A_c dt_c` per face and component.
    crse: Vec<f64>,
    /// `sum F_f A_f dt_f` per face and component.
    fine: Vec<f64>,
}

/// Mismatch between coarse and fine fluxes across the boundary of one
/// fine patch.
///
/// Written on the coarse side by the coarse level ([`crse_init`],
/// [`crse_add`]) and on the fine side by the fine level ([`fine_add`]);
/// reconciled by the coarse level's [`reflux`] once every fine sub-step
/// has signalled completion.
///
/// [`crse_init`]: FluxRegister::crse_init
/// [`crse_add`]: FluxRegister::crse_add
/// [`fine_add`]: FluxRegister::fine_add
/// [`reflux`]: FluxRegister::reflux
#[derive(Debug)]
pub struct FluxRegister {
    fine_level: LevelId,
    ratio: i64,
    ncomp: usize,
    coarse: LevelGeometry,
    fine_area: [f64; 3],
    /// The fine patch in coarse indices.
    covered: GridBox,
    fine_valid: GridBox,
    entries: Vec<RegisterFace>,
    completion: CompletionTracker,
}

impl FluxRegister {
    /// Register between `coarse` and its child `fine`.
    pub fn new(
        coarse: &LevelGeometry,
        fine: &LevelGeometry,
        ratio: i64,
        ncomp: usize,
    ) -> Result<Self, FluxError> {
        let fine_valid = *fine.valid();
        let ndim = coarse.ndim();
        let aligned = (0..ndim).all(|d| {
            fine_valid.lo()[d].rem_euclid(ratio) == 0
                && (fine_valid.hi()[d] + 1).rem_euclid(ratio) == 0
        });
        if ratio < 1 || !aligned {
            return Err(FluxError::Misaligned {
                ratio,
                lo: fine_valid.lo(),
                hi: fine_valid.hi(),
            });
        }
        let covered = fine_valid.coarsen(ratio);
        let mut entries = Vec::with_capacity(2 * ndim);
        for dir in Direction::active(ndim) {
            let d = dir.index();
            for side in Side::BOTH {
                let index = match side {
                    Side::Lo => covered.lo()[d],
                    Side::Hi => covered.hi()[d] + 1,
                };
                let faces = slab(&covered, d, index);
                let len = faces.num_cells() * ncomp;
                entries.push(RegisterFace {
                    dir: d,
                    side,
                    faces,
                    crse: vec![0.0; len],
                    fine: vec![0.0; len],
                });
            }
        }
        Ok(Self {
            fine_level: fine.level(),
            ratio,
            ncomp,
            coarse: coarse.clone(),
            fine_area: std::array::from_fn(|d| fine.face_area(d)),
            covered,
            fine_valid,
            entries,
            completion: CompletionTracker::new(),
        })
    }

    /// The fine level this register belongs to.
    pub fn fine_level(&self) -> LevelId {
        self.fine_level
    }

    /// The fine patch in coarse indices.
    pub fn covered(&self) -> &GridBox {
        &self.covered
    }

    /// Handle for posting fine sub-step completion.
    pub fn completion_sender(&self) -> CompletionSender {
        self.completion.sender()
    }

    /// Fine time posted so far in this coarse step.
    pub fn covered_time(&mut self) -> f64 {
        self.completion.drain();
        self.completion.covered()
    }

    /// Fine sub-steps posted so far in this coarse step.
    pub fn completed_substeps(&mut self) -> usize {
        self.completion.drain();
        self.completion.substeps()
    }

    /// Coarse time the register currently expects to be covered.
    pub fn expected_time(&self) -> f64 {
        self.completion.expected()
    }

    /// Zero every buffer and the completion tally. Called at the start of
    /// each coarse step.
    pub fn reset(&mut self) {
        for e in &mut self.entries {
            e.crse.fill(0.0);
            e.fine.fill(0.0);
        }
        self.completion.reset(0.0);
    }

    /// Extend the coarse time the fine level must cover.
    pub fn add_coarse_time(&mut self, dt: f64) {
        self.completion.add_expected(dt);
    }

    /// Overwrite the coarse side with `scale * F * A_c`.
    pub fn crse_init(&mut self, fluxes: &FaceFluxes, scale: f64) -> Result<(), FluxError> {
        for e in &mut self.entries {
            e.crse.fill(0.0);
        }
        self.crse_add(fluxes, scale)
    }

    /// Add `scale * F * A_c` to the coarse side.
    pub fn crse_add(&mut self, fluxes: &FaceFluxes, scale: f64) -> Result<(), FluxError> {
        self.check_ncomp(fluxes)?;
        let nc = self.ncomp;
        for e in &mut self.entries {
            let area = self.coarse.face_area(e.dir);
            let fa = fluxes.dir(e.dir);
            for (i, f) in e.faces.cells().enumerate() {
                for c in 0..nc {
                    e.crse[i * nc + c] += scale * area * fa.get(f, c);
                }
            }
        }
        Ok(())
    }

    /// Add `scale * F * A_f` of the fine faces on the patch boundary to
    /// the fine side.
    pub fn fine_add(&mut self, fluxes: &FaceFluxes, scale: f64) -> Result<(), FluxError> {
        self.check_ncomp(fluxes)?;
        let nc = self.ncomp;
        let ratio = self.ratio;
        for e in &mut self.entries {
            let d = e.dir;
            let index = match e.side {
                Side::Lo => self.fine_valid.lo()[d],
                Side::Hi => self.fine_valid.hi()[d] + 1,
            };
            let fine_faces = slab(&self.fine_valid, d, index);
            let area = self.fine_area[d];
            let fa = fluxes.dir(d);
            for f in fine_faces.cells() {
                let cf: IntVect = std::array::from_fn(|k| f[k].div_euclid(ratio));
                let i = e.faces.offset(cf);
                for c in 0..nc {
                    e.fine[i * nc + c] += scale * area * fa.get(f, c);
                }
            }
        }
        Ok(())
    }

    /// Replace the coarse fluxes around the fine patch by the fine ones:
    /// the coarse cell outside a low face gets `-(fine - crse) / V_c`, the
    /// cell outside a high face `+(fine - crse) / V_c`. Clears the
    /// register. Returns the number of corrected cells.
    pub fn reflux(&mut self, state: &mut StateArray) -> Result<usize, FluxError> {
        self.completion.drain();
        let (covered, expected) = (self.completion.covered(), self.completion.expected());
        let slack = TIME_TOLERANCE * expected.abs().max(f64::MIN_POSITIVE);
        if covered < expected - slack {
            return Err(FluxError::Premature {
                level: self.fine_level,
                covered,
                expected,
            });
        }
        if covered > expected + slack {
            return Err(FluxError::Overrun {
                level: self.fine_level,
                covered,
                expected,
            });
        }
        if state.ncomp() != self.ncomp {
            return Err(FluxError::Shape(ArrayError::ShapeMismatch {
                expected_cells: state.valid().num_cells(),
                expected_ncomp: self.ncomp,
                found_cells: state.valid().num_cells(),
                found_ncomp: state.ncomp(),
            }));
        }
        let volume = self.coarse.cell_volume();
        let nc = self.ncomp;
        let mut corrected = 0;
        for e in &self.entries {
            let (sign, shift) = match e.side {
                Side::Lo => (-1.0, -1),
                Side::Hi => (1.0, 0),
            };
            for (i, f) in e.faces.cells().enumerate() {
                let mut cell = f;
                cell[e.dir] += shift;
                let Some(cell) = self.outside_cell(cell) else {
                    continue;
                };
                if !state.valid().contains(cell) {
                    return Err(FluxError::OutsideCoarse { cell });
                }
                let values = state.cell_mut(cell);
                for c in 0..nc {
                    values[c] += sign * (e.fine[i * nc + c] - e.crse[i * nc + c]) / volume;
                }
                corrected += 1;
            }
        }
        log::debug!(
            "reflux level {} -> {}: {corrected} coarse cells corrected",
            self.fine_level,
            self.coarse.level()
        );
        self.reset();
        Ok(corrected)
    }

    /// The coarse cell a correction lands in, or `None` when it lies
    /// beyond a physical boundary or back under the fine patch.
    fn outside_cell(&self, cell: IntVect) -> Option<IntVect> {
        let cell = self.coarse.wrap_periodic(cell);
        if !self.coarse.domain().contains(cell) || self.covered.contains(cell) {
            return None;
        }
        Some(cell)
    }

    fn check_ncomp(&self, fluxes: &FaceFluxes) -> Result<(), FluxError> {
        if fluxes.ncomp() != self.ncomp {
            return Err(FluxError::Shape(ArrayError::ShapeMismatch {
                expected_cells: fluxes.cells().num_cells(),
                expected_ncomp: self.ncomp,
                found_cells: fluxes.cells().num_cells(),
                found_ncomp: fluxes.ncomp(),
            }));
        }
        Ok(())
    }

    /// Sum of `fine - crse` over every face, per component. Zero when the
    /// coarse and fine levels transported the same amount.
    pub fn mismatch(&self) -> Vec<f64> {
        let nc = self.ncomp;
        let mut total = vec![0.0; nc];
        for e in &self.entries {
            for (i, (f, c)) in e.fine.iter().zip(&e.crse).enumerate() {
                total[i % nc] += f - c;
            }
        }
        total
    }
}

/// `b`'s extent with direction `d` pinned to `index`.
fn slab(b: &GridBox, d: usize, index: i64) -> GridBox {
    let (mut lo, mut hi) = (b.lo(), b.hi());
    lo[d] = index;
    hi[d] = index;
    GridBox::new(b.ndim(), lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::SubcycleComplete;
    use nova_core::BoundaryKind;

    fn levels(boundary: BoundaryKind, fine_lo: i64, fine_hi: i64) -> (LevelGeometry, LevelGeometry) {
        let coarse = LevelGeometry::single_patch(
            GridBox::with_size(1, [8, 1, 1]),
            [1.0 / 8.0; 3],
            [[boundary; 2]; 3],
        )
        .unwrap();
        let fine = coarse
            .refine(GridBox::new(1, [fine_lo, 0, 0], [fine_hi, 0, 0]), 2)
            .unwrap();
        (coarse, fine)
    }

    fn uniform_fluxes(cells: GridBox, value: f64) -> FaceFluxes {
        let mut f = FaceFluxes::new(cells, 1);
        f.dir_mut(0).data_mut().fill(value);
        f
    }

    fn complete(reg: &FluxRegister, substep: usize, dt: f64) {
        assert!(reg.completion_sender().send(SubcycleComplete {
            level: reg.fine_level(),
            substep,
            dt,
        }));
    }

    #[test]
    fn reflux_corrects_neighbors_of_fine_patch() {
        let (coarse, fine) = levels(BoundaryKind::Outflow, 4, 11);
        let mut reg = FluxRegister::new(&coarse, &fine, 2, 1).unwrap();
        reg.crse_init(&uniform_fluxes(*coarse.valid(), 1.0), 0.1).unwrap();
        reg.add_coarse_time(0.1);
        for substep in 0..2 {
            reg.fine_add(&uniform_fluxes(*fine.valid(), 2.0), 0.05).unwrap();
            complete(&reg, substep, 0.05);
        }
        let mut state = StateArray::new(*coarse.valid(), 0, 1);
        let n = reg.reflux(&mut state).unwrap();
        assert_eq!(n, 2);
        assert!((state.get([1, 0, 0], 0) + 0.8).abs() < 1e-12);
        assert!((state.get([6, 0, 0], 0) - 0.8).abs() < 1e-12);
        assert_eq!(state.get([3, 0, 0], 0), 0.0);
        // Consumed.
        assert!(reg.mismatch().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn reflux_before_completion_is_rejected() {
        let (coarse, fine) = levels(BoundaryKind::Outflow, 4, 11);
        let mut reg = FluxRegister::new(&coarse, &fine, 2, 1).unwrap();
        reg.add_coarse_time(0.1);
        complete(&reg, 0, 0.05);
        let mut state = StateArray::new(*coarse.valid(), 0, 1);
        match reg.reflux(&mut state) {
            Err(FluxError::Premature { covered, expected, .. }) => {
                assert_eq!(covered, 0.05);
                assert_eq!(expected, 0.1);
            }
            other => panic!("expected Premature, got {other:?}"),
        }
        complete(&reg, 1, 0.05);
        assert!(reg.reflux(&mut state).is_ok());
    }

    #[test]
    fn periodic_neighbor_wraps() {
        let (coarse, fine) = levels(BoundaryKind::Periodic, 0, 7);
        let mut reg = FluxRegister::new(&coarse, &fine, 2, 1).unwrap();
        reg.add_coarse_time(0.1);
        reg.fine_add(&uniform_fluxes(*fine.valid(), 1.0), 0.1).unwrap();
        complete(&reg, 0, 0.1);
        let mut state = StateArray::new(*coarse.valid(), 0, 1);
        reg.reflux(&mut state).unwrap();
        assert!(state.get([7, 0, 0], 0) < 0.0);
        assert!(state.get([4, 0, 0], 0) > 0.0);
    }

    #[test]
    fn physical_boundary_faces_are_skipped() {
        let (coarse, fine) = levels(BoundaryKind::Outflow, 0, 7);
        let mut reg = FluxRegister::new(&coarse, &fine, 2, 1).unwrap();
        reg.add_coarse_time(0.1);
        reg.fine_add(&uniform_fluxes(*fine.valid(), 1.0), 0.1).unwrap();
        complete(&reg, 0, 0.1);
        let mut state = StateArray::new(*coarse.valid(), 0, 1);
        assert_eq!(reg.reflux(&mut state).unwrap(), 1);
    }

    #[test]
    fn misaligned_patch_rejected() {
        let coarse = LevelGeometry::single_patch(
            GridBox::with_size(1, [8, 1, 1]),
            [1.0 / 8.0; 3],
            [[BoundaryKind::Outflow; 2]; 3],
        )
        .unwrap();
        let fine = coarse
            .refine(GridBox::new(1, [3, 0, 0], [6, 0, 0]), 2)
            .unwrap();
        assert!(matches!(
            FluxRegister::new(&coarse, &fine, 2, 1),
            Err(FluxError::Misaligned { .. })
        ));
    }
}
