//! Cell- and face-centered level data.

use smallvec::SmallVec;

use crate::error::ArrayError;
use crate::geometry::{GridBox, IntVect};

/// Multi-component cell-centered data over a patch and its ghost cells.
///
/// Storage is cell-major: the `ncomp` values of one cell are contiguous,
/// so per-cell kernels can iterate with `chunks_mut(ncomp)`. Cells are
/// ordered x-fastest over [`region`](Self::region).
#[derive(Clone, Debug, PartialEq)]
pub struct StateArray {
    valid: GridBox,
    region: GridBox,
    nghost: usize,
    ncomp: usize,
    data: Vec<f64>,
}

impl StateArray {
    /// Allocate a zero-filled array over `valid` grown by `nghost`.
    pub fn new(valid: GridBox, nghost: usize, ncomp: usize) -> Self {
        let region = valid.grow(nghost);
        Self {
            valid,
            region,
            nghost,
            ncomp,
            data: vec![0.0; region.num_cells() * ncomp],
        }
    }

    /// Allocate a zero-filled array with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.valid, self.nghost, self.ncomp)
    }

    /// The valid (non-ghost) box.
    pub fn valid(&self) -> &GridBox {
        &self.valid
    }

    /// The allocated box: valid grown by the ghost width.
    pub fn region(&self) -> &GridBox {
        &self.region
    }

    /// Ghost width.
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// Components per cell.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Whether `other` has identical boxes and component count.
    pub fn same_shape(&self, other: &StateArray) -> bool {
        self.region == other.region && self.valid == other.valid && self.ncomp == other.ncomp
    }

    /// Return an error unless `other` has the same shape.
    pub fn check_shape(&self, other: &StateArray) -> Result<(), ArrayError> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(ArrayError::ShapeMismatch {
                expected_cells: self.region.num_cells(),
                expected_ncomp: self.ncomp,
                found_cells: other.region.num_cells(),
                found_ncomp: other.ncomp,
            })
        }
    }

    /// Value of `comp` at `p`. `p` must lie inside the region.
    pub fn get(&self, p: IntVect, comp: usize) -> f64 {
        self.data[self.region.offset(p) * self.ncomp + comp]
    }

    /// Set `comp` at `p`. `p` must lie inside the region.
    pub fn set(&mut self, p: IntVect, comp: usize, value: f64) {
        let i = self.region.offset(p) * self.ncomp + comp;
        self.data[i] = value;
    }

    /// All components of the cell at `p`.
    pub fn cell(&self, p: IntVect) -> &[f64] {
        let start = self.region.offset(p) * self.ncomp;
        &self.data[start..start + self.ncomp]
    }

    /// Mutable components of the cell at `p`.
    pub fn cell_mut(&mut self, p: IntVect) -> &mut [f64] {
        let start = self.region.offset(p) * self.ncomp;
        &mut self.data[start..start + self.ncomp]
    }

    /// Raw cell-major storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw cell-major storage.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Set every value (ghosts included) to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Overwrite with the contents of `other`, which must have the same shape.
    pub fn copy_from(&mut self, other: &StateArray) -> Result<(), ArrayError> {
        self.check_shape(other)?;
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// `self += scale * other` on cells inside `valid.grow(ng)`.
    pub fn add_scaled(
        &mut self,
        other: &StateArray,
        scale: f64,
        ng: usize,
    ) -> Result<(), ArrayError> {
        self.check_shape(other)?;
        let target = self.valid.grow(ng.min(self.nghost));
        let nc = self.ncomp;
        for (i, (dst, src)) in self
            .data
            .chunks_mut(nc)
            .zip(other.data.chunks(nc))
            .enumerate()
        {
            if target.contains(self.region.point(i)) {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += scale * s;
                }
            }
        }
        Ok(())
    }

    /// Sum of `comp` over valid cells.
    pub fn sum_valid(&self, comp: usize) -> f64 {
        self.valid.cells().map(|p| self.get(p, comp)).sum()
    }

    /// Maximum `|comp|` over valid cells.
    pub fn max_abs_valid(&self, comp: usize) -> f64 {
        self.valid
            .cells()
            .map(|p| self.get(p, comp).abs())
            .fold(0.0, f64::max)
    }

    /// First valid cell holding a non-finite value, if any.
    pub fn first_non_finite(&self) -> Option<IntVect> {
        self.valid
            .cells()
            .find(|&p| self.cell(p).iter().any(|v| !v.is_finite()))
    }
}

/// Single-direction face-centered data.
///
/// Face `i` along `dir` separates cells `i - 1` and `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceArray {
    dir: usize,
    faces: GridBox,
    ncomp: usize,
    data: Vec<f64>,
}

impl FaceArray {
    /// Allocate zero-filled faces normal to `dir` for the cells of `cells`.
    pub fn new(cells: GridBox, dir: usize, ncomp: usize) -> Self {
        let faces = cells.faces(dir);
        Self {
            dir,
            faces,
            ncomp,
            data: vec![0.0; faces.num_cells() * ncomp],
        }
    }

    /// Normal direction.
    pub fn dir(&self) -> usize {
        self.dir
    }

    /// The box of face indices.
    pub fn faces(&self) -> &GridBox {
        &self.faces
    }

    /// Components per face.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Value of `comp` at face `p`.
    pub fn get(&self, p: IntVect, comp: usize) -> f64 {
        self.data[self.faces.offset(p) * self.ncomp + comp]
    }

    /// Set `comp` at face `p`.
    pub fn set(&mut self, p: IntVect, comp: usize, value: f64) {
        let i = self.faces.offset(p) * self.ncomp + comp;
        self.data[i] = value;
    }

    /// All components of face `p`.
    pub fn face(&self, p: IntVect) -> &[f64] {
        let start = self.faces.offset(p) * self.ncomp;
        &self.data[start..start + self.ncomp]
    }

    /// Mutable components of face `p`.
    pub fn face_mut(&mut self, p: IntVect) -> &mut [f64] {
        let start = self.faces.offset(p) * self.ncomp;
        &mut self.data[start..start + self.ncomp]
    }

    /// Raw face-major storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw storage.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Face-centered fluxes in every active direction.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceFluxes {
    cells: GridBox,
    ncomp: usize,
    dirs: SmallVec<[FaceArray; 3]>,
}

impl FaceFluxes {
    /// Allocate zero fluxes for the faces of `cells`.
    pub fn new(cells: GridBox, ncomp: usize) -> Self {
        let dirs = (0..cells.ndim())
            .map(|d| FaceArray::new(cells, d, ncomp))
            .collect();
        Self { cells, ncomp, dirs }
    }

    /// The cell box these faces bound.
    pub fn cells(&self) -> &GridBox {
        &self.cells
    }

    /// Components per face.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Number of stored directions (the dimensionality).
    pub fn ndir(&self) -> usize {
        self.dirs.len()
    }

    /// Faces normal to `d`.
    pub fn dir(&self, d: usize) -> &FaceArray {
        &self.dirs[d]
    }

    /// Mutable faces normal to `d`.
    pub fn dir_mut(&mut self, d: usize) -> &mut FaceArray {
        &mut self.dirs[d]
    }

    /// Zero every face.
    pub fn clear(&mut self) {
        for fa in &mut self.dirs {
            fa.data.fill(0.0);
        }
    }

    /// `self += scale * other`.
    pub fn add_scaled(&mut self, other: &FaceFluxes, scale: f64) -> Result<(), ArrayError> {
        if self.cells != other.cells || self.ncomp != other.ncomp {
            return Err(ArrayError::ShapeMismatch {
                expected_cells: self.cells.num_cells(),
                expected_ncomp: self.ncomp,
                found_cells: other.cells.num_cells(),
                found_ncomp: other.ncomp,
            });
        }
        for (dst, src) in self.dirs.iter_mut().zip(&other.dirs) {
            for (d, s) in dst.data.iter_mut().zip(&src.data) {
                *d += scale * s;
            }
        }
        Ok(())
    }

    /// Conservative divergence of component `comp` at cell `p`, given the
    /// cell spacing.
    pub fn divergence(&self, p: IntVect, comp: usize, dx: [f64; 3]) -> f64 {
        let mut div = 0.0;
        for (d, fa) in self.dirs.iter().enumerate() {
            let mut hi = p;
            hi[d] += 1;
            div += (fa.get(hi, comp) - fa.get(p, comp)) / dx[d];
        }
        div
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_major_layout() {
        let mut a = StateArray::new(GridBox::with_size(1, [3, 1, 1]), 1, 2);
        assert_eq!(a.region().num_cells(), 5);
        a.set([-1, 0, 0], 1, 7.0);
        assert_eq!(a.data()[1], 7.0);
        a.cell_mut([0, 0, 0])[0] = 3.0;
        assert_eq!(a.get([0, 0, 0], 0), 3.0);
    }

    #[test]
    fn add_scaled_respects_grow_width() {
        let valid = GridBox::with_size(1, [2, 1, 1]);
        let mut a = StateArray::new(valid, 2, 1);
        let mut b = a.zeros_like();
        b.fill(1.0);
        a.add_scaled(&b, 2.0, 1).unwrap();
        assert_eq!(a.get([-2, 0, 0], 0), 0.0);
        assert_eq!(a.get([-1, 0, 0], 0), 2.0);
        assert_eq!(a.get([2, 0, 0], 0), 2.0);
        assert_eq!(a.get([3, 0, 0], 0), 0.0);
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let valid = GridBox::with_size(1, [2, 1, 1]);
        let mut a = StateArray::new(valid, 0, 1);
        let b = StateArray::new(valid, 0, 2);
        assert!(matches!(
            a.copy_from(&b),
            Err(ArrayError::ShapeMismatch { found_ncomp: 2, .. })
        ));
    }

    #[test]
    fn divergence_of_linear_flux() {
        let cells = GridBox::with_size(2, [2, 2, 1]);
        let mut f = FaceFluxes::new(cells, 1);
        let faces = *f.dir(0).faces();
        for p in faces.cells() {
            f.dir_mut(0).set(p, 0, p[0] as f64);
        }
        assert_eq!(f.divergence([0, 1, 0], 0, [0.5, 1.0, 1.0]), 2.0);
    }

    #[test]
    fn first_non_finite_scans_valid_cells_only() {
        let mut a = StateArray::new(GridBox::with_size(1, [2, 1, 1]), 1, 1);
        a.set([-1, 0, 0], 0, f64::NAN);
        assert_eq!(a.first_non_finite(), None);
        a.set([1, 0, 0], 0, f64::INFINITY);
        assert_eq!(a.first_non_finite(), Some([1, 0, 0]));
    }
}
