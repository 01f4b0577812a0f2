//! Conservative restriction of fine data onto the coarser level.

use nova_core::StateArray;

use crate::coarse_fine::coarse_index;
use crate::error::GridError;

/// Replace every coarse cell covered by the fine patch with the mean of
/// its fine children. Cartesian cells have equal volumes, so the mean
/// preserves the volume integral of every component.
pub fn average_down(
    fine: &StateArray,
    coarse: &mut StateArray,
    ratio: i64,
) -> Result<(), GridError> {
    if fine.ncomp() != coarse.ncomp() {
        return Err(GridError::ComponentMismatch {
            fine: fine.ncomp(),
            coarse: coarse.ncomp(),
        });
    }
    let fine_valid = *fine.valid();
    let ndim = fine_valid.ndim();
    let covered = fine_valid.coarsen(ratio);
    if !coarse.valid().contains_box(&covered) {
        return Err(GridError::NotNested {
            reason: format!(
                "coarsened fine patch {:?}..{:?} leaves the coarse patch",
                covered.lo(),
                covered.hi()
            ),
        });
    }
    let nchild = (ratio as f64).powi(ndim as i32);
    let ncomp = coarse.ncomp();
    let mut sums = vec![0.0; covered.num_cells() * ncomp];
    for p in fine_valid.cells() {
        let c = coarse_index(p, ndim, ratio);
        let base = covered.offset(c) * ncomp;
        for (s, v) in sums[base..base + ncomp].iter_mut().zip(fine.cell(p)) {
            *s += v;
        }
    }
    for (i, c) in covered.cells().enumerate() {
        let src = &sums[i * ncomp..(i + 1) * ncomp];
        for (dst, s) in coarse.cell_mut(c).iter_mut().zip(src) {
            *dst = s / nchild;
        }
    }
    Ok(())
}
