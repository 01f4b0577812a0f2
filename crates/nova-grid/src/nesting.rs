//! Proper-nesting checks between adjacent levels.

use nova_core::{Direction, LevelGeometry};

use crate::error::GridError;

/// Check that `fine` can be advanced under `coarse` with the given ratio.
///
/// The fine patch must start and end on coarse cell boundaries, and the
/// coarsened patch grown by one cell (wrapped across periodic edges,
/// clipped at physical ones) must lie inside the coarse patch. The
/// one-cell buffer guarantees every coarse cell touched by a reflux
/// correction is a valid coarse cell.
pub fn check_nesting(
    coarse: &LevelGeometry,
    fine: &LevelGeometry,
    ratio: i64,
) -> Result<(), GridError> {
    let fv = fine.valid();
    for d in 0..fv.ndim() {
        if fv.lo()[d].rem_euclid(ratio) != 0 || (fv.hi()[d] + 1).rem_euclid(ratio) != 0 {
            return Err(GridError::Misaligned {
                ratio,
                lo: fv.lo(),
                hi: fv.hi(),
            });
        }
    }
    if fine.level().coarser() != Some(coarse.level()) {
        return Err(GridError::NotNested {
            reason: format!(
                "level {} is not the parent of level {}",
                coarse.level(),
                fine.level()
            ),
        });
    }
    let buffered = fv.coarsen(ratio).grow(1);
    let dom = coarse.domain();
    for p in buffered.cells() {
        let mut q = coarse.wrap_periodic(p);
        let mut outside_domain = false;
        for dir in Direction::active(coarse.ndim()) {
            let d = dir.index();
            if !coarse.is_periodic(dir) && (q[d] < dom.lo()[d] || q[d] > dom.hi()[d]) {
                outside_domain = true;
            }
            q[d] = q[d].clamp(dom.lo()[d], dom.hi()[d]);
        }
        if !outside_domain && !coarse.valid().contains(q) {
            return Err(GridError::NotNested {
                reason: format!(
                    "coarse cell {q:?} adjacent to level {} is not covered by level {}",
                    fine.level(),
                    coarse.level()
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{BoundaryKind, GridBox};

    fn base() -> LevelGeometry {
        LevelGeometry::single_patch(
            GridBox::with_size(1, [8, 1, 1]),
            [1.0; 3],
            [[BoundaryKind::Outflow; 2]; 3],
        )
        .unwrap()
    }

    #[test]
    fn accepts_aligned_patch() {
        let c = base();
        let f = c.refine(GridBox::new(1, [4, 0, 0], [11, 0, 0]), 2).unwrap();
        assert!(check_nesting(&c, &f, 2).is_ok());
        let edge = c.refine(GridBox::new(1, [0, 0, 0], [3, 0, 0]), 2).unwrap();
        assert!(check_nesting(&c, &edge, 2).is_ok());
    }

    #[test]
    fn rejects_misaligned_patch() {
        let c = base();
        let f = c.refine(GridBox::new(1, [3, 0, 0], [10, 0, 0]), 2).unwrap();
        assert!(matches!(
            check_nesting(&c, &f, 2),
            Err(GridError::Misaligned { .. })
        ));
    }

    #[test]
    fn rejects_patch_without_buffer() {
        let c0 = base();
        let f1 = c0.refine(GridBox::new(1, [4, 0, 0], [7, 0, 0]), 2).unwrap();
        let f2 = f1.refine(GridBox::new(1, [8, 0, 0], [15, 0, 0]), 2).unwrap();
        assert!(matches!(
            check_nesting(&f1, &f2, 2),
            Err(GridError::NotNested { .. })
        ));
    }
}
