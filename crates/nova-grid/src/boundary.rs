//! Physical-boundary ghost fill.

use smallvec::SmallVec;

use nova_core::{
    BcCode, BoundaryKind, Direction, FillError, GhostFill, IntVect, LevelGeometry, Side,
    StateArray, StateSchema,
};

/// Where a ghost cell takes its value from after applying the domain
/// boundary conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Image {
    /// Source cell, inside the domain.
    pub point: IntVect,
    /// Directions in which the source was mirrored.
    pub flips: [bool; 3],
}

/// Map a cell index to its in-domain image under the level's boundaries.
///
/// Cells already inside the domain map to themselves.
pub fn image(geom: &LevelGeometry, p: IntVect) -> Image {
    let mut point = p;
    let mut flips = [false; 3];
    let dom = geom.domain();
    for dir in Direction::active(geom.ndim()) {
        let d = dir.index();
        let (lo, hi) = (dom.lo()[d], dom.hi()[d]);
        let n = hi - lo + 1;
        let side = if p[d] < lo {
            Side::Lo
        } else if p[d] > hi {
            Side::Hi
        } else {
            continue;
        };
        point[d] = match geom.boundary(dir, side) {
            BoundaryKind::Periodic => lo + (p[d] - lo).rem_euclid(n),
            BoundaryKind::Outflow => match side {
                Side::Lo => lo,
                Side::Hi => hi,
            },
            BoundaryKind::Reflect => {
                flips[d] = true;
                let mirrored = match side {
                    Side::Lo => 2 * lo - 1 - p[d],
                    Side::Hi => 2 * hi + 1 - p[d],
                };
                mirrored.clamp(lo, hi)
            }
        };
    }
    Image { point, flips }
}

/// Boundary codes for scalar diffusion solves on this level.
pub fn bc_codes(geom: &LevelGeometry) -> [[BcCode; 2]; 3] {
    let mut bc = [[BcCode::Neumann; 2]; 3];
    for dir in Direction::active(geom.ndim()) {
        for side in Side::BOTH {
            bc[dir.index()][side.index()] = match geom.boundary(dir, side) {
                BoundaryKind::Periodic => BcCode::Periodic,
                BoundaryKind::Outflow | BoundaryKind::Reflect => BcCode::Neumann,
            };
        }
    }
    bc
}

/// Fills ghost cells whose image lies in the valid box: periodic wrap,
/// zero-gradient outflow, and reflecting walls.
///
/// Ghost cells whose image falls outside the patch (fine-level ghosts
/// inside the domain) are left untouched; see
/// [`CoarseFineFill`](crate::CoarseFineFill).
#[derive(Clone, Debug, Default)]
pub struct PhysicalBoundaryFill {
    odd: [SmallVec<[usize; 4]>; 3],
}

impl PhysicalBoundaryFill {
    /// Fill for scalar fields: every component is mirrored evenly.
    pub fn scalar() -> Self {
        Self::default()
    }

    /// Fill for conserved state: the momentum normal to a reflecting wall
    /// changes sign.
    pub fn for_schema(schema: &StateSchema) -> Self {
        let mut fill = Self::default();
        for dir in Direction::ALL {
            fill.odd[dir.index()].push(schema.momentum(dir));
        }
        fill
    }

    /// Sign applied to `comp` when copied from a mirrored image.
    pub fn sign(&self, comp: usize, flips: [bool; 3]) -> f64 {
        let mut s = 1.0;
        for (d, flipped) in flips.iter().enumerate() {
            if *flipped && self.odd[d].contains(&comp) {
                s = -s;
            }
        }
        s
    }

    /// Fill ghosts with in-patch images. Returns the ghost cells left unfilled.
    pub fn fill_physical(
        &self,
        state: &mut StateArray,
        geom: &LevelGeometry,
    ) -> Vec<(IntVect, Image)> {
        let valid = *state.valid();
        let region = *state.region();
        let ncomp = state.ncomp();
        let mut unfilled = Vec::new();
        for p in region.cells() {
            if valid.contains(p) {
                continue;
            }
            let img = image(geom, p);
            if valid.contains(img.point) {
                for c in 0..ncomp {
                    let v = self.sign(c, img.flips) * state.get(img.point, c);
                    state.set(p, c, v);
                }
            } else {
                unfilled.push((p, img));
            }
        }
        unfilled
    }
}

impl GhostFill for PhysicalBoundaryFill {
    fn fill_patch(
        &self,
        state: &mut StateArray,
        geom: &LevelGeometry,
        _time: f64,
    ) -> Result<(), FillError> {
        let unfilled = self.fill_physical(state, geom);
        if let Some((p, _)) = unfilled.first() {
            return Err(FillError::Failed {
                reason: format!(
                    "{} ghost cells (first {p:?}) need coarse data; use CoarseFineFill",
                    unfilled.len()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::GridBox;

    fn line(kind: BoundaryKind) -> LevelGeometry {
        let mut bc = [[BoundaryKind::Periodic; 2]; 3];
        bc[0] = [kind; 2];
        LevelGeometry::single_patch(GridBox::with_size(1, [4, 1, 1]), [1.0; 3], bc).unwrap()
    }

    #[test]
    fn periodic_image_wraps() {
        let g = line(BoundaryKind::Periodic);
        assert_eq!(image(&g, [-1, 0, 0]).point, [3, 0, 0]);
        assert_eq!(image(&g, [5, 0, 0]).point, [1, 0, 0]);
    }

    #[test]
    fn reflect_image_mirrors_and_flips() {
        let g = line(BoundaryKind::Reflect);
        let img = image(&g, [-2, 0, 0]);
        assert_eq!(img.point, [1, 0, 0]);
        assert!(img.flips[0]);
        assert_eq!(image(&g, [4, 0, 0]).point, [3, 0, 0]);
    }

    #[test]
    fn reflect_negates_normal_momentum() {
        let schema = StateSchema::builder().ndim(1).build().unwrap();
        let g = line(BoundaryKind::Reflect);
        let mut s = StateArray::new(*g.valid(), 2, schema.ncomp());
        s.set([0, 0, 0], 0, 2.0);
        s.set([0, 0, 0], schema.momentum(Direction::X), 1.5);
        s.set([0, 0, 0], schema.momentum(Direction::Y), 0.5);
        PhysicalBoundaryFill::for_schema(&schema)
            .fill_patch(&mut s, &g, 0.0)
            .unwrap();
        assert_eq!(s.get([-1, 0, 0], 0), 2.0);
        assert_eq!(s.get([-1, 0, 0], 1), -1.5);
        assert_eq!(s.get([-1, 0, 0], 2), 0.5);
    }

    #[test]
    fn outflow_copies_edge_cell() {
        let g = line(BoundaryKind::Outflow);
        let mut s = StateArray::new(*g.valid(), 2, 1);
        s.set([3, 0, 0], 0, 9.0);
        PhysicalBoundaryFill::scalar().fill_patch(&mut s, &g, 0.0).unwrap();
        assert_eq!(s.get([5, 0, 0], 0), 9.0);
        assert_eq!(bc_codes(&g)[0], [BcCode::Neumann; 2]);
    }

    #[test]
    fn interior_ghosts_are_reported() {
        let coarse = line(BoundaryKind::Periodic);
        let fine = coarse.refine(GridBox::new(1, [2, 0, 0], [5, 0, 0]), 2).unwrap();
        let mut s = StateArray::new(*fine.valid(), 1, 1);
        let unfilled = PhysicalBoundaryFill::scalar().fill_physical(&mut s, &fine);
        assert_eq!(unfilled.len(), 2);
        assert!(PhysicalBoundaryFill::scalar()
            .fill_patch(&mut s, &fine, 0.0)
            .is_err());
    }
}
