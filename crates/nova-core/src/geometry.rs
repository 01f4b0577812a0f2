//! Index boxes and per-level geometry.

use crate::error::GeometryError;
use crate::id::{Direction, LevelId, Side};

/// A cell-index point. Components beyond the box dimensionality are 0.
pub type IntVect = [i64; 3];

/// An axis-aligned box of cell indices with inclusive bounds.
///
/// Directions at or beyond `ndim` are degenerate (`lo == hi == 0`) and
/// are never grown, coarsened, or refined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridBox {
    ndim: usize,
    lo: IntVect,
    hi: IntVect,
}

impl GridBox {
    /// Create a box from inclusive bounds. Inactive directions are forced
    /// to `0..=0`. A box with `hi < lo` in any direction is empty.
    pub fn new(ndim: usize, lo: IntVect, hi: IntVect) -> Self {
        let ndim = ndim.clamp(1, 3);
        let mut b = Self { ndim, lo, hi };
        for d in ndim..3 {
            b.lo[d] = 0;
            b.hi[d] = 0;
        }
        b
    }

    /// A box with its low corner at the origin and `size` cells per direction.
    pub fn with_size(ndim: usize, size: IntVect) -> Self {
        Self::new(ndim, [0; 3], [size[0] - 1, size[1] - 1, size[2] - 1])
    }

    /// Dimensionality.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Inclusive low corner.
    pub fn lo(&self) -> IntVect {
        self.lo
    }

    /// Inclusive high corner.
    pub fn hi(&self) -> IntVect {
        self.hi
    }

    /// Number of cells along `d`. Zero for an empty box.
    pub fn len(&self, d: usize) -> usize {
        (self.hi[d] - self.lo[d] + 1).max(0) as usize
    }

    /// Whether the box contains no cells.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|d| self.hi[d] < self.lo[d])
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.len(0) * self.len(1) * self.len(2)
    }

    /// Whether `p` lies inside the box.
    pub fn contains(&self, p: IntVect) -> bool {
        (0..3).all(|d| p[d] >= self.lo[d] && p[d] <= self.hi[d])
    }

    /// Whether `other` lies entirely inside the box.
    pub fn contains_box(&self, other: &GridBox) -> bool {
        other.is_empty() || (self.contains(other.lo) && self.contains(other.hi))
    }

    /// Grow every active direction by `n` cells on both sides.
    pub fn grow(&self, n: usize) -> GridBox {
        let n = n as i64;
        let mut b = *self;
        for d in 0..self.ndim {
            b.lo[d] -= n;
            b.hi[d] += n;
        }
        b
    }

    /// Grow a single direction by `n` cells on both sides.
    pub fn grow_dir(&self, d: usize, n: usize) -> GridBox {
        let mut b = *self;
        if d < self.ndim {
            b.lo[d] -= n as i64;
            b.hi[d] += n as i64;
        }
        b
    }

    /// Coarsen by `ratio`, rounding toward negative infinity.
    pub fn coarsen(&self, ratio: i64) -> GridBox {
        let mut b = *self;
        for d in 0..self.ndim {
            b.lo[d] = self.lo[d].div_euclid(ratio);
            b.hi[d] = self.hi[d].div_euclid(ratio);
        }
        b
    }

    /// Refine by `ratio`.
    pub fn refine(&self, ratio: i64) -> GridBox {
        let mut b = *self;
        for d in 0..self.ndim {
            b.lo[d] = self.lo[d] * ratio;
            b.hi[d] = (self.hi[d] + 1) * ratio - 1;
        }
        b
    }

    /// Intersection of two boxes, or `None` if they do not overlap.
    pub fn intersect(&self, other: &GridBox) -> Option<GridBox> {
        let mut b = *self;
        for d in 0..3 {
            b.lo[d] = self.lo[d].max(other.lo[d]);
            b.hi[d] = self.hi[d].min(other.hi[d]);
        }
        (!b.is_empty()).then_some(b)
    }

    /// The box of faces normal to `d`: one more index along `d`.
    pub fn faces(&self, d: usize) -> GridBox {
        let mut b = *self;
        if d < self.ndim {
            b.hi[d] += 1;
        }
        b
    }

    /// The one-cell-thick slab just outside the box on `side` of `d`.
    pub fn adjacent_slab(&self, d: usize, side: Side) -> GridBox {
        let mut b = *self;
        match side {
            Side::Lo => {
                b.lo[d] = self.lo[d] - 1;
                b.hi[d] = self.lo[d] - 1;
            }
            Side::Hi => {
                b.lo[d] = self.hi[d] + 1;
                b.hi[d] = self.hi[d] + 1;
            }
        }
        b
    }

    /// Linear offset of `p` within the box, x fastest.
    ///
    /// The caller must ensure `contains(p)`.
    pub fn offset(&self, p: IntVect) -> usize {
        let nx = self.len(0);
        let ny = self.len(1);
        let i = (p[0] - self.lo[0]) as usize;
        let j = (p[1] - self.lo[1]) as usize;
        let k = (p[2] - self.lo[2]) as usize;
        i + nx * (j + ny * k)
    }

    /// Inverse of [`offset`](Self::offset).
    pub fn point(&self, offset: usize) -> IntVect {
        let nx = self.len(0).max(1);
        let ny = self.len(1).max(1);
        let i = offset % nx;
        let j = (offset / nx) % ny;
        let k = offset / (nx * ny);
        [
            self.lo[0] + i as i64,
            self.lo[1] + j as i64,
            self.lo[2] + k as i64,
        ]
    }

    /// Iterate over every cell in linear (x-fastest) order.
    pub fn cells(&self) -> impl Iterator<Item = IntVect> + '_ {
        (0..self.num_cells()).map(move |i| self.point(i))
    }
}

/// Physical boundary treatment on one side of the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    /// Wrap around to the opposite side.
    Periodic,
    /// Zero-gradient extrapolation.
    Outflow,
    /// Mirror the interior and negate the normal momentum.
    Reflect,
}

/// Geometry of one refinement level: index space, spacing, boundaries.
///
/// Each level holds a single patch (`valid`) inside its `domain`.
/// Coordinates are Cartesian.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGeometry {
    level: LevelId,
    domain: GridBox,
    valid: GridBox,
    dx: [f64; 3],
    prob_lo: [f64; 3],
    boundary: [[BoundaryKind; 2]; 3],
}

impl LevelGeometry {
    /// Create a level geometry. `dx` entries for inactive directions are
    /// replaced by 1.
    pub fn new(
        level: LevelId,
        domain: GridBox,
        valid: GridBox,
        dx: [f64; 3],
        prob_lo: [f64; 3],
        boundary: [[BoundaryKind; 2]; 3],
    ) -> Result<Self, GeometryError> {
        if domain.is_empty() || valid.is_empty() {
            return Err(GeometryError::EmptyBox);
        }
        if domain.ndim() != valid.ndim() {
            return Err(GeometryError::DimensionMismatch {
                expected: domain.ndim(),
                found: valid.ndim(),
            });
        }
        if !domain.contains_box(&valid) {
            return Err(GeometryError::NotContained {
                inner: valid,
                outer: domain,
            });
        }
        let ndim = domain.ndim();
        let mut dx = dx;
        for (d, h) in dx.iter_mut().enumerate() {
            if d >= ndim {
                *h = 1.0;
            } else if !h.is_finite() || *h <= 0.0 {
                return Err(GeometryError::InvalidSpacing { value: *h });
            }
        }
        for d in 0..ndim {
            let lo = boundary[d][0] == BoundaryKind::Periodic;
            let hi = boundary[d][1] == BoundaryKind::Periodic;
            if lo != hi {
                return Err(GeometryError::HalfPeriodic { dir: d });
            }
        }
        Ok(Self {
            level,
            domain,
            valid,
            dx,
            prob_lo,
            boundary,
        })
    }

    /// A single-level geometry whose patch covers the whole domain.
    pub fn single_patch(
        domain: GridBox,
        dx: [f64; 3],
        boundary: [[BoundaryKind; 2]; 3],
    ) -> Result<Self, GeometryError> {
        Self::new(LevelId(0), domain, domain, dx, [0.0; 3], boundary)
    }

    /// Geometry of a child level covering `fine_valid` (in child indices).
    pub fn refine(&self, fine_valid: GridBox, ratio: i64) -> Result<Self, GeometryError> {
        if ratio < 2 {
            return Err(GeometryError::InvalidRatio { ratio });
        }
        let ndim = self.ndim();
        let mut dx = self.dx;
        for h in dx.iter_mut().take(ndim) {
            *h /= ratio as f64;
        }
        Self::new(
            self.level.finer(),
            self.domain.refine(ratio),
            fine_valid,
            dx,
            self.prob_lo,
            self.boundary,
        )
    }

    /// Level this geometry belongs to.
    pub fn level(&self) -> LevelId {
        self.level
    }

    /// Dimensionality.
    pub fn ndim(&self) -> usize {
        self.domain.ndim()
    }

    /// Whole-domain index box at this level's resolution.
    pub fn domain(&self) -> &GridBox {
        &self.domain
    }

    /// The patch this level advances.
    pub fn valid(&self) -> &GridBox {
        &self.valid
    }

    /// Cell spacing.
    pub fn dx(&self) -> [f64; 3] {
        self.dx
    }

    /// Physical coordinate of the domain's low corner.
    pub fn prob_lo(&self) -> [f64; 3] {
        self.prob_lo
    }

    /// Boundary treatment for one side of `dir`.
    pub fn boundary(&self, dir: Direction, side: Side) -> BoundaryKind {
        self.boundary[dir.index()][side.index()]
    }

    /// All boundary kinds, indexed `[dir][side]`.
    pub fn boundaries(&self) -> [[BoundaryKind; 2]; 3] {
        self.boundary
    }

    /// Whether `dir` is periodic.
    pub fn is_periodic(&self, dir: Direction) -> bool {
        self.boundary[dir.index()][0] == BoundaryKind::Periodic
    }

    /// Physical position of a cell center. Inactive directions report 0.
    pub fn cell_center(&self, p: IntVect) -> [f64; 3] {
        let mut x = [0.0; 3];
        for (d, xd) in x.iter_mut().enumerate().take(self.ndim()) {
            *xd = self.prob_lo[d] + (p[d] as f64 + 0.5) * self.dx[d];
        }
        x
    }

    /// Cell volume.
    pub fn cell_volume(&self) -> f64 {
        self.dx[..self.ndim()].iter().product()
    }

    /// Area of a face normal to `d`.
    pub fn face_area(&self, d: usize) -> f64 {
        self.cell_volume() / self.dx[d]
    }

    /// Smallest spacing over active directions.
    pub fn min_dx(&self) -> f64 {
        self.dx[..self.ndim()]
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Map `p` into the domain along periodic directions.
    pub fn wrap_periodic(&self, p: IntVect) -> IntVect {
        let mut q = p;
        for d in Direction::active(self.ndim()) {
            let i = d.index();
            if self.is_periodic(d) {
                let n = self.domain.len(i) as i64;
                q[i] = self.domain.lo()[i] + (p[i] - self.domain.lo()[i]).rem_euclid(n);
            }
        }
        q
    }
}
