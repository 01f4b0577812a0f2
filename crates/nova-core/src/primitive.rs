//! Primitive-variable layout.

use std::ops::Range;

use crate::id::Direction;
use crate::schema::StateSchema;

/// Offsets into a primitive-variable array.
///
/// Order: density, x/y/z velocity, pressure, internal energy density,
/// temperature, sound speed, adiabatic index, then specific advected
/// scalars, species mass fractions, and specific auxiliary scalars.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveLayout {
    nadv: usize,
    nspec: usize,
    naux: usize,
}

const QRHO: usize = 0;
const QU: usize = 1;
const QPRES: usize = 4;
const QREINT: usize = 5;
const QTEMP: usize = 6;
const QC: usize = 7;
const QGAME: usize = 8;
const QFIXED: usize = 9;

impl PrimitiveLayout {
    /// Layout matching the scalars declared in `schema`.
    pub fn from_schema(schema: &StateSchema) -> Self {
        Self {
            nadv: schema.advected().len(),
            nspec: schema.nspec(),
            naux: schema.aux().len(),
        }
    }

    /// Number of primitive components.
    pub fn nq(&self) -> usize {
        QFIXED + self.nadv + self.nspec + self.naux
    }

    /// Density.
    pub fn density(&self) -> usize {
        QRHO
    }

    /// Velocity along `dir`.
    pub fn velocity(&self, dir: Direction) -> usize {
        QU + dir.index()
    }

    /// Pressure.
    pub fn pressure(&self) -> usize {
        QPRES
    }

    /// Internal energy density `rho * e`.
    pub fn rho_eint(&self) -> usize {
        QREINT
    }

    /// Temperature.
    pub fn temperature(&self) -> usize {
        QTEMP
    }

    /// Sound speed.
    pub fn sound_speed(&self) -> usize {
        QC
    }

    /// Effective adiabatic index `p / (rho e) + 1`.
    pub fn gamma(&self) -> usize {
        QGAME
    }

    /// Specific advected scalars.
    pub fn advected(&self) -> Range<usize> {
        QFIXED..QFIXED + self.nadv
    }

    /// Species mass fractions.
    pub fn mass_fractions(&self) -> Range<usize> {
        let start = self.advected().end;
        start..start + self.nspec
    }

    /// Specific auxiliary scalars.
    pub fn aux(&self) -> Range<usize> {
        let start = self.mass_fractions().end;
        start..start + self.naux
    }
}
