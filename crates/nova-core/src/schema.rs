//! Conserved-state component layout.
//!
//! [`StateSchema`] is computed once at setup and shared by reference with
//! every component that indexes into a [`StateArray`](crate::StateArray).

use std::ops::Range;

use crate::error::SchemaError;
use crate::id::Direction;

/// Offsets of every conserved component in a level state array.
///
/// Fixed layout: density, x/y/z momentum, total energy, internal energy,
/// temperature, then the optional hybrid (radial, angular, vertical)
/// momentum triple, advected scalars, species partial densities, and
/// auxiliary scalars. Momentum components exist for all three directions
/// regardless of dimensionality.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSchema {
    ndim: usize,
    hybrid: bool,
    nadv: usize,
    naux: usize,
    species: Vec<String>,
}

const DENSITY: usize = 0;
const XMOM: usize = 1;
const EDEN: usize = 4;
const EINT: usize = 5;
const TEMP: usize = 6;
const FIXED: usize = 7;

impl StateSchema {
    /// Start building a schema.
    pub fn builder() -> StateSchemaBuilder {
        StateSchemaBuilder::default()
    }

    /// Number of spatial dimensions (1, 2 or 3).
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Total number of conserved components.
    pub fn ncomp(&self) -> usize {
        self.aux().end
    }

    /// Density component.
    pub fn density(&self) -> usize {
        DENSITY
    }

    /// Momentum component along `dir`.
    pub fn momentum(&self, dir: Direction) -> usize {
        XMOM + dir.index()
    }

    /// The three Cartesian momentum components.
    pub fn momenta(&self) -> Range<usize> {
        XMOM..XMOM + 3
    }

    /// Total energy density component.
    pub fn eden(&self) -> usize {
        EDEN
    }

    /// Internal energy density component.
    pub fn eint(&self) -> usize {
        EINT
    }

    /// Temperature component. The only component that is not a density.
    pub fn temp(&self) -> usize {
        TEMP
    }

    /// Hybrid radial, angular, and vertical momentum components, if enabled.
    pub fn hybrid(&self) -> Option<[usize; 3]> {
        self.hybrid.then_some([FIXED, FIXED + 1, FIXED + 2])
    }

    /// Advected scalar components (stored as `rho * q`).
    pub fn advected(&self) -> Range<usize> {
        let start = FIXED + if self.hybrid { 3 } else { 0 };
        start..start + self.nadv
    }

    /// Species partial density components.
    pub fn species(&self) -> Range<usize> {
        let start = self.advected().end;
        start..start + self.species.len()
    }

    /// Auxiliary scalar components (stored as `rho * a`).
    pub fn aux(&self) -> Range<usize> {
        let start = self.species().end;
        start..start + self.naux
    }

    /// Number of species.
    pub fn nspec(&self) -> usize {
        self.species.len()
    }

    /// Species names in component order.
    pub fn species_names(&self) -> &[String] {
        &self.species
    }

    /// Whether `comp` scales with density (everything except temperature).
    pub fn mass_weighted(&self, comp: usize) -> bool {
        comp != TEMP && comp < self.ncomp()
    }

    /// Human-readable component name for diagnostics.
    pub fn component_name(&self, comp: usize) -> String {
        match comp {
            DENSITY => "density".to_string(),
            1..=3 => format!("{}mom", ["x", "y", "z"][comp - XMOM]),
            EDEN => "eden".to_string(),
            EINT => "eint".to_string(),
            TEMP => "temp".to_string(),
            c if self.hybrid && (FIXED..FIXED + 3).contains(&c) => {
                ["rmom", "lmom", "pmom"][c - FIXED].to_string()
            }
            c if self.advected().contains(&c) => format!("adv{}", c - self.advected().start),
            c if self.species().contains(&c) => {
                format!("rho_{}", self.species[c - self.species().start])
            }
            c if self.aux().contains(&c) => format!("aux{}", c - self.aux().start),
            c => format!("comp{c}"),
        }
    }
}

/// Builder for [`StateSchema`].
#[derive(Clone, Debug)]
pub struct StateSchemaBuilder {
    ndim: usize,
    hybrid: bool,
    nadv: usize,
    naux: usize,
    species: Vec<String>,
}

impl Default for StateSchemaBuilder {
    fn default() -> Self {
        Self {
            ndim: 3,
            hybrid: false,
            nadv: 0,
            naux: 0,
            species: Vec::new(),
        }
    }
}

impl StateSchemaBuilder {
    /// Set the number of spatial dimensions. Default: 3.
    pub fn ndim(mut self, ndim: usize) -> Self {
        self.ndim = ndim;
        self
    }

    /// Set the species names.
    pub fn species<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.species = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of advected scalars.
    pub fn advected(mut self, n: usize) -> Self {
        self.nadv = n;
        self
    }

    /// Set the number of auxiliary scalars.
    pub fn aux(mut self, n: usize) -> Self {
        self.naux = n;
        self
    }

    /// Enable the hybrid angular-momentum components.
    pub fn hybrid_momentum(mut self, enabled: bool) -> Self {
        self.hybrid = enabled;
        self
    }

    /// Validate and build the schema.
    pub fn build(self) -> Result<StateSchema, SchemaError> {
        if !(1..=3).contains(&self.ndim) {
            return Err(SchemaError::InvalidDimension { ndim: self.ndim });
        }
        if self.hybrid && self.ndim != 3 {
            return Err(SchemaError::HybridRequiresThreeDimensions { ndim: self.ndim });
        }
        for (i, name) in self.species.iter().enumerate() {
            if name.is_empty() {
                return Err(SchemaError::EmptySpeciesName { index: i });
            }
            if self.species[..i].contains(name) {
                return Err(SchemaError::DuplicateSpecies { name: name.clone() });
            }
        }
        Ok(StateSchema {
            ndim: self.ndim,
            hybrid: self.hybrid,
            nadv: self.nadv,
            naux: self.naux,
            species: self.species,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_without_hybrid() {
        let s = StateSchema::builder()
            .ndim(2)
            .advected(1)
            .species(["H", "He"])
            .aux(1)
            .build()
            .unwrap();
        assert_eq!(s.hybrid(), None);
        assert_eq!(s.advected(), 7..8);
        assert_eq!(s.species(), 8..10);
        assert_eq!(s.aux(), 10..11);
        assert_eq!(s.ncomp(), 11);
        assert_eq!(s.momentum(Direction::Y), 2);
        assert_eq!(s.component_name(9), "rho_He");
    }

    #[test]
    fn layout_with_hybrid() {
        let s = StateSchema::builder()
            .hybrid_momentum(true)
            .species(["X"])
            .build()
            .unwrap();
        assert_eq!(s.hybrid(), Some([7, 8, 9]));
        assert_eq!(s.species(), 10..11);
        assert_eq!(s.component_name(8), "lmom");
    }

    #[test]
    fn temperature_is_not_mass_weighted() {
        let s = StateSchema::builder().build().unwrap();
        assert!(!s.mass_weighted(s.temp()));
        assert!(s.mass_weighted(s.eden()));
        assert!(!s.mass_weighted(s.ncomp()));
    }

    #[test]
    fn hybrid_requires_3d() {
        let err = StateSchema::builder()
            .ndim(2)
            .hybrid_momentum(true)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::HybridRequiresThreeDimensions { ndim: 2 });
    }

    #[test]
    fn rejects_bad_dimension_and_duplicates() {
        assert!(matches!(
            StateSchema::builder().ndim(0).build(),
            Err(SchemaError::InvalidDimension { ndim: 0 })
        ));
        assert!(matches!(
            StateSchema::builder().species(["a", "a"]).build(),
            Err(SchemaError::DuplicateSpecies { .. })
        ));
    }
}
