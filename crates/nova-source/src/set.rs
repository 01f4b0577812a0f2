//! Constructed source contributions for one time level.

use indexmap::IndexMap;
use nova_core::{ArrayError, FaceFluxes, SourceKind, StateArray, TimeLevel};

/// One term's rate at one time level.
#[derive(Clone, Debug)]
pub struct SourceContribution {
    kind: SourceKind,
    time_level: TimeLevel,
    rate: StateArray,
    fluxes: Option<FaceFluxes>,
    flux_weight: f64,
}

impl SourceContribution {
    /// Bundle a constructed rate.
    pub fn new(
        kind: SourceKind,
        time_level: TimeLevel,
        rate: StateArray,
        fluxes: Option<FaceFluxes>,
        flux_weight: f64,
    ) -> Self {
        Self {
            kind,
            time_level,
            rate,
            fluxes,
            flux_weight,
        }
    }

    /// The producing term.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Time level the rate was evaluated at.
    pub fn time_level(&self) -> TimeLevel {
        self.time_level
    }

    /// Rate per unit time, same shape as the state.
    pub fn rate(&self) -> &StateArray {
        &self.rate
    }

    /// Mutable access to the rate.
    pub fn rate_mut(&mut self) -> &mut StateArray {
        &mut self.rate
    }

    /// Face fluxes posted by the term, if any.
    pub fn fluxes(&self) -> Option<&FaceFluxes> {
        self.fluxes.as_ref()
    }

    /// Fraction of `dt` the posted fluxes carry into the flux registers.
    pub fn flux_weight(&self) -> f64 {
        self.flux_weight
    }
}

/// Contributions of every active term at one time level, in plan order.
#[derive(Clone, Debug, Default)]
pub struct SourceTermSet {
    entries: IndexMap<SourceKind, SourceContribution>,
}

impl SourceTermSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contribution, replacing any previous one of the same kind.
    pub fn insert(&mut self, contribution: SourceContribution) {
        self.entries.insert(contribution.kind(), contribution);
    }

    /// Look up a kind.
    pub fn get(&self, kind: SourceKind) -> Option<&SourceContribution> {
        self.entries.get(&kind)
    }

    /// Iterate in plan order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceContribution> {
        self.entries.values()
    }

    /// Kinds present, in plan order.
    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.entries.keys().copied()
    }

    /// Number of contributions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no contributions.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every rate, or `None` for an empty set.
    pub fn total(&self) -> Result<Option<StateArray>, ArrayError> {
        let mut iter = self.entries.values();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let mut sum = first.rate().clone();
        let ng = sum.nghost();
        for c in iter {
            sum.add_scaled(c.rate(), 1.0, ng)?;
        }
        Ok(Some(sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::GridBox;

    fn rate(v: f64) -> StateArray {
        let mut a = StateArray::new(GridBox::with_size(1, [2, 1, 1]), 1, 2);
        a.fill(v);
        a
    }

    #[test]
    fn preserves_insertion_order() {
        let mut set = SourceTermSet::new();
        for kind in [SourceKind::Gravity, SourceKind::External] {
            set.insert(SourceContribution::new(kind, TimeLevel::Old, rate(1.0), None, 0.5));
        }
        let kinds: Vec<_> = set.kinds().collect();
        assert_eq!(kinds, vec![SourceKind::Gravity, SourceKind::External]);
    }

    #[test]
    fn total_sums_rates() {
        let mut set = SourceTermSet::new();
        assert!(set.total().unwrap().is_none());
        set.insert(SourceContribution::new(SourceKind::External, TimeLevel::Old, rate(1.0), None, 0.5));
        set.insert(SourceContribution::new(SourceKind::Sponge, TimeLevel::Old, rate(2.5), None, 0.5));
        let total = set.total().unwrap().unwrap();
        assert!(total.data().iter().all(|&v| v == 3.5));
    }
}
