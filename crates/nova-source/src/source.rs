//! The [`SourceTerm`] capability trait and [`Centering`] enum.
//!
//! Each physics module is an optional source term. The engine is built
//! from the active set, validates their ordering constraints once, and
//! calls [`construct`](SourceTerm::construct) at the old and new time of
//! every attempt.

use nova_core::{FaceFluxes, LevelGeometry, SourceError, SourceKind, StateArray, StateSchema};

use crate::context::SourceContext;

/// How old- and new-time contributions combine into the applied update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Centering {
    /// Trapezoidal average `0.5 * (old + new)`.
    TimeCentered,
    /// The new-time value alone (stiff terms).
    NewTimeOnly,
}

impl Centering {
    /// Weight of the contribution at the old (`false`) or new (`true`) time.
    pub fn weight(self, is_new: bool) -> f64 {
        match (self, is_new) {
            (Self::TimeCentered, _) => 0.5,
            (Self::NewTimeOnly, false) => 0.0,
            (Self::NewTimeOnly, true) => 1.0,
        }
    }
}

/// A physical source contribution to the conserved state.
///
/// # Contract
///
/// - `construct()` writes a rate (per unit time) into the context's
///   output for every valid cell. It must not read other levels and must
///   be deterministic for identical inputs.
/// - `requires()` and `after()` are queried once when the engine is built.
///
/// # Object safety
///
/// The engine stores terms as `Vec<Box<dyn SourceTerm>>`.
pub trait SourceTerm: Send + Sync + 'static {
    /// Which kind this term implements. At most one term per kind.
    fn kind(&self) -> SourceKind;

    /// Kinds that must be active and constructed before this one.
    ///
    /// Default: none.
    fn requires(&self) -> Vec<SourceKind> {
        Vec::new()
    }

    /// Kinds that, when active, must be constructed before this one.
    ///
    /// Default: none.
    fn after(&self) -> Vec<SourceKind> {
        Vec::new()
    }

    /// Centering of conserved component `comp`. Default: time-centered.
    fn centering(&self, _schema: &StateSchema, _comp: usize) -> Centering {
        Centering::TimeCentered
    }

    /// Centering applied to any face fluxes this term posts.
    fn flux_centering(&self) -> Centering {
        Centering::TimeCentered
    }

    /// Largest stable timestep this term allows for `state`.
    ///
    /// Return `None` to impose no constraint.
    fn max_dt(
        &self,
        _schema: &StateSchema,
        _geom: &LevelGeometry,
        _state: &StateArray,
    ) -> Option<f64> {
        None
    }

    /// Compute the source rate at the context's time.
    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError>;

    /// Fill the face fluxes of components this term evolves alongside the
    /// hydro update, from the hyperbolic fluxes of the components they
    /// shadow. Called on every stage's fluxes before they are used.
    ///
    /// Default: no-op.
    fn couple_fluxes(&self, _schema: &StateSchema, _geom: &LevelGeometry, _fluxes: &mut FaceFluxes) {}

    /// Overwrite the shadowed components of `state` from the ones this
    /// term evolves, on `valid.grow(ng)`. The inverse of [`sync`](Self::sync).
    ///
    /// Called once the flux and source update of an attempt has been
    /// applied. Returns whether anything changed. Default: no-op.
    fn feed_back(
        &self,
        _schema: &StateSchema,
        _geom: &LevelGeometry,
        _state: &mut StateArray,
        _ng: usize,
    ) -> bool {
        false
    }

    /// Re-derive any redundant components of `state` from the ones they
    /// shadow, on `valid.grow(ng)`. Returns whether anything changed.
    ///
    /// Called when momentum was altered outside this term's evolution,
    /// such as on construction and after reflux. Default: no-op.
    fn sync(
        &self,
        _schema: &StateSchema,
        _geom: &LevelGeometry,
        _state: &mut StateArray,
        _ng: usize,
    ) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        for c in [Centering::TimeCentered, Centering::NewTimeOnly] {
            assert_eq!(c.weight(false) + c.weight(true), 1.0);
        }
    }
}
