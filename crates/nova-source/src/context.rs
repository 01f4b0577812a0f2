//! Execution context handed to [`SourceTerm::construct`](crate::SourceTerm::construct).

use nova_core::{FaceFluxes, LevelGeometry, LevelId, StateArray, StateSchema, TimeLevel};

use crate::set::SourceTermSet;

/// Everything a source term may read while constructing its rate, plus
/// the output buffer it writes into.
///
/// The output starts zeroed with the shape of the input state. Terms
/// write rates into valid cells only.
pub struct SourceContext<'a> {
    schema: &'a StateSchema,
    geom: &'a LevelGeometry,
    state: &'a StateArray,
    preceding: &'a SourceTermSet,
    hydro_fluxes: Option<&'a FaceFluxes>,
    time: f64,
    dt: f64,
    time_level: TimeLevel,
    output: &'a mut StateArray,
    posted: &'a mut Option<FaceFluxes>,
}

impl<'a> SourceContext<'a> {
    /// Create a new source context.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: &'a StateSchema,
        geom: &'a LevelGeometry,
        state: &'a StateArray,
        preceding: &'a SourceTermSet,
        hydro_fluxes: Option<&'a FaceFluxes>,
        time: f64,
        dt: f64,
        time_level: TimeLevel,
        output: &'a mut StateArray,
        posted: &'a mut Option<FaceFluxes>,
    ) -> Self {
        Self {
            schema,
            geom,
            state,
            preceding,
            hydro_fluxes,
            time,
            dt,
            time_level,
            output,
            posted,
        }
    }

    /// Component layout of the state.
    pub fn schema(&self) -> &'a StateSchema {
        self.schema
    }

    /// Geometry of the level being advanced.
    pub fn geom(&self) -> &'a LevelGeometry {
        self.geom
    }

    /// Level being advanced.
    pub fn level(&self) -> LevelId {
        self.geom.level()
    }

    /// State at [`time`](Self::time), ghost cells filled.
    pub fn state(&self) -> &'a StateArray {
        self.state
    }

    /// Contributions of the terms constructed earlier at this time.
    pub fn preceding(&self) -> &'a SourceTermSet {
        self.preceding
    }

    /// Hydrodynamic face fluxes of this attempt, available at the new time.
    pub fn hydro_fluxes(&self) -> Option<&'a FaceFluxes> {
        self.hydro_fluxes
    }

    /// Evaluation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Size of the step being attempted.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Whether the context is for the old or the new time.
    pub fn time_level(&self) -> TimeLevel {
        self.time_level
    }

    /// Whether this is the new-time (corrector) evaluation.
    pub fn is_new(&self) -> bool {
        self.time_level == TimeLevel::New
    }

    /// Rate buffer to write into.
    pub fn output(&mut self) -> &mut StateArray {
        self.output
    }

    /// Forward face fluxes (conserved components, per unit time) that
    /// realise this term's divergence, for refluxing.
    ///
    /// A later post replaces an earlier one.
    pub fn post_fluxes(&mut self, fluxes: FaceFluxes) {
        *self.posted = Some(fluxes);
    }
}
