//! The source-term engine: ordered construction and time centering.

use std::sync::Arc;

use log::Level;
use nova_core::{
    FaceFluxes, LevelGeometry, SourceError, SourceKind, StateArray, StateSchema, TimeLevel,
};

use crate::apply::time_center;
use crate::context::SourceContext;
use crate::diagnostics::{evaluate_source_change, log_source_change};
use crate::plan::{validate_sources, PlanError, SourceOrder, SourcePlan};
use crate::set::{SourceContribution, SourceTermSet};
use crate::source::{Centering, SourceTerm};

/// Inputs shared by every term for one construction pass.
#[derive(Clone, Copy)]
pub struct SourceRequest<'a> {
    /// Level geometry.
    pub geom: &'a LevelGeometry,
    /// State at `time`, ghost cells filled.
    pub state: &'a StateArray,
    /// Evaluation time.
    pub time: f64,
    /// Attempted step size.
    pub dt: f64,
    /// Old- or new-time evaluation.
    pub time_level: TimeLevel,
    /// Hydro face fluxes of the attempt (new-time evaluations only).
    pub hydro_fluxes: Option<&'a FaceFluxes>,
}

/// Owns the active source terms and their validated order.
pub struct SourceTermEngine {
    schema: Arc<StateSchema>,
    terms: Vec<Box<dyn SourceTerm>>,
    plan: SourcePlan,
    /// `centering[term][comp]`.
    centering: Vec<Vec<Centering>>,
}

impl SourceTermEngine {
    /// Validate `terms` under `order` and build the engine.
    pub fn new(
        schema: Arc<StateSchema>,
        terms: Vec<Box<dyn SourceTerm>>,
        order: &SourceOrder,
    ) -> Result<Self, PlanError> {
        let plan = validate_sources(&terms, order)?;
        let centering = terms
            .iter()
            .map(|t| (0..schema.ncomp()).map(|c| t.centering(&schema, c)).collect())
            .collect();
        log::info!(
            "source plan: [{}]",
            plan.kinds().map(SourceKind::name).collect::<Vec<_>>().join(", ")
        );
        Ok(Self {
            schema,
            terms,
            plan,
            centering,
        })
    }

    /// An engine with no active terms.
    pub fn empty(schema: Arc<StateSchema>) -> Self {
        Self {
            schema,
            terms: Vec::new(),
            plan: SourcePlan::default(),
            centering: Vec::new(),
        }
    }

    /// Component layout the terms were built for.
    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    /// The validated construction order.
    pub fn plan(&self) -> &SourcePlan {
        &self.plan
    }

    /// Whether `kind` has an active term.
    pub fn is_active(&self, kind: SourceKind) -> bool {
        self.plan.position(kind).is_some()
    }

    /// Whether no term is active.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    /// Construct every active term in plan order.
    pub fn construct(&self, req: &SourceRequest<'_>) -> Result<SourceTermSet, SourceError> {
        let mut set = SourceTermSet::new();
        for &(kind, index) in self.plan.steps() {
            let contribution = self.construct_term(kind, index, req, &set)?;
            set.insert(contribution);
        }
        Ok(set)
    }

    fn construct_term(
        &self,
        kind: SourceKind,
        index: usize,
        req: &SourceRequest<'_>,
        preceding: &SourceTermSet,
    ) -> Result<SourceContribution, SourceError> {
        let term = &self.terms[index];
        let mut rate = req.state.zeros_like();
        let mut posted = None;
        {
            let mut ctx = SourceContext::new(
                &self.schema,
                req.geom,
                req.state,
                preceding,
                req.hydro_fluxes,
                req.time,
                req.dt,
                req.time_level,
                &mut rate,
                &mut posted,
            );
            term.construct(&mut ctx)?;
        }
        if let Some(cell) = rate.first_non_finite() {
            return Err(SourceError::NonFinite { kind, cell });
        }
        if log::log_enabled!(Level::Debug) {
            let change = evaluate_source_change(&self.schema, req.geom, &rate, req.dt);
            log_source_change(kind, req.geom.level(), &change);
        }
        let weight = term
            .flux_centering()
            .weight(req.time_level == TimeLevel::New);
        Ok(SourceContribution::new(
            kind,
            req.time_level,
            rate,
            posted,
            weight,
        ))
    }

    /// Combine old- and new-time contributions per kind and component:
    /// time-centered components are averaged, new-time-only components
    /// take the new value.
    pub fn time_center(
        &self,
        old: &SourceTermSet,
        new: &SourceTermSet,
    ) -> Result<SourceTermSet, SourceError> {
        let mut out = SourceTermSet::new();
        for &(kind, index) in self.plan.steps() {
            let (Some(o), Some(n)) = (old.get(kind), new.get(kind)) else {
                return Err(SourceError::ExecutionFailed {
                    kind,
                    reason: "missing old- or new-time contribution".to_string(),
                });
            };
            let mut centered = time_center(o.rate(), n.rate())?;
            let overrides: Vec<usize> = self.centering[index]
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == Centering::NewTimeOnly)
                .map(|(comp, _)| comp)
                .collect();
            if !overrides.is_empty() {
                let nc = centered.ncomp();
                for (dst, src) in centered
                    .data_mut()
                    .chunks_mut(nc)
                    .zip(n.rate().data().chunks(nc))
                {
                    for &comp in &overrides {
                        dst[comp] = src[comp];
                    }
                }
            }
            out.insert(SourceContribution::new(
                kind,
                TimeLevel::New,
                centered,
                None,
                0.0,
            ));
        }
        Ok(out)
    }

    /// Tightest timestep any active term allows, with the constraining kind.
    pub fn max_dt(
        &self,
        geom: &LevelGeometry,
        state: &StateArray,
    ) -> Result<Option<(f64, SourceKind)>, SourceError> {
        let mut best: Option<(f64, SourceKind)> = None;
        for &(kind, index) in self.plan.steps() {
            let Some(dt) = self.terms[index].max_dt(&self.schema, geom, state) else {
                continue;
            };
            if !dt.is_finite() || dt <= 0.0 {
                return Err(SourceError::ExecutionFailed {
                    kind,
                    reason: format!("invalid max_dt {dt}"),
                });
            }
            if best.is_none_or(|(b, _)| dt < b) {
                best = Some((dt, kind));
            }
        }
        Ok(best)
    }

    /// Let every term fill the fluxes of the components it evolves.
    pub fn couple_fluxes(&self, geom: &LevelGeometry, fluxes: &mut FaceFluxes) {
        for &(_, index) in self.plan.steps() {
            self.terms[index].couple_fluxes(&self.schema, geom, fluxes);
        }
    }

    /// Write every term's evolved components back into the components
    /// they shadow over `valid.grow(ng)`. Returns whether anything changed.
    pub fn feed_back(&self, geom: &LevelGeometry, state: &mut StateArray, ng: usize) -> bool {
        let mut changed = false;
        for &(_, index) in self.plan.steps() {
            changed |= self.terms[index].feed_back(&self.schema, geom, state, ng);
        }
        changed
    }

    /// Run every term's synchronization over `valid.grow(ng)`. Returns
    /// whether any term changed the state.
    pub fn sync(&self, geom: &LevelGeometry, state: &mut StateArray, ng: usize) -> bool {
        let mut changed = false;
        for &(_, index) in self.plan.steps() {
            changed |= self.terms[index].sync(&self.schema, geom, state, ng);
        }
        changed
    }
}

impl std::fmt::Debug for SourceTermEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceTermEngine")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}
