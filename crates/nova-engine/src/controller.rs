//! The per-level advance controller.
//!
//! One [`AdvanceController`] owns a level's state snapshot, its source
//! engine, its repair policy, and its retry manager. [`advance`] runs
//! attempts until the [`RetryManager`] accepts one, then commits the
//! staged fluxes into the neighbouring registers.
//!
//! Every sub-step runs the same sequence: optional half burn, old-time
//! sources, hyperbolic stages, flux update, old sources applied, repair,
//! new-time sources, time-centering correction, optional half burn,
//! repair. A single-stage step is the one-stage tableau.
//!
//! [`advance`]: AdvanceController::advance

use std::sync::Arc;
use std::time::Instant;

use nova_core::{
    Direction, Eos, FaceFluxes, GhostFill, HydroRequest, HyperbolicSolver, LevelGeometry,
    LevelId, PrimitiveLayout, ReactionNetwork, SourceError, SourceKind, StateArray, StateSchema,
    TimeLevel,
};
use nova_flux::{FluxAccumulator, FluxRegister};
use nova_source::{
    add_source, apply_correction, SourceRequest, SourceTerm, SourceTermEngine, SourceTermSet,
};
use nova_state::{
    compute_temperature, cons_to_prim, max_signal_rate, RepairPolicy, StateError, StateSnapshot,
};

use crate::config::{AdvanceConfig, ButcherTableau, ConfigError, IntegratorConfig};
use crate::error::AdvanceError;
use crate::kernels;
use crate::metrics::AdvanceMetrics;
use crate::retry::{AdvanceAttempt, AttemptDiagnostics, AttemptPlan, RetryManager, RetryPhase};

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

// ── Services and links ─────────────────────────────────────────────

/// Collaborators shared by every attempt of a level.
#[derive(Clone)]
pub struct AdvanceServices {
    /// Hyperbolic flux solver.
    pub hydro: Arc<dyn HyperbolicSolver>,
    /// Equation of state.
    pub eos: Arc<dyn Eos>,
    /// Reaction network; `None` disables burning.
    pub reactions: Option<Arc<dyn ReactionNetwork>>,
}

impl AdvanceServices {
    /// Services without reactions.
    pub fn new(hydro: Arc<dyn HyperbolicSolver>, eos: Arc<dyn Eos>) -> Self {
        Self {
            hydro,
            eos,
            reactions: None,
        }
    }

    /// Enable Strang-split burning with `network`.
    pub fn with_reactions(mut self, network: Arc<dyn ReactionNetwork>) -> Self {
        self.reactions = Some(network);
        self
    }
}

impl std::fmt::Debug for AdvanceServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvanceServices")
            .field("hydro", &self.hydro.name())
            .field("reactions", &self.reactions.is_some())
            .finish_non_exhaustive()
    }
}

/// What one step of a level is connected to.
pub struct LevelLinks<'a> {
    /// Ghost fill for this level.
    pub fill: &'a dyn GhostFill,
    /// Register toward the finer level, if any.
    pub as_coarse: Option<&'a mut FluxRegister>,
    /// Register toward the coarser level, if any.
    pub as_fine: Option<&'a mut FluxRegister>,
    /// Sub-step index within the coarser level's step.
    pub iteration: usize,
    /// Sub-steps the coarser level's step is split into.
    pub ncycle: usize,
}

impl<'a> LevelLinks<'a> {
    /// A lone level: no registers, one step per call.
    pub fn single(fill: &'a dyn GhostFill) -> Self {
        Self {
            fill,
            as_coarse: None,
            as_fine: None,
            iteration: 0,
            ncycle: 1,
        }
    }
}

// ── Results ────────────────────────────────────────────────────────

/// Summary of an accepted step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Interval the level advanced.
    pub dt_taken: f64,
    /// Sub-steps the interval was split into.
    pub substeps: usize,
    /// Attempts made, the accepted one included.
    pub attempts: u32,
}

/// What bounds a timestep estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DtLimiter {
    /// The hyperbolic signal speed.
    Hydro,
    /// A source term's stability limit.
    Source(SourceKind),
    /// Growth limit relative to the previous step.
    ChangeMax,
    /// The sub-step size a retry needed last step.
    Retry,
}

/// A timestep estimate and its binding constraint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DtEstimate {
    /// Largest allowed step.
    pub dt: f64,
    /// What set it.
    pub limiter: DtLimiter,
}

// ── AdvanceController ──────────────────────────────────────────────

/// Advances one level by one step with retry, rollback, and conservative
/// flux staging.
pub struct AdvanceController {
    schema: Arc<StateSchema>,
    layout: PrimitiveLayout,
    geom: LevelGeometry,
    snapshot: StateSnapshot,
    sources: SourceTermEngine,
    repair: RepairPolicy,
    services: AdvanceServices,
    tableau: ButcherTableau,
    config: AdvanceConfig,
    retry: RetryManager,
    accumulator: FluxAccumulator,
    last_dt: Option<f64>,
    metrics: AdvanceMetrics,
}

impl AdvanceController {
    /// Build a controller for the level `geom` starting from `initial`
    /// at `time`.
    ///
    /// Validates `config`, checks `initial` against the schema and
    /// geometry, validates the source plan, and refreshes the initial
    /// temperature and any components the sources derive from momentum.
    pub fn new(
        schema: Arc<StateSchema>,
        geom: LevelGeometry,
        mut initial: StateArray,
        time: f64,
        sources: Vec<Box<dyn SourceTerm>>,
        services: AdvanceServices,
        config: AdvanceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mismatch = |reason: String| ConfigError::StateMismatch { reason };
        if initial.ncomp() != schema.ncomp() {
            return Err(mismatch(format!(
                "state has {} components, schema has {}",
                initial.ncomp(),
                schema.ncomp()
            )));
        }
        if initial.valid() != geom.valid() {
            return Err(mismatch(format!(
                "state covers {:?}..{:?}, level {} covers {:?}..{:?}",
                initial.valid().lo(),
                initial.valid().hi(),
                geom.level(),
                geom.valid().lo(),
                geom.valid().hi()
            )));
        }
        if initial.nghost() == 0 {
            return Err(mismatch("state needs at least one ghost cell".to_string()));
        }
        if !time.is_finite() {
            return Err(mismatch(format!("start time {time} is not finite")));
        }
        let engine = SourceTermEngine::new(Arc::clone(&schema), sources, &config.source_order)?;
        let ng = initial.nghost();
        engine.sync(&geom, &mut initial, ng);
        compute_temperature(&schema, &mut initial, services.eos.as_ref(), 0)
            .map_err(|e| mismatch(e.to_string()))?;
        log::info!(
            "level {}: {} integrator with {} stage(s), hydro '{}', {} source(s)",
            geom.level(),
            match config.integrator {
                IntegratorConfig::SingleStage => "single-stage",
                IntegratorConfig::MethodOfLines(_) => "method-of-lines",
            },
            config.integrator.tableau().stages(),
            services.hydro.name(),
            engine.plan().len()
        );
        Ok(Self {
            layout: PrimitiveLayout::from_schema(&schema),
            repair: RepairPolicy::new(Arc::clone(&schema), config.repair.clone()),
            accumulator: FluxAccumulator::new(geom.level(), *geom.valid(), schema.ncomp()),
            tableau: config.integrator.tableau(),
            retry: RetryManager::new(config.retry.clone()),
            snapshot: StateSnapshot::new(initial, time),
            sources: engine,
            schema,
            geom,
            services,
            config,
            last_dt: None,
            metrics: AdvanceMetrics::default(),
        })
    }

    /// The level advanced.
    pub fn level(&self) -> LevelId {
        self.geom.level()
    }

    /// Level geometry.
    pub fn geom(&self) -> &LevelGeometry {
        &self.geom
    }

    /// Component layout.
    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    /// Both time levels.
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    /// Current state (new time level).
    pub fn state(&self) -> &StateArray {
        self.snapshot.new_state()
    }

    /// Mutable current state, for reflux and average-down.
    pub fn state_mut(&mut self) -> &mut StateArray {
        self.snapshot.new_mut()
    }

    /// Time of the current state.
    pub fn time(&self) -> f64 {
        self.snapshot.t_new()
    }

    /// The source engine.
    pub fn sources(&self) -> &SourceTermEngine {
        &self.sources
    }

    /// The retry manager.
    pub fn retry(&self) -> &RetryManager {
        &self.retry
    }

    /// Configuration in use.
    pub fn config(&self) -> &AdvanceConfig {
        &self.config
    }

    /// Metrics of the last accepted step.
    pub fn last_metrics(&self) -> &AdvanceMetrics {
        &self.metrics
    }

    /// Require every step to cover the full requested interval.
    pub fn set_fixed_interval(&mut self, fixed: bool) {
        self.retry.set_fixed_interval(fixed);
    }

    /// Largest stable step for the current state.
    ///
    /// The hyperbolic limit is `cfl / max_d((|u_d| + c) / dx_d)`, then
    /// every source's own limit, growth relative to the previous step,
    /// and the sub-step size a retry needed last step.
    pub fn estimate_dt(&self) -> Result<DtEstimate, AdvanceError> {
        let state = self.snapshot.new_state();
        let q = cons_to_prim(
            &self.schema,
            &self.layout,
            state,
            self.services.eos.as_ref(),
            0,
        )?;
        let rate = max_signal_rate(&self.layout, &q, self.geom.dx())
            .into_iter()
            .fold(0.0, f64::max);
        let mut best = DtEstimate {
            dt: if rate > 0.0 {
                self.config.cfl / rate
            } else {
                f64::INFINITY
            },
            limiter: DtLimiter::Hydro,
        };
        if let Some((dt, kind)) = self.sources.max_dt(&self.geom, state)? {
            if dt < best.dt {
                best = DtEstimate {
                    dt,
                    limiter: DtLimiter::Source(kind),
                };
            }
        }
        if let Some(last) = self.last_dt {
            let cap = self.config.change_max * last;
            if cap < best.dt {
                best = DtEstimate {
                    dt: cap,
                    limiter: DtLimiter::ChangeMax,
                };
            }
        }
        if let Some(dt) = self.retry.last_dt_from_retry() {
            if dt < best.dt {
                best = DtEstimate {
                    dt,
                    limiter: DtLimiter::Retry,
                };
            }
        }
        if !best.dt.is_finite() || best.dt <= 0.0 {
            return Err(AdvanceError::InvalidDt { dt: best.dt });
        }
        log::debug!(
            "level {} dt estimate {:.6e} ({:?})",
            self.level(),
            best.dt,
            best.limiter
        );
        Ok(best)
    }

    /// Advance by `dt`, retrying or splitting the step until an attempt
    /// is accepted.
    ///
    /// A level whose interval is not fixed may take less than `dt`; the
    /// outcome reports what was taken. On error the level is left
    /// exactly as it was before the call and no register is touched.
    pub fn advance(&mut self, dt: f64, links: LevelLinks<'_>) -> Result<StepOutcome, AdvanceError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(AdvanceError::InvalidDt { dt });
        }
        let start = Instant::now();
        let LevelLinks {
            fill,
            as_coarse,
            as_fine,
            iteration,
            ncycle,
        } = links;
        let mut metrics = AdvanceMetrics::default();
        self.retry.begin(dt, &self.snapshot);
        let attempt = match self.run_attempts(fill, iteration, ncycle, &mut metrics) {
            Ok(a) => a,
            Err(e) => {
                self.abandon();
                return Err(e);
            }
        };
        if let Err(e) = self.accumulator.commit(as_coarse, as_fine) {
            self.abandon();
            return Err(e.into());
        }
        self.retry.finish(&attempt);
        self.last_dt = Some(attempt.dt);

        metrics.substeps = attempt.substeps as u32;
        metrics.max_cfl = attempt.diagnostics.max_cfl;
        metrics.dt_taken = attempt.dt;
        metrics.repair = attempt.diagnostics.repair;
        metrics.total_us = elapsed_us(start);
        log::debug!(
            "level {} advanced {:.6e} to t = {:.6e}: {} attempt(s), {} sub-step(s), max CFL {:.3}",
            self.level(),
            metrics.dt_taken,
            self.snapshot.t_new(),
            metrics.attempts,
            metrics.substeps,
            metrics.max_cfl
        );
        let outcome = StepOutcome {
            dt_taken: metrics.dt_taken,
            substeps: attempt.substeps,
            attempts: metrics.attempts,
        };
        self.metrics = metrics;
        Ok(outcome)
    }

    /// Re-derive dependent components after reflux or average-down
    /// changed the current state.
    pub fn post_reflux(&mut self) -> Result<(), AdvanceError> {
        let state = self.snapshot.new_mut();
        self.sources.sync(&self.geom, state, 0);
        compute_temperature(&self.schema, state, self.services.eos.as_ref(), 0)?;
        Ok(())
    }

    fn abandon(&mut self) {
        self.retry.rollback(&mut self.snapshot);
        self.retry.abort();
        self.accumulator.discard();
    }

    fn run_attempts(
        &mut self,
        fill: &dyn GhostFill,
        iteration: usize,
        ncycle: usize,
        metrics: &mut AdvanceMetrics,
    ) -> Result<AdvanceAttempt, AdvanceError> {
        loop {
            let plan = self.retry.plan();
            metrics.attempts += 1;
            let diagnostics = self.attempt(plan, fill, iteration, metrics)?;
            let attempt = AdvanceAttempt {
                dt: plan.interval(),
                iteration,
                ncycle,
                substeps: plan.substeps(),
                diagnostics,
            };
            self.retry.mark_attempted(attempt.dt);
            match self.retry.judge(&attempt).clone() {
                RetryPhase::Accepted { .. } => return Ok(attempt),
                RetryPhase::RetryScheduled { .. } | RetryPhase::SubcycleScheduled { .. } => {
                    metrics.retries += 1;
                    self.retry.rollback(&mut self.snapshot);
                    self.accumulator.discard();
                }
                RetryPhase::Fatal { reason } => {
                    log::error!("level {} step abandoned: {reason}", self.level());
                    return Err(match attempt.diagnostics.solve_failure {
                        Some(e) => AdvanceError::SolveFailed(e),
                        None => AdvanceError::Fatal {
                            level: self.level(),
                            reason,
                        },
                    });
                }
                other => {
                    return Err(AdvanceError::Fatal {
                        level: self.level(),
                        reason: format!("retry manager left in {other:?}"),
                    })
                }
            }
        }
    }

    /// Run one attempt from the saved pre-step snapshot.
    fn attempt(
        &mut self,
        plan: AttemptPlan,
        fill: &dyn GhostFill,
        iteration: usize,
        metrics: &mut AdvanceMetrics,
    ) -> Result<AttemptDiagnostics, AdvanceError> {
        let interval = plan.interval();
        let n = plan.substeps();
        let h = interval / n as f64;
        let t_start = self.snapshot.t_new();
        let mut diag = AttemptDiagnostics::default();
        let mut interval_start: Option<StateArray> = None;
        self.accumulator.begin_attempt(interval, iteration);
        for k in 0..n {
            self.snapshot.begin_step(h)?;
            let t = Instant::now();
            let t_old = self.snapshot.t_old();
            fill.fill_patch(self.snapshot.get_mut(TimeLevel::Old), &self.geom, t_old)?;
            metrics.fill_us += elapsed_us(t);
            if k == 0 && n > 1 {
                interval_start = Some(self.snapshot.old().clone());
            }
            self.substep(h, fill, &mut diag, metrics)?;
            if !self.retry.classify(&diag).is_empty() {
                log::debug!(
                    "level {} attempt stopped after sub-step {}/{n}",
                    self.level(),
                    k + 1
                );
                break;
            }
        }
        if let Some(start) = &interval_start {
            self.snapshot.rewind_interval(start, t_start, interval)?;
        }
        Ok(diag)
    }

    /// One sub-step from the old time level (ghosts filled) to the new.
    /// Violations are recorded in `diag`; the sub-step stops early on a
    /// failed burn, a failed solve, or non-positive density.
    fn substep(
        &mut self,
        dt: f64,
        fill: &dyn GhostFill,
        diag: &mut AttemptDiagnostics,
        metrics: &mut AdvanceMetrics,
    ) -> Result<(), AdvanceError> {
        let t0 = self.snapshot.t_old();
        let t1 = self.snapshot.t_new();
        let ng = self.snapshot.old().nghost();

        let mut base = self.snapshot.old().clone();
        if let Some(network) = &self.services.reactions {
            let t = Instant::now();
            let failure = kernels::burn(&self.schema, network.as_ref(), &mut base, 0.5 * dt, ng);
            metrics.reactions_us += elapsed_us(t);
            if let Some(reason) = failure {
                diag.reaction_failure = Some(reason);
                return Ok(());
            }
        }

        let t = Instant::now();
        let old_request = SourceRequest {
            geom: &self.geom,
            state: &base,
            time: t0,
            dt,
            time_level: TimeLevel::Old,
            hydro_fluxes: None,
        };
        let Some(old_sources) = recorded(self.sources.construct(&old_request), diag)? else {
            return Ok(());
        };
        metrics.sources_us += elapsed_us(t);

        let t = Instant::now();
        let Some(fluxes) = self.hydro_stages(&base, t0, dt, fill, diag, metrics)? else {
            return Ok(());
        };
        self.accumulator.add_fluxes(&fluxes, dt)?;
        kernels::flux_update(self.snapshot.new_mut(), &base, &fluxes, self.geom.dx(), dt)?;
        metrics.hydro_us += elapsed_us(t);

        let t = Instant::now();
        if let Some(total) = old_sources.total()? {
            add_source(self.snapshot.new_mut(), &total, dt, 0)?;
        }
        self.sources.feed_back(&self.geom, self.snapshot.new_mut(), 0);
        metrics.sources_us += elapsed_us(t);

        if !self.repair_new(diag, metrics)? {
            return Ok(());
        }

        let t = Instant::now();
        fill.fill_patch(self.snapshot.new_mut(), &self.geom, t1)?;
        metrics.fill_us += elapsed_us(t);

        let t = Instant::now();
        let new_request = SourceRequest {
            geom: &self.geom,
            state: self.snapshot.new_state(),
            time: t1,
            dt,
            time_level: TimeLevel::New,
            hydro_fluxes: Some(&fluxes),
        };
        let Some(new_sources) = recorded(self.sources.construct(&new_request), diag)? else {
            return Ok(());
        };
        self.apply_centered(&old_sources, &new_sources, dt)?;
        metrics.sources_us += elapsed_us(t);

        if let Some(network) = &self.services.reactions {
            let t = Instant::now();
            let failure =
                kernels::burn(&self.schema, network.as_ref(), self.snapshot.new_mut(), 0.5 * dt, 0);
            metrics.reactions_us += elapsed_us(t);
            if let Some(reason) = failure {
                diag.reaction_failure = Some(reason);
                return Ok(());
            }
        }
        self.repair_new(diag, metrics)?;
        Ok(())
    }

    /// Hyperbolic stages of the tableau on top of `base`. Returns the
    /// weighted flux combination, or `None` when a stage state has
    /// non-positive density.
    fn hydro_stages(
        &self,
        base: &StateArray,
        t0: f64,
        dt: f64,
        fill: &dyn GhostFill,
        diag: &mut AttemptDiagnostics,
        metrics: &mut AdvanceMetrics,
    ) -> Result<Option<FaceFluxes>, AdvanceError> {
        let tab = &self.tableau;
        let valid = *base.valid();
        let ncomp = base.ncomp();
        let ng = base.nghost();
        let dx = self.geom.dx();
        let ndim = self.geom.ndim();
        let mut stage_fluxes: Vec<FaceFluxes> = Vec::with_capacity(tab.stages());
        let mut stage_state: Option<StateArray> = None;
        for i in 0..tab.stages() {
            let time = t0 + tab.c[i] * dt;
            let u: &StateArray = if i == 0 {
                base
            } else {
                let mut combined = FaceFluxes::new(valid, ncomp);
                for (j, f) in stage_fluxes.iter().enumerate() {
                    if tab.a[i][j] != 0.0 {
                        combined.add_scaled(f, tab.a[i][j])?;
                    }
                }
                let s = stage_state.get_or_insert_with(|| base.zeros_like());
                kernels::flux_update(s, base, &combined, dx, dt)?;
                let t = Instant::now();
                fill.fill_patch(s, &self.geom, time)?;
                metrics.fill_us += elapsed_us(t);
                &*s
            };
            let q = match cons_to_prim(&self.schema, &self.layout, u, self.services.eos.as_ref(), ng)
            {
                Ok(q) => q,
                Err(StateError::BadDensity { cell, value }) => {
                    log::debug!(
                        "level {} stage {i}: density {value} at {cell:?}",
                        self.level()
                    );
                    diag.negative_density_cells += non_positive_density(&self.schema, u).max(1);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            let mut f = FaceFluxes::new(valid, ncomp);
            let request = HydroRequest {
                schema: &self.schema,
                layout: &self.layout,
                geom: &self.geom,
                conserved: u,
                primitive: &q,
                time,
                dt,
            };
            let outcome = self.services.hydro.compute_fluxes(&request, &mut f)?;
            self.sources.couple_fluxes(&self.geom, &mut f);
            let cfl = Direction::active(ndim)
                .map(|d| dt * outcome.max_wave_speed[d.index()] / dx[d.index()])
                .fold(0.0, f64::max);
            diag.max_cfl = diag.max_cfl.max(cfl);
            stage_fluxes.push(f);
        }
        if tab.stages() == 1 {
            return Ok(stage_fluxes.pop());
        }
        let mut combined = FaceFluxes::new(valid, ncomp);
        for (b, f) in tab.b.iter().zip(&stage_fluxes) {
            combined.add_scaled(f, *b)?;
        }
        Ok(Some(combined))
    }

    /// Replace the applied old-time rates by their time-centered values
    /// and stage the fluxes the sources posted.
    fn apply_centered(
        &mut self,
        old: &SourceTermSet,
        new: &SourceTermSet,
        dt: f64,
    ) -> Result<(), AdvanceError> {
        let centered = self.sources.time_center(old, new)?;
        let state = self.snapshot.new_mut();
        for c in centered.iter() {
            if let Some(o) = old.get(c.kind()) {
                apply_correction(state, o.rate(), c.rate(), dt, 0)?;
            }
        }
        for c in old.iter().chain(new.iter()) {
            if let Some(f) = c.fluxes() {
                self.accumulator.add_fluxes(f, dt * c.flux_weight())?;
            }
        }
        self.sources.feed_back(&self.geom, state, 0);
        Ok(())
    }

    /// Repair the new state and refresh its temperature. Returns `false`
    /// when cells could not be repaired.
    fn repair_new(
        &mut self,
        diag: &mut AttemptDiagnostics,
        metrics: &mut AdvanceMetrics,
    ) -> Result<bool, AdvanceError> {
        let t = Instant::now();
        let state = self.snapshot.new_mut();
        let report = self.repair.clean(state, 0);
        diag.negative_density_cells += report.negative_density_cells;
        let repairable = report.unrepairable_cells == 0;
        diag.repair = std::mem::take(&mut diag.repair) + report;
        if repairable {
            compute_temperature(&self.schema, state, self.services.eos.as_ref(), 0)?;
        }
        metrics.repair_us += elapsed_us(t);
        Ok(repairable)
    }
}

impl std::fmt::Debug for AdvanceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvanceController")
            .field("level", &self.geom.level())
            .field("time", &self.snapshot.t_new())
            .field("services", &self.services)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

/// Pass a constructed set through, record a solve failure in `diag` as
/// `None`, and propagate every other error.
fn recorded(
    result: Result<SourceTermSet, SourceError>,
    diag: &mut AttemptDiagnostics,
) -> Result<Option<SourceTermSet>, AdvanceError> {
    match result {
        Ok(set) => Ok(Some(set)),
        Err(e) if e.is_solve_failure() => {
            log::debug!("{e}");
            diag.solve_failure = Some(e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Valid cells of `state` whose density is not positive.
fn non_positive_density(schema: &StateSchema, state: &StateArray) -> usize {
    let rho = schema.density();
    state
        .valid()
        .cells()
        .filter(|&p| {
            let r = state.get(p, rho);
            r.is_nan() || r <= 0.0
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::GridBox;
    use nova_grid::PhysicalBoundaryFill;
    use nova_test_utils::{periodic_geometry, uniform_state, FlowSpec, IdealGasEos, RusanovSolver};

    fn schema() -> Arc<StateSchema> {
        Arc::new(StateSchema::builder().ndim(1).build().unwrap())
    }

    fn services() -> AdvanceServices {
        AdvanceServices::new(Arc::new(RusanovSolver), Arc::new(IdealGasEos::new(1.4)))
    }

    fn controller(flow: FlowSpec) -> AdvanceController {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let state = uniform_state(&schema, &geom, 2, flow);
        AdvanceController::new(
            schema,
            geom,
            state,
            0.0,
            Vec::new(),
            services(),
            AdvanceConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_state_with_wrong_components() {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let state = StateArray::new(*geom.valid(), 2, schema.ncomp() + 1);
        let r = AdvanceController::new(
            schema,
            geom,
            state,
            0.0,
            Vec::new(),
            services(),
            AdvanceConfig::default(),
        );
        match r {
            Err(ConfigError::StateMismatch { .. }) => {}
            other => panic!("expected StateMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_state_without_ghosts() {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let state = uniform_state(&schema, &geom, 0, FlowSpec::default());
        let r = AdvanceController::new(
            schema,
            geom,
            state,
            0.0,
            Vec::new(),
            services(),
            AdvanceConfig::default(),
        );
        assert!(matches!(r, Err(ConfigError::StateMismatch { .. })));
    }

    #[test]
    fn rejects_state_on_other_box() {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let other = LevelGeometry::single_patch(
            GridBox::with_size(1, [4, 1, 1]),
            [0.25; 3],
            geom.boundaries(),
        )
        .unwrap();
        let state = uniform_state(&schema, &other, 2, FlowSpec::default());
        let r = AdvanceController::new(
            schema,
            geom,
            state,
            0.0,
            Vec::new(),
            services(),
            AdvanceConfig::default(),
        );
        assert!(matches!(r, Err(ConfigError::StateMismatch { .. })));
    }

    #[test]
    fn rejects_invalid_config() {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let state = uniform_state(&schema, &geom, 2, FlowSpec::default());
        let config = AdvanceConfig {
            cfl: -1.0,
            ..AdvanceConfig::default()
        };
        let r = AdvanceController::new(schema, geom, state, 0.0, Vec::new(), services(), config);
        assert!(matches!(r, Err(ConfigError::InvalidCfl { .. })));
    }

    #[test]
    fn hydro_estimate_uses_fastest_signal() {
        let flow = FlowSpec {
            velocity: [0.5, 0.0, 0.0],
            ..FlowSpec::default()
        };
        let c = controller(flow);
        let est = c.estimate_dt().unwrap();
        let sound = (1.4f64 * 1.0 / 1.0).sqrt();
        let expected = 0.5 * 0.125 / (0.5 + sound);
        assert_eq!(est.limiter, DtLimiter::Hydro);
        assert!((est.dt - expected).abs() < 1e-12 * expected);
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let mut c = controller(FlowSpec::default());
        let fill = PhysicalBoundaryFill::for_schema(c.schema());
        let before = c.snapshot().clone();
        for dt in [0.0, -1.0, f64::NAN] {
            match c.advance(dt, LevelLinks::single(&fill)) {
                Err(AdvanceError::InvalidDt { .. }) => {}
                other => panic!("expected InvalidDt, got {other:?}"),
            }
        }
        assert_eq!(c.snapshot(), &before);
    }

    #[test]
    fn quiescent_step_keeps_state_and_advances_time() {
        let mut c = controller(FlowSpec::default());
        let fill = PhysicalBoundaryFill::for_schema(c.schema());
        let before = c.state().clone();
        let outcome = c.advance(0.01, LevelLinks::single(&fill)).unwrap();
        assert_eq!(outcome.dt_taken, 0.01);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.substeps, 1);
        assert_eq!(c.time(), 0.01);
        assert_eq!(c.snapshot().t_old(), 0.0);
        for p in before.valid().cells() {
            for comp in 0..before.ncomp() {
                assert!((c.state().get(p, comp) - before.get(p, comp)).abs() < 1e-14);
            }
        }
        assert!(c.last_metrics().max_cfl > 0.0);
        assert_eq!(c.last_metrics().dt_taken, 0.01);
    }

    #[test]
    fn next_estimate_is_capped_by_growth_limit() {
        let mut c = controller(FlowSpec::default());
        let fill = PhysicalBoundaryFill::for_schema(c.schema());
        c.advance(1e-4, LevelLinks::single(&fill)).unwrap();
        let est = c.estimate_dt().unwrap();
        assert_eq!(est.limiter, DtLimiter::ChangeMax);
        assert!((est.dt - 1.1e-4).abs() < 1e-18);
    }

    #[test]
    fn bad_density_count_ignores_ghost_cells() {
        let schema = schema();
        let geom = periodic_geometry(1, 8);
        let mut state = uniform_state(&schema, &geom, 2, FlowSpec::default());
        let rho = schema.density();
        for p in [[-2, 0, 0], [-1, 0, 0], [8, 0, 0]] {
            state.set(p, rho, -1.0);
        }
        assert_eq!(non_positive_density(&schema, &state), 0);
        state.set([3, 0, 0], rho, 0.0);
        state.set([5, 0, 0], rho, f64::NAN);
        assert_eq!(non_positive_density(&schema, &state), 2);
    }
}
