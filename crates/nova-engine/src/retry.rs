//! The retry state machine wrapped around every level step.
//!
//! ```text
//! Idle ─begin─▶ Proposed ─mark_attempted─▶ Attempted ─judge─┬▶ Accepted ─finish─▶ Idle
//!                  ▲                                        ├▶ RetryScheduled ──┐
//!                  └────────────── rollback ────────────────┼▶ SubcycleScheduled┘
//!                                                           └▶ Fatal ─abort─▶ Idle
//! ```
//!
//! The manager owns the saved pre-step snapshot. A rejected attempt is
//! rolled back to it before the next one is proposed, so every attempt
//! starts from bit-identical state. Both loops are bounded: at most
//! `max_retries` shrunken retries, then sub-step counts that at least
//! double until they exceed `max_subcycles`.

use std::fmt;

use nova_core::SourceError;
use nova_state::{RepairReport, StateSnapshot};

use crate::config::RetryConfig;

// ── Diagnostics ────────────────────────────────────────────────────

/// What an attempt observed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttemptDiagnostics {
    /// Largest CFL number of any hyperbolic evaluation.
    pub max_cfl: f64,
    /// Combined report of every repair pass.
    pub repair: RepairReport,
    /// Cells found with non-positive density before repair.
    pub negative_density_cells: usize,
    /// Reason the reaction network failed, if it did.
    pub reaction_failure: Option<String>,
    /// A gravity or diffusion solve that did not converge.
    pub solve_failure: Option<SourceError>,
}

impl AttemptDiagnostics {
    /// Whether every burn succeeded.
    pub fn reaction_success(&self) -> bool {
        self.reaction_failure.is_none()
    }

    /// Whether the attempt stopped early on a violation.
    pub fn aborted(&self) -> bool {
        self.negative_density_cells > 0
            || self.reaction_failure.is_some()
            || self.solve_failure.is_some()
    }
}

/// One judged attempt: the step it covered and what it observed.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceAttempt {
    /// Time interval the attempt covered.
    pub dt: f64,
    /// Sub-step index within the enclosing coarse step.
    pub iteration: usize,
    /// Sub-steps of the enclosing coarse step.
    pub ncycle: usize,
    /// Equal sub-steps the interval was split into.
    pub substeps: usize,
    /// Observations.
    pub diagnostics: AttemptDiagnostics,
}

impl AdvanceAttempt {
    /// Size of each sub-step.
    pub fn substep_dt(&self) -> f64 {
        self.dt / self.substeps.max(1) as f64
    }
}

// ── Violations ─────────────────────────────────────────────────────

/// A condition that rejects an attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    /// Density went non-positive before repair.
    NegativeDensity {
        /// Affected cells.
        cells: usize,
    },
    /// Cells held NaN or infinite values the repair could not fix.
    Unrepairable {
        /// Affected cells.
        cells: usize,
    },
    /// The reaction network failed.
    ReactionFailed {
        /// The network's report.
        reason: String,
    },
    /// CFL number above the hard ceiling.
    CflAboveCeiling {
        /// Observed CFL number.
        cfl: f64,
        /// Configured ceiling.
        ceiling: f64,
    },
    /// CFL number above the soft target.
    CflAboveTarget {
        /// Observed CFL number.
        cfl: f64,
        /// Configured target.
        target: f64,
    },
    /// Too large a share of cells needed a floor.
    RepairSeverity {
        /// Observed severity.
        severity: f64,
        /// Configured threshold.
        threshold: f64,
    },
    /// A linear solve did not converge.
    SolveFailed {
        /// The solver's report.
        reason: String,
    },
}

impl Violation {
    /// Hard violations are never accepted.
    pub fn is_hard(&self) -> bool {
        !matches!(
            self,
            Self::CflAboveTarget { .. } | Self::RepairSeverity { .. }
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDensity { cells } => write!(f, "{cells} cells with negative density"),
            Self::Unrepairable { cells } => write!(f, "{cells} unrepairable cells"),
            Self::ReactionFailed { reason } => write!(f, "burn failed: {reason}"),
            Self::CflAboveCeiling { cfl, ceiling } => {
                write!(f, "CFL {cfl:.4} above ceiling {ceiling}")
            }
            Self::CflAboveTarget { cfl, target } => {
                write!(f, "CFL {cfl:.4} above target {target}")
            }
            Self::RepairSeverity {
                severity,
                threshold,
            } => write!(f, "repair severity {severity:.4} above {threshold}"),
            Self::SolveFailed { reason } => write!(f, "solve failed: {reason}"),
        }
    }
}

// ── Phases ─────────────────────────────────────────────────────────

/// Where the manager is in the life of one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RetryPhase {
    /// No step in progress.
    #[default]
    Idle,
    /// An attempt has been planned.
    Proposed {
        /// Interval of the planned attempt.
        dt: f64,
    },
    /// The attempt ran and awaits judgment.
    Attempted {
        /// Interval the attempt covered.
        dt: f64,
    },
    /// The attempt passed.
    Accepted {
        /// Interval taken.
        dt: f64,
    },
    /// Roll back and retry a shorter step.
    RetryScheduled {
        /// Interval of the next attempt.
        dt: f64,
    },
    /// Roll back and split the step into equal sub-steps.
    SubcycleScheduled {
        /// Number of sub-steps.
        substeps: usize,
        /// Size of each sub-step.
        dt: f64,
    },
    /// No further attempt is allowed.
    Fatal {
        /// Why.
        reason: String,
    },
}

/// Shape of the next attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttemptPlan {
    /// One step of size `dt`.
    Single {
        /// Step size.
        dt: f64,
    },
    /// `substeps` equal steps covering `interval`.
    Subcycle {
        /// Total interval.
        interval: f64,
        /// Number of sub-steps.
        substeps: usize,
    },
}

impl AttemptPlan {
    /// Interval the attempt covers.
    pub fn interval(&self) -> f64 {
        match *self {
            Self::Single { dt } => dt,
            Self::Subcycle { interval, .. } => interval,
        }
    }

    /// Number of sub-steps.
    pub fn substeps(&self) -> usize {
        match *self {
            Self::Single { .. } => 1,
            Self::Subcycle { substeps, .. } => substeps,
        }
    }
}

/// Counters of a retry in progress. Created on the first violation of a
/// step and dropped once the step is accepted or abandoned.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryState {
    /// Interval of the next attempt.
    pub retry_dt: f64,
    /// Shrunken retries used so far.
    pub retries: usize,
    /// Sub-steps of the next attempt; 1 for a single step.
    pub substeps: usize,
}

// ── RetryManager ───────────────────────────────────────────────────

/// Judges attempts and decides how the step proceeds.
#[derive(Debug)]
pub struct RetryManager {
    config: RetryConfig,
    fixed_interval: bool,
    phase: RetryPhase,
    step_dt: f64,
    saved: Option<StateSnapshot>,
    state: Option<RetryState>,
    last_dt_from_retry: Option<f64>,
    violations: Vec<Violation>,
}

impl RetryManager {
    /// Idle manager.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            fixed_interval: false,
            phase: RetryPhase::Idle,
            step_dt: 0.0,
            saved: None,
            state: None,
            last_dt_from_retry: None,
            violations: Vec::new(),
        }
    }

    /// Thresholds and budgets in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Require every step to cover its full interval, so violations are
    /// handled by sub-steps only. Set for levels whose step is dictated
    /// by the coarser level.
    pub fn set_fixed_interval(&mut self, fixed: bool) {
        self.fixed_interval = fixed;
    }

    /// Whether the step interval is fixed.
    pub fn fixed_interval(&self) -> bool {
        self.fixed_interval
    }

    /// Current phase.
    pub fn phase(&self) -> &RetryPhase {
        &self.phase
    }

    /// Counters of the retry in progress, if any.
    pub fn retry_state(&self) -> Option<&RetryState> {
        self.state.as_ref()
    }

    /// Violations found by the last judgment.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Sub-step size of the last step that needed a retry, for limiting
    /// the next timestep proposal.
    pub fn last_dt_from_retry(&self) -> Option<f64> {
        self.last_dt_from_retry
    }

    /// Start a step of size `dt` from `snapshot`, saving it for rollback.
    pub fn begin(&mut self, dt: f64, snapshot: &StateSnapshot) {
        self.step_dt = dt;
        self.saved = Some(snapshot.clone());
        self.state = None;
        self.last_dt_from_retry = None;
        self.violations.clear();
        self.phase = RetryPhase::Proposed { dt };
    }

    /// Shape of the next attempt.
    pub fn plan(&mut self) -> AttemptPlan {
        let plan = match &self.state {
            None => AttemptPlan::Single { dt: self.step_dt },
            Some(s) if s.substeps > 1 => AttemptPlan::Subcycle {
                interval: s.retry_dt,
                substeps: s.substeps,
            },
            Some(s) => AttemptPlan::Single { dt: s.retry_dt },
        };
        self.phase = RetryPhase::Proposed {
            dt: plan.interval(),
        };
        plan
    }

    /// Record that the planned attempt ran.
    pub fn mark_attempted(&mut self, dt: f64) {
        self.phase = RetryPhase::Attempted { dt };
    }

    /// Every violation in `diag`, hard ones first.
    pub fn classify(&self, diag: &AttemptDiagnostics) -> Vec<Violation> {
        let cfg = &self.config;
        let mut out = Vec::new();
        if diag.negative_density_cells > 0 {
            out.push(Violation::NegativeDensity {
                cells: diag.negative_density_cells,
            });
        }
        if diag.repair.unrepairable_cells > 0 {
            out.push(Violation::Unrepairable {
                cells: diag.repair.unrepairable_cells,
            });
        }
        if let Some(reason) = &diag.reaction_failure {
            out.push(Violation::ReactionFailed {
                reason: reason.clone(),
            });
        }
        if let Some(e) = &diag.solve_failure {
            out.push(Violation::SolveFailed {
                reason: e.to_string(),
            });
        }
        if diag.max_cfl > cfg.hard_cfl || diag.max_cfl.is_nan() {
            out.push(Violation::CflAboveCeiling {
                cfl: diag.max_cfl,
                ceiling: cfg.hard_cfl,
            });
        } else if diag.max_cfl > cfg.max_cfl {
            out.push(Violation::CflAboveTarget {
                cfl: diag.max_cfl,
                target: cfg.max_cfl,
            });
        }
        let severity = diag.repair.severity();
        if severity > cfg.max_repair_severity {
            out.push(Violation::RepairSeverity {
                severity,
                threshold: cfg.max_repair_severity,
            });
        }
        out
    }

    /// Decide the fate of `attempt`.
    pub fn judge(&mut self, attempt: &AdvanceAttempt) -> &RetryPhase {
        self.violations = self.classify(&attempt.diagnostics);
        self.phase = self.decide(attempt);
        &self.phase
    }

    fn decide(&mut self, attempt: &AdvanceAttempt) -> RetryPhase {
        let cfg = &self.config;
        if self.violations.is_empty() {
            return RetryPhase::Accepted { dt: attempt.dt };
        }
        let summary = self
            .violations
            .iter()
            .map(Violation::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        if attempt.diagnostics.solve_failure.is_some() && !cfg.retry_on_solve_failure {
            return RetryPhase::Fatal { reason: summary };
        }
        if !cfg.enabled {
            if self.violations.iter().any(Violation::is_hard) {
                return RetryPhase::Fatal { reason: summary };
            }
            for v in &self.violations {
                log::warn!("accepting step of dt {} despite {v}", attempt.dt);
            }
            return RetryPhase::Accepted { dt: attempt.dt };
        }
        let state = self.state.get_or_insert(RetryState {
            retry_dt: attempt.dt,
            retries: 0,
            substeps: 1,
        });
        let subcycle = attempt.substeps > 1
            || cfg.primary_subcycle
            || self.fixed_interval
            || state.retries >= cfg.max_retries;
        if !subcycle {
            state.retries += 1;
            state.retry_dt = attempt.dt * cfg.dt_reduction;
            log::warn!(
                "retry {}/{}: {summary}; dt {} -> {}",
                state.retries,
                cfg.max_retries,
                attempt.dt,
                state.retry_dt
            );
            return RetryPhase::RetryScheduled {
                dt: state.retry_dt,
            };
        }
        let current = attempt.substeps.max(1);
        let needed = (current as f64 / cfg.dt_reduction).ceil() as usize;
        let substeps = (2 * current).max(needed);
        if substeps > cfg.max_subcycles {
            return RetryPhase::Fatal {
                reason: format!(
                    "{summary}; {substeps} sub-steps needed, at most {} allowed",
                    cfg.max_subcycles
                ),
            };
        }
        state.substeps = substeps;
        state.retry_dt = attempt.dt;
        let dt = attempt.dt / substeps as f64;
        log::warn!("{summary}; splitting dt {} into {substeps} sub-steps", attempt.dt);
        RetryPhase::SubcycleScheduled { substeps, dt }
    }

    /// Restore the saved pre-step snapshot.
    pub fn rollback(&self, snapshot: &mut StateSnapshot) {
        if let Some(saved) = &self.saved {
            snapshot.clone_from(saved);
        }
    }

    /// Close an accepted step. Records the sub-step size when the step
    /// needed a retry.
    pub fn finish(&mut self, attempt: &AdvanceAttempt) {
        if self.state.take().is_some() {
            self.last_dt_from_retry = Some(attempt.substep_dt());
        }
        self.saved = None;
        self.phase = RetryPhase::Idle;
    }

    /// Abandon the step after a fatal judgment or an error.
    pub fn abort(&mut self) {
        self.state = None;
        self.saved = None;
        self.phase = RetryPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{GridBox, SolveError, SourceKind, StateArray};

    fn snapshot() -> StateSnapshot {
        let mut a = StateArray::new(GridBox::with_size(1, [2, 1, 1]), 0, 1);
        a.fill(1.0);
        StateSnapshot::new(a, 0.0)
    }

    fn attempt(dt: f64, substeps: usize, cfl: f64) -> AdvanceAttempt {
        AdvanceAttempt {
            dt,
            iteration: 0,
            ncycle: 1,
            substeps,
            diagnostics: AttemptDiagnostics {
                max_cfl: cfl,
                ..AttemptDiagnostics::default()
            },
        }
    }

    fn solve_failure() -> SourceError {
        SourceError::SolveFailed {
            kind: SourceKind::Diffusion,
            error: SolveError::NotConverged {
                solver: "diffusion".to_string(),
                residual: 1e-2,
                iterations: 50,
            },
        }
    }

    #[test]
    fn clean_attempt_is_accepted() {
        let mut m = RetryManager::new(RetryConfig::default());
        m.begin(0.1, &snapshot());
        assert_eq!(m.plan(), AttemptPlan::Single { dt: 0.1 });
        m.mark_attempted(0.1);
        assert_eq!(m.judge(&attempt(0.1, 1, 0.5)), &RetryPhase::Accepted { dt: 0.1 });
        m.finish(&attempt(0.1, 1, 0.5));
        assert_eq!(m.phase(), &RetryPhase::Idle);
        assert_eq!(m.last_dt_from_retry(), None);
    }

    #[test]
    fn soft_and_hard_violations_classified() {
        let m = RetryManager::new(RetryConfig::default());
        let soft = m.classify(&attempt(0.1, 1, 1.5).diagnostics);
        assert_eq!(soft.len(), 1);
        assert!(!soft[0].is_hard());
        let hard = m.classify(&attempt(0.1, 1, 2.5).diagnostics);
        assert!(matches!(hard[0], Violation::CflAboveCeiling { .. }));
        assert!(hard[0].is_hard());
        let mut diag = AttemptDiagnostics {
            negative_density_cells: 1,
            ..AttemptDiagnostics::default()
        };
        diag.repair.cells_examined = 4;
        diag.repair.floored_cells = 1;
        let v = m.classify(&diag);
        assert!(matches!(v[0], Violation::NegativeDensity { cells: 1 }));
        assert!(matches!(v[1], Violation::RepairSeverity { .. }));
    }

    #[test]
    fn retries_shrink_then_subcycle_then_fail() {
        let cfg = RetryConfig {
            max_retries: 2,
            max_subcycles: 4,
            ..RetryConfig::default()
        };
        let mut m = RetryManager::new(cfg);
        m.begin(1.0, &snapshot());
        let mut phases = Vec::new();
        for _ in 0..10 {
            let plan = m.plan();
            let a = attempt(plan.interval(), plan.substeps(), 5.0);
            m.mark_attempted(a.dt);
            let phase = m.judge(&a).clone();
            phases.push(phase.clone());
            if matches!(phase, RetryPhase::Fatal { .. }) {
                break;
            }
        }
        assert_eq!(
            &phases[..4],
            &[
                RetryPhase::RetryScheduled { dt: 0.5 },
                RetryPhase::RetryScheduled { dt: 0.25 },
                RetryPhase::SubcycleScheduled {
                    substeps: 2,
                    dt: 0.125
                },
                RetryPhase::SubcycleScheduled {
                    substeps: 4,
                    dt: 0.0625
                },
            ]
        );
        assert!(matches!(phases[4], RetryPhase::Fatal { .. }));
        assert_eq!(phases.len(), 5);
    }

    #[test]
    fn fixed_interval_goes_straight_to_subcycles() {
        let mut m = RetryManager::new(RetryConfig::default());
        m.set_fixed_interval(true);
        m.begin(0.1, &snapshot());
        let plan = m.plan();
        let phase = m.judge(&attempt(plan.interval(), plan.substeps(), 1.5)).clone();
        assert_eq!(
            phase,
            RetryPhase::SubcycleScheduled {
                substeps: 2,
                dt: 0.05
            }
        );
        assert_eq!(
            m.plan(),
            AttemptPlan::Subcycle {
                interval: 0.1,
                substeps: 2
            }
        );
        let accepted = attempt(0.1, 2, 0.75);
        assert!(matches!(m.judge(&accepted), RetryPhase::Accepted { .. }));
        m.finish(&accepted);
        assert_eq!(m.last_dt_from_retry(), Some(0.05));
    }

    #[test]
    fn disabled_retry_accepts_soft_and_rejects_hard() {
        let cfg = RetryConfig {
            enabled: false,
            ..RetryConfig::default()
        };
        let mut m = RetryManager::new(cfg);
        m.begin(0.1, &snapshot());
        assert!(matches!(
            m.judge(&attempt(0.1, 1, 1.5)),
            RetryPhase::Accepted { .. }
        ));
        assert!(matches!(
            m.judge(&attempt(0.1, 1, 3.0)),
            RetryPhase::Fatal { .. }
        ));
    }

    #[test]
    fn solve_failure_respects_policy() {
        let mut a = attempt(0.1, 1, 0.1);
        a.diagnostics.solve_failure = Some(solve_failure());

        let mut m = RetryManager::new(RetryConfig::default());
        m.begin(0.1, &snapshot());
        assert!(matches!(m.judge(&a), RetryPhase::RetryScheduled { .. }));

        let cfg = RetryConfig {
            retry_on_solve_failure: false,
            ..RetryConfig::default()
        };
        let mut m = RetryManager::new(cfg);
        m.begin(0.1, &snapshot());
        assert!(matches!(m.judge(&a), RetryPhase::Fatal { .. }));
    }

    #[test]
    fn rollback_restores_saved_snapshot() {
        let mut m = RetryManager::new(RetryConfig::default());
        let mut snap = snapshot();
        let before = snap.clone();
        m.begin(0.1, &snap);
        snap.begin_step(0.1).unwrap();
        snap.new_mut().fill(-3.0);
        m.rollback(&mut snap);
        assert_eq!(snap, before);
    }

    #[test]
    fn budget_always_terminates() {
        use proptest::prelude::*;
        proptest!(|(retries in 0usize..6, subcycles in 2usize..40, reduction in 0.1f64..0.9)| {
            let cfg = RetryConfig {
                max_retries: retries,
                max_subcycles: subcycles,
                dt_reduction: reduction,
                ..RetryConfig::default()
            };
            let mut m = RetryManager::new(cfg);
            m.begin(1.0, &snapshot());
            let mut attempts = 0;
            loop {
                let plan = m.plan();
                attempts += 1;
                let a = attempt(plan.interval(), plan.substeps(), f64::INFINITY);
                if matches!(m.judge(&a), RetryPhase::Fatal { .. }) {
                    break;
                }
                prop_assert!(attempts <= retries + 1 + 8);
            }
        });
    }
}
