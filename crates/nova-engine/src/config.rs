//! Advance configuration, validation, and error types.
//!
//! [`AdvanceConfig`] is the per-level input to
//! [`AdvanceController::new`](crate::AdvanceController::new), which calls
//! [`validate()`](AdvanceConfig::validate) before building anything.

use std::error::Error;
use std::fmt;

use nova_flux::FluxError;
use nova_grid::GridError;
use nova_source::{PlanError, SourceOrder};
use nova_state::RepairConfig;

/// Absolute slack used when checking tableau consistency.
const TABLEAU_TOLERANCE: f64 = 1e-12;

// ── ButcherTableau ─────────────────────────────────────────────────

/// Coefficients of an explicit Runge-Kutta method.
///
/// Stage `i` evaluates fluxes on `u0 - dt * sum_j a[i][j] div F_j` at time
/// `t0 + c[i] * dt`; the step applies `sum_i b[i] F_i`.
#[derive(Clone, Debug, PartialEq)]
pub struct ButcherTableau {
    /// Stage coupling, strictly lower triangular.
    pub a: Vec<Vec<f64>>,
    /// Stage weights.
    pub b: Vec<f64>,
    /// Stage times as fractions of `dt`.
    pub c: Vec<f64>,
}

impl ButcherTableau {
    /// One-stage forward Euler.
    pub fn forward_euler() -> Self {
        Self {
            a: vec![vec![0.0]],
            b: vec![1.0],
            c: vec![0.0],
        }
    }

    /// Two-stage strong-stability-preserving RK (Heun).
    pub fn ssp_rk2() -> Self {
        Self {
            a: vec![vec![0.0, 0.0], vec![1.0, 0.0]],
            b: vec![0.5, 0.5],
            c: vec![0.0, 1.0],
        }
    }

    /// Three-stage strong-stability-preserving RK (Shu-Osher).
    pub fn ssp_rk3() -> Self {
        Self {
            a: vec![
                vec![0.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0],
                vec![0.25, 0.25, 0.0],
            ],
            b: vec![1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
            c: vec![0.0, 1.0, 0.5],
        }
    }

    /// Classical fourth-order RK.
    pub fn rk4() -> Self {
        Self {
            a: vec![
                vec![0.0, 0.0, 0.0, 0.0],
                vec![0.5, 0.0, 0.0, 0.0],
                vec![0.0, 0.5, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
            ],
            b: vec![1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
            c: vec![0.0, 0.5, 0.5, 1.0],
        }
    }

    /// Number of stages.
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// Check shape, explicitness, and the consistency conditions
    /// `sum b = 1` and `c[i] = sum_j a[i][j]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidTableau { reason });
        let s = self.b.len();
        if s == 0 {
            return invalid("tableau has no stages".to_string());
        }
        if self.a.len() != s || self.c.len() != s {
            return invalid(format!(
                "stage counts disagree: {} rows of a, {} weights, {} nodes",
                self.a.len(),
                s,
                self.c.len()
            ));
        }
        for (i, row) in self.a.iter().enumerate() {
            if row.len() != s {
                return invalid(format!("row {i} of a has {} entries, expected {s}", row.len()));
            }
            if row.iter().chain([&self.b[i], &self.c[i]]).any(|v| !v.is_finite()) {
                return invalid(format!("stage {i} has a non-finite coefficient"));
            }
            if row[i..].iter().any(|&v| v != 0.0) {
                return invalid(format!("row {i} of a is not strictly lower triangular"));
            }
            let sum: f64 = row.iter().sum();
            if (sum - self.c[i]).abs() > TABLEAU_TOLERANCE {
                return invalid(format!(
                    "node c[{i}] = {} differs from the row sum {sum}",
                    self.c[i]
                ));
            }
        }
        let total: f64 = self.b.iter().sum();
        if (total - 1.0).abs() > TABLEAU_TOLERANCE {
            return invalid(format!("weights sum to {total}, expected 1"));
        }
        Ok(())
    }
}

// ── IntegratorConfig ───────────────────────────────────────────────

/// Time-integration strategy of a level.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum IntegratorConfig {
    /// Predictor-corrector: one hyperbolic update, sources time-centered
    /// around it.
    #[default]
    SingleStage,
    /// Method of lines: one hyperbolic evaluation per stage, sources
    /// applied once before and once after the stage combination.
    MethodOfLines(ButcherTableau),
}

impl IntegratorConfig {
    /// The tableau driving the hyperbolic stages.
    pub fn tableau(&self) -> ButcherTableau {
        match self {
            Self::SingleStage => ButcherTableau::forward_euler(),
            Self::MethodOfLines(t) => t.clone(),
        }
    }
}

// ── RetryConfig ────────────────────────────────────────────────────

/// Thresholds and budgets of the [`RetryManager`](crate::RetryManager).
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Retry or subcycle on violations. When `false`, soft violations are
    /// accepted with a warning and hard ones are fatal. Default: true.
    pub enabled: bool,
    /// Soft CFL target. Default: 1.0.
    pub max_cfl: f64,
    /// Hard CFL ceiling, never accepted. Default: 2.0.
    pub hard_cfl: f64,
    /// Plain retries with a reduced timestep before switching to
    /// sub-steps. Default: 4.
    pub max_retries: usize,
    /// Factor applied to `dt` on each retry. Default: 0.5.
    pub dt_reduction: f64,
    /// Largest number of sub-steps one step may be split into. Default: 16.
    pub max_subcycles: usize,
    /// Split into sub-steps on the first violation instead of shrinking
    /// the step. Default: false.
    pub primary_subcycle: bool,
    /// Repair severity above which the attempt is retried. Default: 0.1.
    pub max_repair_severity: f64,
    /// Treat solver non-convergence as retryable. When `false` it is
    /// surfaced as [`AdvanceError::SolveFailed`](crate::AdvanceError::SolveFailed).
    /// Default: true.
    pub retry_on_solve_failure: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cfl: 1.0,
            hard_cfl: 2.0,
            max_retries: 4,
            dt_reduction: 0.5,
            max_subcycles: 16,
            primary_subcycle: false,
            max_repair_severity: 0.1,
            retry_on_solve_failure: true,
        }
    }
}

impl RetryConfig {
    /// Check every threshold and budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidRetry { reason });
        if !self.max_cfl.is_finite() || self.max_cfl <= 0.0 {
            return invalid(format!("max_cfl must be finite and positive, got {}", self.max_cfl));
        }
        if !self.hard_cfl.is_finite() || self.hard_cfl < self.max_cfl {
            return invalid(format!(
                "hard_cfl must be finite and at least max_cfl ({}), got {}",
                self.max_cfl, self.hard_cfl
            ));
        }
        if !(self.dt_reduction > 0.0 && self.dt_reduction < 1.0) {
            return invalid(format!(
                "dt_reduction must be in (0, 1), got {}",
                self.dt_reduction
            ));
        }
        if self.max_subcycles < 2 {
            return invalid(format!(
                "max_subcycles must be at least 2, got {}",
                self.max_subcycles
            ));
        }
        if !(0.0..=1.0).contains(&self.max_repair_severity) {
            return invalid(format!(
                "max_repair_severity must be in [0, 1], got {}",
                self.max_repair_severity
            ));
        }
        Ok(())
    }
}

// ── AdvanceConfig ──────────────────────────────────────────────────

/// Configuration of one level's advance.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceConfig {
    /// CFL number used by timestep estimates. Default: 0.5.
    pub cfl: f64,
    /// Largest growth of `dt` from one step to the next. Default: 1.1.
    pub change_max: f64,
    /// Integration strategy.
    pub integrator: IntegratorConfig,
    /// Retry thresholds and budgets.
    pub retry: RetryConfig,
    /// Repair floors and tolerances.
    pub repair: RepairConfig,
    /// Source construction order.
    pub source_order: SourceOrder,
}

impl Default for AdvanceConfig {
    fn default() -> Self {
        Self {
            cfl: 0.5,
            change_max: 1.1,
            integrator: IntegratorConfig::default(),
            retry: RetryConfig::default(),
            repair: RepairConfig::default(),
            source_order: SourceOrder::Canonical,
        }
    }
}

impl AdvanceConfig {
    /// Check every nested configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cfl.is_finite() || self.cfl <= 0.0 || self.cfl > self.retry.hard_cfl {
            return Err(ConfigError::InvalidCfl { value: self.cfl });
        }
        if !self.change_max.is_finite() || self.change_max < 1.0 {
            return Err(ConfigError::InvalidChangeMax {
                value: self.change_max,
            });
        }
        self.integrator.tableau().validate()?;
        self.retry.validate()?;
        self.repair
            .validate()
            .map_err(|reason| ConfigError::InvalidRepair { reason })?;
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a controller or hierarchy.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `cfl` is non-finite, non-positive, or above the hard ceiling.
    InvalidCfl {
        /// The invalid value.
        value: f64,
    },
    /// `change_max` is non-finite or below 1.
    InvalidChangeMax {
        /// The invalid value.
        value: f64,
    },
    /// The Butcher tableau is malformed or inconsistent.
    InvalidTableau {
        /// Which condition failed.
        reason: String,
    },
    /// A retry threshold or budget is out of range.
    InvalidRetry {
        /// Which condition failed.
        reason: String,
    },
    /// A repair floor or tolerance is out of range.
    InvalidRepair {
        /// Which condition failed.
        reason: String,
    },
    /// The initial state does not match the schema or geometry.
    StateMismatch {
        /// What disagrees.
        reason: String,
    },
    /// The level list cannot form a hierarchy.
    InvalidHierarchy {
        /// What is wrong.
        reason: String,
    },
    /// Source plan validation failed.
    Sources(PlanError),
    /// Adjacent levels are not properly nested.
    Grid(GridError),
    /// A flux register could not be built.
    Flux(FluxError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCfl { value } => {
                write!(f, "cfl must be in (0, hard_cfl], got {value}")
            }
            Self::InvalidChangeMax { value } => {
                write!(f, "change_max must be finite and >= 1, got {value}")
            }
            Self::InvalidTableau { reason } => write!(f, "invalid Butcher tableau: {reason}"),
            Self::InvalidRetry { reason } => write!(f, "invalid retry config: {reason}"),
            Self::InvalidRepair { reason } => write!(f, "invalid repair config: {reason}"),
            Self::StateMismatch { reason } => write!(f, "initial state mismatch: {reason}"),
            Self::InvalidHierarchy { reason } => write!(f, "invalid hierarchy: {reason}"),
            Self::Sources(e) => write!(f, "source plan: {e}"),
            Self::Grid(e) => write!(f, "nesting: {e}"),
            Self::Flux(e) => write!(f, "flux register: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sources(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Flux(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlanError> for ConfigError {
    fn from(e: PlanError) -> Self {
        Self::Sources(e)
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<FluxError> for ConfigError {
    fn from(e: FluxError) -> Self {
        Self::Flux(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AdvanceConfig::default().validate().is_ok());
    }

    #[test]
    fn builtin_tableaus_are_consistent() {
        for t in [
            ButcherTableau::forward_euler(),
            ButcherTableau::ssp_rk2(),
            ButcherTableau::ssp_rk3(),
            ButcherTableau::rk4(),
        ] {
            assert!(t.validate().is_ok(), "{t:?}");
        }
        assert_eq!(ButcherTableau::rk4().stages(), 4);
    }

    #[test]
    fn implicit_tableau_rejected() {
        let t = ButcherTableau {
            a: vec![vec![1.0]],
            b: vec![1.0],
            c: vec![1.0],
        };
        match t.validate() {
            Err(ConfigError::InvalidTableau { reason }) => {
                assert!(reason.contains("lower triangular"))
            }
            other => panic!("expected InvalidTableau, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_nodes_rejected() {
        let mut t = ButcherTableau::ssp_rk2();
        t.c[1] = 0.5;
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidTableau { .. })
        ));
        let mut t = ButcherTableau::ssp_rk2();
        t.b[0] = 0.4;
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidTableau { .. })
        ));
    }

    #[test]
    fn hard_ceiling_below_target_rejected() {
        let cfg = RetryConfig {
            hard_cfl: 0.5,
            ..RetryConfig::default()
        };
        match cfg.validate() {
            Err(ConfigError::InvalidRetry { reason }) => assert!(reason.contains("hard_cfl")),
            other => panic!("expected InvalidRetry, got {other:?}"),
        }
    }

    #[test]
    fn reduction_must_shrink() {
        for r in [0.0, 1.0, f64::NAN] {
            let cfg = RetryConfig {
                dt_reduction: r,
                ..RetryConfig::default()
            };
            assert!(cfg.validate().is_err(), "dt_reduction {r}");
        }
    }

    #[test]
    fn advance_config_checks_nested() {
        let cfg = AdvanceConfig {
            cfl: 0.0,
            ..AdvanceConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidCfl { value: 0.0 }));
        let cfg = AdvanceConfig {
            repair: RepairConfig {
                small_dens: -1.0,
                ..RepairConfig::default()
            },
            ..AdvanceConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRepair { .. })
        ));
    }
}
