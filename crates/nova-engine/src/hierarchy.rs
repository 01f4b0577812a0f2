//! Recursive time advance over a stack of refinement levels.
//!
//! Level `l + 1` takes `ratio` steps of `dt / ratio` for every step of
//! level `l`. Each step of a coarse level is followed by its finer
//! levels, then reflux from the shared register and average-down of
//! the fine solution onto the cells it covers.

use nova_core::{GhostFill, StateArray};
use nova_flux::FluxRegister;
use nova_grid::{average_down, check_nesting, CoarseFineFill, PhysicalBoundaryFill};

use crate::config::ConfigError;
use crate::controller::{AdvanceController, LevelLinks};
use crate::error::AdvanceError;

/// A level stack with one flux register per coarse/fine pair.
pub struct AmrHierarchy {
    levels: Vec<AdvanceController>,
    registers: Vec<FluxRegister>,
    ratio: i64,
    physical: PhysicalBoundaryFill,
}

impl AmrHierarchy {
    /// Stack `levels`, coarsest first, with refinement `ratio` between
    /// neighbours.
    ///
    /// Levels must be numbered `0..n`, properly nested, and share one
    /// schema. Every level above the base gets a fixed step interval,
    /// and coarse data under fine patches is replaced by the average of
    /// the fine data.
    pub fn new(mut levels: Vec<AdvanceController>, ratio: i64) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHierarchy { reason };
        if levels.is_empty() {
            return Err(invalid("no levels".to_string()));
        }
        if ratio < 2 {
            return Err(invalid(format!("refinement ratio {ratio} is below 2")));
        }
        for (i, level) in levels.iter().enumerate() {
            if level.level().index() != i {
                return Err(invalid(format!(
                    "position {i} holds level {}",
                    level.level()
                )));
            }
        }
        let schema = levels[0].schema().clone();
        if levels.iter().any(|l| l.schema().as_ref() != schema.as_ref()) {
            return Err(invalid("levels disagree on the state schema".to_string()));
        }
        let mut registers = Vec::with_capacity(levels.len() - 1);
        for pair in levels.windows(2) {
            check_nesting(pair[0].geom(), pair[1].geom(), ratio)?;
            registers.push(FluxRegister::new(
                pair[0].geom(),
                pair[1].geom(),
                ratio,
                schema.ncomp(),
            )?);
        }
        for level in levels.iter_mut().skip(1) {
            level.set_fixed_interval(true);
        }
        for l in (1..levels.len()).rev() {
            let (lo, hi) = levels.split_at_mut(l);
            average_down(hi[0].state(), lo[l - 1].state_mut(), ratio)?;
            lo[l - 1]
                .post_reflux()
                .map_err(|e| ConfigError::StateMismatch {
                    reason: e.to_string(),
                })?;
        }
        log::info!(
            "hierarchy of {} level(s), refinement ratio {ratio}",
            levels.len()
        );
        Ok(Self {
            levels,
            registers,
            ratio,
            physical: PhysicalBoundaryFill::for_schema(&schema),
        })
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Refinement ratio between neighbouring levels.
    pub fn ratio(&self) -> i64 {
        self.ratio
    }

    /// Time of the base level.
    pub fn time(&self) -> f64 {
        self.levels[0].time()
    }

    /// All levels, coarsest first.
    pub fn levels(&self) -> &[AdvanceController] {
        &self.levels
    }

    /// Level `l`, if present.
    pub fn level(&self, l: usize) -> Option<&AdvanceController> {
        self.levels.get(l)
    }

    /// Largest base-level step every level allows.
    pub fn estimate_dt(&self) -> Result<f64, AdvanceError> {
        let mut dt = f64::INFINITY;
        let mut factor = 1.0;
        for level in &self.levels {
            dt = dt.min(level.estimate_dt()?.dt * factor);
            factor *= self.ratio as f64;
        }
        Ok(dt)
    }

    /// Advance the whole stack by one base-level step of at most `dt`.
    /// Returns the step taken.
    ///
    /// An error leaves the failing level as it was before its step but
    /// coarser levels already advanced; the hierarchy should not be
    /// stepped further.
    pub fn advance(&mut self, dt: f64) -> Result<f64, AdvanceError> {
        let taken = self.advance_level(0, dt, 0, 1)?;
        log::debug!(
            "hierarchy advanced {taken:.6e} to t = {:.6e}",
            self.time()
        );
        Ok(taken)
    }

    fn advance_level(
        &mut self,
        l: usize,
        dt: f64,
        iteration: usize,
        ncycle: usize,
    ) -> Result<f64, AdvanceError> {
        let has_finer = l + 1 < self.levels.len();
        if has_finer {
            self.registers[l].reset();
        }
        let taken = {
            let (coarser, rest) = self.levels.split_at_mut(l);
            let (below, above) = self.registers.split_at_mut(l);
            let cf;
            let fill: &dyn GhostFill = match coarser.last() {
                None => &self.physical,
                Some(c) => {
                    let snap = c.snapshot();
                    cf = CoarseFineFill::new(
                        self.physical.clone(),
                        snap.old(),
                        snap.new_state(),
                        snap.t_old(),
                        snap.t_new(),
                        self.ratio,
                    );
                    &cf
                }
            };
            let links = LevelLinks {
                fill,
                as_coarse: above.first_mut(),
                as_fine: below.last_mut(),
                iteration,
                ncycle,
            };
            rest[0].advance(dt, links)?.dt_taken
        };
        if !has_finer {
            return Ok(taken);
        }
        let n = self.ratio as usize;
        let fine_dt = taken / self.ratio as f64;
        for i in 0..n {
            self.advance_level(l + 1, fine_dt, i, n)?;
        }
        let (lo, hi) = self.levels.split_at_mut(l + 1);
        let coarse = &mut lo[l];
        let refluxed = self.registers[l].reflux(coarse.state_mut())?;
        average_down(hi[0].state(), coarse.state_mut(), self.ratio)?;
        coarse.post_reflux()?;
        log::trace!("level {l}: refluxed {refluxed} cell(s)");
        Ok(taken)
    }

    /// Volume-weighted total of component `comp` over the composite
    /// grid: every level's valid cells not covered by a finer level.
    pub fn sum_conserved(&self, comp: usize) -> f64 {
        let mut total = 0.0;
        for (l, level) in self.levels.iter().enumerate() {
            let covered = self
                .levels
                .get(l + 1)
                .map(|fine| fine.geom().valid().coarsen(self.ratio));
            total += level.geom().cell_volume() * uncovered_sum(level.state(), comp, covered);
        }
        total
    }
}

fn uncovered_sum(state: &StateArray, comp: usize, covered: Option<nova_core::GridBox>) -> f64 {
    state
        .valid()
        .cells()
        .filter(|p| !covered.is_some_and(|c| c.contains(*p)))
        .map(|p| state.get(p, comp))
        .sum()
}

impl std::fmt::Debug for AmrHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmrHierarchy")
            .field("levels", &self.levels.len())
            .field("ratio", &self.ratio)
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}
