//! The two time levels of one level's conserved state.

use nova_core::{ArrayError, StateArray, TimeLevel};

/// Old- and new-time conserved state of one level.
///
/// `old` is read-only while a step runs; `new` is mutated in place. The
/// whole snapshot is plain owned data so a retry can save and restore it.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot {
    old: StateArray,
    new: StateArray,
    t_old: f64,
    t_new: f64,
}

impl StateSnapshot {
    /// Start with `initial` at both time levels and time `t`.
    pub fn new(initial: StateArray, t: f64) -> Self {
        Self {
            new: initial.clone(),
            old: initial,
            t_old: t,
            t_new: t,
        }
    }

    /// State at the start of the current step.
    pub fn old(&self) -> &StateArray {
        &self.old
    }

    /// State at the end of the current step.
    pub fn new_state(&self) -> &StateArray {
        &self.new
    }

    /// Mutable new-time state.
    pub fn new_mut(&mut self) -> &mut StateArray {
        &mut self.new
    }

    /// The requested time level.
    pub fn get(&self, which: TimeLevel) -> &StateArray {
        match which {
            TimeLevel::Old => &self.old,
            TimeLevel::New => &self.new,
        }
    }

    /// Mutable access to the requested time level.
    pub fn get_mut(&mut self, which: TimeLevel) -> &mut StateArray {
        match which {
            TimeLevel::Old => &mut self.old,
            TimeLevel::New => &mut self.new,
        }
    }

    /// Time of the old state.
    pub fn t_old(&self) -> f64 {
        self.t_old
    }

    /// Time of the new state.
    pub fn t_new(&self) -> f64 {
        self.t_new
    }

    /// Begin a step of size `dt`: the current new state becomes old, and
    /// new starts as a copy of it.
    pub fn begin_step(&mut self, dt: f64) -> Result<(), ArrayError> {
        self.old.copy_from(&self.new)?;
        self.t_old = self.t_new;
        self.t_new = self.t_old + dt;
        Ok(())
    }

    /// Close a step that was advanced in sub-steps: old becomes `start`
    /// at `t_start` and new keeps the last sub-step's result at
    /// `t_start + dt`.
    pub fn rewind_interval(
        &mut self,
        start: &StateArray,
        t_start: f64,
        dt: f64,
    ) -> Result<(), ArrayError> {
        self.old.copy_from(start)?;
        self.t_old = t_start;
        self.t_new = t_start + dt;
        Ok(())
    }
}
