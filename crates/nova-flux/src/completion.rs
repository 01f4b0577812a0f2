//! Sub-cycle completion signals.
//!
//! Each accepted fine sub-step sends a [`SubcycleComplete`] over a
//! crossbeam channel. The register drains the channel before refluxing
//! and compares the covered fine time with the coarse step.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use nova_core::LevelId;

/// One accepted fine sub-step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubcycleComplete {
    /// The fine level.
    pub level: LevelId,
    /// Sub-step index within the coarse step.
    pub substep: usize,
    /// Fine time the sub-step covered.
    pub dt: f64,
}

/// Sending half, held by whoever advances the fine level.
#[derive(Clone, Debug)]
pub struct CompletionSender {
    tx: Sender<SubcycleComplete>,
}

impl CompletionSender {
    /// Post a completed sub-step. Returns `false` if the register is gone.
    pub fn send(&self, msg: SubcycleComplete) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Receiving half plus the running tally.
#[derive(Debug)]
pub(crate) struct CompletionTracker {
    tx: Sender<SubcycleComplete>,
    rx: Receiver<SubcycleComplete>,
    expected: f64,
    covered: f64,
    substeps: usize,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            expected: 0.0,
            covered: 0.0,
            substeps: 0,
        }
    }

    pub(crate) fn sender(&self) -> CompletionSender {
        CompletionSender {
            tx: self.tx.clone(),
        }
    }

    /// Start a new coarse step of length `expected`, discarding stale posts.
    pub(crate) fn reset(&mut self, expected: f64) {
        while self.rx.try_recv().is_ok() {}
        self.expected = expected;
        self.covered = 0.0;
        self.substeps = 0;
    }

    /// Fold every pending post into the tally.
    pub(crate) fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.covered += msg.dt;
                    self.substeps += 1;
                    log::trace!(
                        "level {} sub-step {} complete (dt = {:.6e})",
                        msg.level,
                        msg.substep,
                        msg.dt
                    );
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub(crate) fn add_expected(&mut self, dt: f64) {
        self.expected += dt;
    }

    pub(crate) fn expected(&self) -> f64 {
        self.expected
    }

    pub(crate) fn covered(&self) -> f64 {
        self.covered
    }

    pub(crate) fn substeps(&self) -> usize {
        self.substeps
    }
}
