//! Reaction-network mocks.

use std::sync::atomic::{AtomicUsize, Ordering};

use nova_core::{BurnZone, ReactionError, ReactionNetwork};

/// Releases `rate * dt` specific energy and leaves composition unchanged.
#[derive(Clone, Copy, Debug)]
pub struct ConstantReleaseNetwork {
    pub rate: f64,
}

impl ConstantReleaseNetwork {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl ReactionNetwork for ConstantReleaseNetwork {
    fn burn(&self, zone: BurnZone<'_>) -> Result<f64, ReactionError> {
        Ok(self.rate * zone.dt)
    }
}

/// Fails every burn after a configurable number of successful ones.
pub struct FailingNetwork {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingNetwork {
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl ReactionNetwork for FailingNetwork {
    fn burn(&self, _zone: BurnZone<'_>) -> Result<f64, ReactionError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(ReactionError::BurnFailed {
                reason: format!(
                    "deliberate failure after {} successful burns",
                    self.succeed_count
                ),
            });
        }
        Ok(0.0)
    }
}
