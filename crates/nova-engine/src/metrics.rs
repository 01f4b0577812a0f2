//! Per-step performance and retry metrics for a level advance.
//!
//! [`AdvanceMetrics`] captures timing and retry data for one call to
//! [`AdvanceController::advance`](crate::AdvanceController::advance).

use nova_state::RepairReport;

/// Timing and retry metrics collected during a single level step.
///
/// All durations are in microseconds and summed over every attempt,
/// rejected ones included.
#[derive(Clone, Debug, Default)]
pub struct AdvanceMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Time spent in ghost fills, in microseconds.
    pub fill_us: u64,
    /// Time spent constructing and applying sources, in microseconds.
    pub sources_us: u64,
    /// Time spent in primitive conversion, flux evaluation, and the flux
    /// update, in microseconds.
    pub hydro_us: u64,
    /// Time spent in repair and temperature refreshes, in microseconds.
    pub repair_us: u64,
    /// Time spent burning, in microseconds.
    pub reactions_us: u64,
    /// Attempts made, the accepted one included.
    pub attempts: u32,
    /// Rejected attempts.
    pub retries: u32,
    /// Sub-steps of the accepted attempt.
    pub substeps: u32,
    /// Largest CFL number observed by the accepted attempt.
    pub max_cfl: f64,
    /// Step size actually taken.
    pub dt_taken: f64,
    /// Repair counts of the accepted attempt.
    pub repair: RepairReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = AdvanceMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.fill_us, 0);
        assert_eq!(m.sources_us, 0);
        assert_eq!(m.hydro_us, 0);
        assert_eq!(m.repair_us, 0);
        assert_eq!(m.reactions_us, 0);
        assert_eq!(m.attempts, 0);
        assert_eq!(m.retries, 0);
        assert_eq!(m.substeps, 0);
        assert_eq!(m.max_cfl, 0.0);
        assert_eq!(m.dt_taken, 0.0);
        assert!(m.repair.is_clean());
    }

    #[test]
    fn metrics_fields_accessible() {
        let m = AdvanceMetrics {
            total_us: 250,
            attempts: 3,
            retries: 2,
            substeps: 1,
            max_cfl: 0.8,
            dt_taken: 0.0125,
            ..AdvanceMetrics::default()
        };
        assert_eq!(m.attempts - m.retries, 1);
        assert_eq!(m.dt_taken, 0.0125);
    }
}
