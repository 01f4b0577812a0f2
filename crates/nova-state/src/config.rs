//! Repair thresholds.

/// Floors and tolerances used by [`RepairPolicy`](crate::RepairPolicy).
#[derive(Clone, Debug, PartialEq)]
pub struct RepairConfig {
    /// Density floor. Default: 1e-10.
    pub small_dens: f64,
    /// Specific internal energy floor. Default: 1e-12.
    pub small_eint: f64,
    /// Dual-energy switch: `E - KE` replaces the internal energy when it
    /// exceeds `eta * E`. Default: 1e-3.
    pub dual_energy_eta: f64,
    /// Allowed relative deviation of the species sum from the density
    /// before renormalization. Default: 1e-8.
    pub species_tolerance: f64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            small_dens: 1e-10,
            small_eint: 1e-12,
            dual_energy_eta: 1e-3,
            species_tolerance: 1e-8,
        }
    }
}

impl RepairConfig {
    /// Check that every floor is finite and positive and the tolerances
    /// lie in range.
    pub fn validate(&self) -> Result<(), String> {
        if !self.small_dens.is_finite() || self.small_dens <= 0.0 {
            return Err(format!(
                "small_dens must be finite and positive, got {}",
                self.small_dens
            ));
        }
        if !self.small_eint.is_finite() || self.small_eint <= 0.0 {
            return Err(format!(
                "small_eint must be finite and positive, got {}",
                self.small_eint
            ));
        }
        if !(0.0..1.0).contains(&self.dual_energy_eta) {
            return Err(format!(
                "dual_energy_eta must be in [0, 1), got {}",
                self.dual_energy_eta
            ));
        }
        if !self.species_tolerance.is_finite() || self.species_tolerance <= 0.0 {
            return Err(format!(
                "species_tolerance must be finite and positive, got {}",
                self.species_tolerance
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RepairConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_nonpositive_floor() {
        let cfg = RepairConfig {
            small_dens: 0.0,
            ..RepairConfig::default()
        };
        assert!(cfg.validate().unwrap_err().contains("small_dens"));
        let cfg = RepairConfig {
            dual_energy_eta: 1.0,
            ..RepairConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
