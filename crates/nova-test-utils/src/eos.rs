//! Gamma-law equation of state with unit gas constant.

use nova_core::{Eos, EosError, EosInput, EosState};

/// Ideal gas: `p = (gamma - 1) rho e`, `T = (gamma - 1) e`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdealGasEos {
    pub gamma: f64,
}

impl IdealGasEos {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Eos for IdealGasEos {
    fn evaluate(&self, input: EosInput, _composition: &[f64]) -> Result<EosState, EosError> {
        let g1 = self.gamma - 1.0;
        let (rho, e) = match input {
            EosInput::RhoE { rho, e } => (rho, e),
            EosInput::RhoT { rho, t } => (rho, t / g1),
        };
        if !rho.is_finite() || rho <= 0.0 {
            return Err(EosError::UnphysicalInput {
                reason: format!("density {rho}"),
            });
        }
        if !e.is_finite() || e < 0.0 {
            return Err(EosError::UnphysicalInput {
                reason: format!("specific internal energy {e}"),
            });
        }
        let pressure = g1 * rho * e;
        Ok(EosState {
            pressure,
            temperature: g1 * e,
            eint: e,
            sound_speed: (self.gamma * pressure / rho).sqrt(),
            gamma: self.gamma,
        })
    }
}
