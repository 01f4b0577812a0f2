//! Relaxation of the internal energy toward a target temperature.

use std::sync::Arc;

use nova_core::{Eos, EosInput, SourceError, SourceKind};
use nova_source::{SourceContext, SourceTerm};

use crate::config::ThermoConfig;
use crate::fields::mass_fractions;

/// Drives `e` toward `e(rho, T_target)` on the configured timescale.
///
/// The rate is the backward-Euler one, `rho (e_target - e) / (tau + dt)`,
/// so a single step never overshoots the target.
pub struct ThermoSource {
    eos: Arc<dyn Eos>,
    config: ThermoConfig,
}

impl ThermoSource {
    /// Relaxation through `eos`.
    pub fn new(eos: Arc<dyn Eos>, config: ThermoConfig) -> Self {
        Self { eos, config }
    }
}

impl SourceTerm for ThermoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Thermo
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, state) = (ctx.schema(), ctx.state());
        let denom = self.config.timescale + ctx.dt();
        let out = ctx.output();
        for p in state.valid().cells() {
            let cell = state.cell(p);
            let rho = cell[schema.density()];
            let e = cell[schema.eint()] / rho;
            let x = mass_fractions(schema, cell);
            let target = self
                .eos
                .evaluate(
                    EosInput::RhoT {
                        rho,
                        t: self.config.target_temperature,
                    },
                    &x,
                )
                .map_err(|error| SourceError::Eos {
                    kind: SourceKind::Thermo,
                    error,
                })?;
            let rate = rho * (target.eint - e) / denom;
            let o = out.cell_mut(p);
            o[schema.eint()] = rate;
            o[schema.eden()] = rate;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{StateSchema, TimeLevel};
    use nova_source::{SourceOrder, SourceRequest, SourceTermEngine};
    use nova_test_utils::{periodic_geometry, uniform_state, FlowSpec, IdealGasEos};

    #[test]
    fn relaxes_toward_target_without_overshoot() {
        let schema = Arc::new(StateSchema::builder().ndim(1).build().unwrap());
        let geom = periodic_geometry(1, 4);
        let state = uniform_state(&schema, &geom, 1, FlowSpec::default());
        let config = ThermoConfig {
            target_temperature: 0.8,
            timescale: 0.5,
        };
        let engine = SourceTermEngine::new(
            Arc::clone(&schema),
            vec![Box::new(ThermoSource::new(Arc::new(IdealGasEos::new(1.4)), config))],
            &SourceOrder::Canonical,
        )
        .unwrap();
        let dt = 0.5;
        let set = engine
            .construct(&SourceRequest {
                geom: &geom,
                state: &state,
                time: 0.0,
                dt,
                time_level: TimeLevel::Old,
                hydro_fluxes: None,
            })
            .unwrap();
        let rate = set.get(SourceKind::Thermo).unwrap().rate();
        let p = [1, 0, 0];
        // p = 1, rho = 1, gamma = 1.4: e = 2.5; target e = 0.8 / 0.4 = 2.
        let e_new = 2.5 + dt * rate.get(p, schema.eint());
        assert!((e_new - 2.25).abs() < 1e-12);
        assert_eq!(rate.get(p, schema.eint()), rate.get(p, schema.eden()));
    }
}
