//! Velocity damping in an outer layer.

use std::f64::consts::PI;

use nova_core::{Direction, SourceError, SourceKind};
use nova_source::{SourceContext, SourceTerm};

use crate::config::SpongeConfig;
use crate::fields::{dot, offset, velocity};

/// Damps momentum outside `r_inner`, reaching full strength at `r_outer`.
///
/// With `alpha = f(r) dt / tau` the momentum rate is
/// `-alpha / (1 + alpha) * rho v / dt`, which removes at most the whole
/// momentum in one step; the energy rate is `v . S_mom`.
pub struct SpongeSource {
    config: SpongeConfig,
}

impl SpongeSource {
    /// Sponge with the given layer.
    pub fn new(config: SpongeConfig) -> Self {
        Self { config }
    }

    /// Ramp factor in `[0, 1]` at radius `r`.
    pub fn ramp(&self, r: f64) -> f64 {
        let SpongeConfig {
            r_inner, r_outer, ..
        } = self.config;
        if r <= r_inner {
            0.0
        } else if r >= r_outer {
            1.0
        } else {
            0.5 * (1.0 - (PI * (r - r_inner) / (r_outer - r_inner)).cos())
        }
    }
}

impl SourceTerm for SpongeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Sponge
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let dt = ctx.dt();
        let out = ctx.output();
        for p in state.valid().cells() {
            let r = offset(geom.ndim(), geom.cell_center(p), self.config.center);
            let f = self.ramp(dot(r, r).sqrt());
            if f == 0.0 {
                continue;
            }
            // alpha / ((1 + alpha) dt), finite as dt -> 0.
            let factor = f / (self.config.timescale + f * dt);
            let cell = state.cell(p);
            let v = velocity(schema, cell);
            let o = out.cell_mut(p);
            let mut energy = 0.0;
            for dir in Direction::ALL {
                let s = -factor * cell[schema.momentum(dir)];
                o[schema.momentum(dir)] = s;
                energy += v[dir.index()] * s;
            }
            o[schema.eden()] = energy;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{StateSchema, TimeLevel};
    use nova_source::{SourceOrder, SourceRequest, SourceTermEngine};
    use nova_test_utils::{periodic_geometry, uniform_state, FlowSpec};
    use std::sync::Arc;

    #[test]
    fn ramp_is_smooth_and_bounded() {
        let s = SpongeSource::new(SpongeConfig::default());
        assert_eq!(s.ramp(0.0), 0.0);
        assert_eq!(s.ramp(0.4), 0.0);
        assert!((s.ramp(0.45) - 0.5).abs() < 1e-12);
        assert_eq!(s.ramp(0.7), 1.0);
    }

    #[test]
    fn damps_only_outside_inner_radius() {
        let schema = Arc::new(StateSchema::builder().ndim(1).build().unwrap());
        let geom = periodic_geometry(1, 10);
        let flow = FlowSpec {
            velocity: [1.0, 0.0, 0.0],
            ..FlowSpec::default()
        };
        let state = uniform_state(&schema, &geom, 1, flow);
        let config = SpongeConfig {
            r_inner: 0.3,
            r_outer: 0.35,
            timescale: 0.1,
            ..SpongeConfig::default()
        };
        let engine = SourceTermEngine::new(
            Arc::clone(&schema),
            vec![Box::new(SpongeSource::new(config))],
            &SourceOrder::Canonical,
        )
        .unwrap();
        let dt = 0.1;
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
        let rate = set.get(SourceKind::Sponge).unwrap().rate();
        let xmom = schema.momentum(Direction::X);
        // Cell 5 sits at x = 0.55, inside the layer.
        assert_eq!(rate.get([5, 0, 0], xmom), 0.0);
        // Cell 0 sits at x = 0.05, r = 0.45: full strength, alpha = 1.
        let s = rate.get([0, 0, 0], xmom);
        assert!((s + 0.5 / dt).abs() < 1e-12);
        assert!((rate.get([0, 0, 0], schema.eden()) - s).abs() < 1e-12);
    }
}
