//! User-supplied external forcing.

use std::sync::Arc;

use nova_core::{ExternalForcing, SourceError, SourceKind};
use nova_source::{SourceContext, SourceTerm};

/// Wraps an [`ExternalForcing`] callback as a source term.
pub struct ExternalSource {
    forcing: Arc<dyn ExternalForcing>,
    after: Vec<SourceKind>,
}

impl ExternalSource {
    /// Forcing with no ordering constraints.
    pub fn new(forcing: Arc<dyn ExternalForcing>) -> Self {
        Self {
            forcing,
            after: Vec::new(),
        }
    }

    /// Construct after the given kinds whenever they are active.
    pub fn after(mut self, kinds: impl IntoIterator<Item = SourceKind>) -> Self {
        self.after = kinds.into_iter().collect();
        self
    }
}

impl SourceTerm for ExternalSource {
    fn kind(&self) -> SourceKind {
        SourceKind::External
    }

    fn after(&self) -> Vec<SourceKind> {
        self.after.clone()
    }

    fn construct(&self, ctx: &mut SourceContext<'_>) -> Result<(), SourceError> {
        let (schema, geom, state) = (ctx.schema(), ctx.geom(), ctx.state());
        let time = ctx.time();
        let out = ctx.output();
        for p in state.valid().cells() {
            let x = geom.cell_center(p);
            self.forcing.forcing(schema, x, time, state.cell(p), out.cell_mut(p));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{Direction, StateSchema, TimeLevel};
    use nova_source::{SourceOrder, SourceRequest, SourceTermEngine};
    use nova_test_utils::{periodic_geometry, uniform_state, FlowSpec};

    /// Uniform push along x proportional to time.
    struct Push;

    impl ExternalForcing for Push {
        fn forcing(
            &self,
            schema: &StateSchema,
            _position: [f64; 3],
            time: f64,
            cell: &[f64],
            rate: &mut [f64],
        ) {
            rate[schema.momentum(Direction::X)] = time * cell[schema.density()];
        }
    }

    #[test]
    fn forcing_is_evaluated_per_cell() {
        let schema = Arc::new(StateSchema::builder().ndim(2).build().unwrap());
        let geom = periodic_geometry(2, 3);
        let flow = FlowSpec {
            rho: 2.0,
            ..FlowSpec::default()
        };
        let state = uniform_state(&schema, &geom, 1, flow);
        let engine = SourceTermEngine::new(
            Arc::clone(&schema),
            vec![Box::new(ExternalSource::new(Arc::new(Push)))],
            &SourceOrder::Canonical,
        )
        .unwrap();
        let set = engine
            .construct(&SourceRequest {
                geom: &geom,
                state: &state,
                time: 1.5,
                dt: 0.1,
                time_level: TimeLevel::Old,
                hydro_fluxes: None,
            })
            .unwrap();
        let rate = set.get(SourceKind::External).unwrap().rate();
        let xmom = schema.momentum(Direction::X);
        for p in geom.valid().cells() {
            assert_eq!(rate.get(p, xmom), 3.0);
            assert_eq!(rate.get(p, schema.density()), 0.0);
        }
        // Ghost cells stay zero.
        assert_eq!(rate.get([-1, 0, 0], xmom), 0.0);
    }
}
