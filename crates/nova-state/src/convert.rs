//! Conserved-to-primitive conversion and EOS refreshes.

use rayon::prelude::*;

use nova_core::{Direction, Eos, EosInput, GridBox, PrimitiveLayout, StateArray, StateSchema};

use crate::error::StateError;

/// Refresh the temperature component of every cell in `valid.grow(ng)`
/// from density and internal energy.
pub fn compute_temperature(
    schema: &StateSchema,
    state: &mut StateArray,
    eos: &dyn Eos,
    ng: usize,
) -> Result<(), StateError> {
    let region = *state.region();
    let target: GridBox = state.valid().grow(ng.min(state.nghost()));
    let ncomp = state.ncomp();
    let species = schema.species();
    state
        .data_mut()
        .par_chunks_mut(ncomp)
        .enumerate()
        .filter(|(i, _)| target.contains(region.point(*i)))
        .try_for_each(|(i, cell)| {
            let p = region.point(i);
            let rho = cell[schema.density()];
            if !rho.is_finite() || rho <= 0.0 {
                return Err(StateError::BadDensity { cell: p, value: rho });
            }
            let x: Vec<f64> = cell[species.clone()].iter().map(|v| v / rho).collect();
            let e = cell[schema.eint()] / rho;
            let eos_state = eos
                .evaluate(EosInput::RhoE { rho, e }, &x)
                .map_err(|error| StateError::Eos { cell: p, error })?;
            cell[schema.temp()] = eos_state.temperature;
            Ok(())
        })
}

/// Build primitive variables over `valid.grow(ng)`; cells outside are zero.
///
/// Ghost cells inside the grow width must already be filled.
pub fn cons_to_prim(
    schema: &StateSchema,
    layout: &PrimitiveLayout,
    state: &StateArray,
    eos: &dyn Eos,
    ng: usize,
) -> Result<StateArray, StateError> {
    let region = *state.region();
    let target = state.valid().grow(ng.min(state.nghost()));
    let ncomp = state.ncomp();
    let nq = layout.nq();
    let mut q = StateArray::new(*state.valid(), state.nghost(), nq);
    q.data_mut()
        .par_chunks_mut(nq)
        .zip(state.data().par_chunks(ncomp))
        .enumerate()
        .filter(|(i, _)| target.contains(region.point(*i)))
        .try_for_each(|(i, (prim, cons))| {
            let p = region.point(i);
            let rho = cons[schema.density()];
            if !rho.is_finite() || rho <= 0.0 {
                return Err(StateError::BadDensity { cell: p, value: rho });
            }
            let inv = 1.0 / rho;
            prim[layout.density()] = rho;
            for dir in Direction::ALL {
                prim[layout.velocity(dir)] = cons[schema.momentum(dir)] * inv;
            }
            for (dst, src) in layout.advected().zip(schema.advected()) {
                prim[dst] = cons[src] * inv;
            }
            for (dst, src) in layout.mass_fractions().zip(schema.species()) {
                prim[dst] = cons[src] * inv;
            }
            for (dst, src) in layout.aux().zip(schema.aux()) {
                prim[dst] = cons[src] * inv;
            }
            let rhoe = cons[schema.eint()];
            let eos_state = eos
                .evaluate(
                    EosInput::RhoE { rho, e: rhoe * inv },
                    &prim[layout.mass_fractions()],
                )
                .map_err(|error| StateError::Eos { cell: p, error })?;
            prim[layout.pressure()] = eos_state.pressure;
            prim[layout.rho_eint()] = rhoe;
            prim[layout.temperature()] = eos_state.temperature;
            prim[layout.sound_speed()] = eos_state.sound_speed;
            prim[layout.gamma()] = eos_state.gamma;
            Ok(())
        })?;
    Ok(q)
}

/// Largest `(|u_d| + c) / dx_d` over valid cells, per direction.
pub fn max_signal_rate(layout: &PrimitiveLayout, q: &StateArray, dx: [f64; 3]) -> [f64; 3] {
    let ndim = q.valid().ndim();
    let mut rate = [0.0f64; 3];
    for p in q.valid().cells() {
        let c = q.get(p, layout.sound_speed());
        for dir in Direction::active(ndim) {
            let d = dir.index();
            let s = (q.get(p, layout.velocity(dir)).abs() + c) / dx[d];
            rate[d] = rate[d].max(s);
        }
    }
    rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_test_utils::IdealGasEos;

    fn setup() -> (StateSchema, StateArray) {
        let schema = StateSchema::builder()
            .ndim(1)
            .species(["x"])
            .advected(1)
            .build()
            .unwrap();
        let mut s = StateArray::new(GridBox::with_size(1, [3, 1, 1]), 1, schema.ncomp());
        let region = *s.region();
        for p in region.cells() {
            let c = s.cell_mut(p);
            c[schema.density()] = 2.0;
            c[schema.momentum(Direction::X)] = 1.0;
            c[schema.eint()] = 3.0;
            c[schema.eden()] = 3.25;
            c[schema.species().start] = 2.0;
            c[schema.advected().start] = 0.5;
        }
        (schema, s)
    }

    #[test]
    fn primitive_variables_follow_ideal_gas() {
        let (schema, s) = setup();
        let layout = PrimitiveLayout::from_schema(&schema);
        let eos = IdealGasEos::new(1.4);
        let q = cons_to_prim(&schema, &layout, &s, &eos, 1).unwrap();
        let p = [0, 0, 0];
        assert_eq!(q.get(p, layout.velocity(Direction::X)), 0.5);
        assert!((q.get(p, layout.pressure()) - 0.4 * 3.0).abs() < 1e-12);
        assert_eq!(q.get(p, layout.mass_fractions().start), 1.0);
        assert_eq!(q.get(p, layout.advected().start), 0.25);
        assert!(q.get([-1, 0, 0], layout.sound_speed()) > 0.0);
    }

    #[test]
    fn cells_outside_grow_width_stay_zero() {
        let (schema, s) = setup();
        let layout = PrimitiveLayout::from_schema(&schema);
        let q = cons_to_prim(&schema, &layout, &s, &IdealGasEos::new(1.4), 0).unwrap();
        assert_eq!(q.get([-1, 0, 0], layout.density()), 0.0);
    }

    #[test]
    fn bad_density_is_reported() {
        let (schema, mut s) = setup();
        s.set([1, 0, 0], schema.density(), 0.0);
        let layout = PrimitiveLayout::from_schema(&schema);
        let err = cons_to_prim(&schema, &layout, &s, &IdealGasEos::new(1.4), 0).unwrap_err();
        assert!(matches!(err, StateError::BadDensity { cell: [1, 0, 0], .. }));
    }

    #[test]
    fn temperature_refresh_uses_internal_energy() {
        let (schema, mut s) = setup();
        let eos = IdealGasEos::new(1.4);
        compute_temperature(&schema, &mut s, &eos, 0).unwrap();
        let expected = eos
            .evaluate(EosInput::RhoE { rho: 2.0, e: 1.5 }, &[1.0])
            .unwrap()
            .temperature;
        assert_eq!(s.get([2, 0, 0], schema.temp()), expected);
        assert_eq!(s.get([-1, 0, 0], schema.temp()), 0.0);
    }

    #[test]
    fn signal_rate_is_per_direction() {
        let (schema, s) = setup();
        let layout = PrimitiveLayout::from_schema(&schema);
        let q = cons_to_prim(&schema, &layout, &s, &IdealGasEos::new(1.4), 0).unwrap();
        let r = max_signal_rate(&layout, &q, [0.5, 1.0, 1.0]);
        let c = q.get([0, 0, 0], layout.sound_speed());
        assert!((r[0] - (0.5 + c) / 0.5).abs() < 1e-12);
        assert_eq!(r[1], 0.0);
    }
}
