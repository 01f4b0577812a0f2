//! Time centering and application of source rates to a level state.

use nova_core::{ArrayError, StateArray, TimeLevel};
use nova_state::StateSnapshot;
use rayon::prelude::*;

/// Trapezoidal average `0.5 * (old + new)`, element by element.
///
/// Ghost cells are averaged too so the result can be re-applied with
/// any ghost width.
pub fn time_center(old: &StateArray, new: &StateArray) -> Result<StateArray, ArrayError> {
    old.check_shape(new)?;
    let mut out = old.clone();
    out.data_mut()
        .par_iter_mut()
        .zip(new.data().par_iter())
        .for_each(|(o, &n)| *o = 0.5 * (*o + n));
    Ok(out)
}

/// `state += dt * rate` on `valid.grow(ng)`.
///
/// A zero `dt` leaves `state` bit-for-bit unchanged.
pub fn add_source(
    state: &mut StateArray,
    rate: &StateArray,
    dt: f64,
    ng: usize,
) -> Result<(), ArrayError> {
    state.check_shape(rate)?;
    if dt == 0.0 {
        return Ok(());
    }
    let region = *state.region();
    let target = state.valid().grow(ng.min(state.nghost()));
    let nc = state.ncomp();
    state
        .data_mut()
        .par_chunks_mut(nc)
        .zip(rate.data().par_chunks(nc))
        .enumerate()
        .filter(|(i, _)| target.contains(region.point(*i)))
        .for_each(|(_, (dst, src))| {
            for (d, s) in dst.iter_mut().zip(src) {
                *d += dt * s;
            }
        });
    Ok(())
}

/// Apply `dt * rate` to the old or new state of `snapshot`.
pub fn apply_source_to_state(
    snapshot: &mut StateSnapshot,
    which: TimeLevel,
    rate: &StateArray,
    dt: f64,
    ng: usize,
) -> Result<(), ArrayError> {
    add_source(snapshot.get_mut(which), rate, dt, ng)
}

/// Replace an already applied old-time rate by its time-centered value:
/// `state += dt * (centered - old)` on `valid.grow(ng)`.
pub fn apply_correction(
    state: &mut StateArray,
    old: &StateArray,
    centered: &StateArray,
    dt: f64,
    ng: usize,
) -> Result<(), ArrayError> {
    state.check_shape(old)?;
    state.check_shape(centered)?;
    if dt == 0.0 {
        return Ok(());
    }
    let region = *state.region();
    let target = state.valid().grow(ng.min(state.nghost()));
    let nc = state.ncomp();
    state
        .data_mut()
        .par_chunks_mut(nc)
        .zip(old.data().par_chunks(nc).zip(centered.data().par_chunks(nc)))
        .enumerate()
        .filter(|(i, _)| target.contains(region.point(*i)))
        .for_each(|(_, (dst, (o, c)))| {
            for ((d, o), c) in dst.iter_mut().zip(o).zip(c) {
                *d += dt * (c - o);
            }
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::GridBox;
    use proptest::prelude::*;

    fn array(values: &[f64]) -> StateArray {
        let mut a = StateArray::new(GridBox::with_size(1, [values.len() as i64, 1, 1]), 0, 1);
        a.data_mut().copy_from_slice(values);
        a
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let mut state = array(&[-0.0, 1.0]);
        let rate = array(&[f64::NAN, 2.0]);
        let before = state.clone();
        add_source(&mut state, &rate, 0.0, 0).unwrap();
        assert_eq!(
            state.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            before.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn ghost_cells_untouched_at_zero_width() {
        let valid = GridBox::with_size(1, [2, 1, 1]);
        let mut state = StateArray::new(valid, 1, 1);
        let mut rate = state.zeros_like();
        rate.fill(1.0);
        add_source(&mut state, &rate, 2.0, 0).unwrap();
        assert_eq!(state.get([-1, 0, 0], 0), 0.0);
        assert_eq!(state.get([0, 0, 0], 0), 2.0);
        add_source(&mut state, &rate, 2.0, 1).unwrap();
        assert_eq!(state.get([2, 0, 0], 0), 2.0);
    }

    #[test]
    fn correction_yields_centered_total() {
        let mut state = array(&[1.0]);
        let old = array(&[2.0]);
        let new = array(&[4.0]);
        add_source(&mut state, &old, 0.5, 0).unwrap();
        let centered = time_center(&old, &new).unwrap();
        apply_correction(&mut state, &old, &centered, 0.5, 0).unwrap();
        assert_eq!(state.data()[0], 1.0 + 0.5 * 3.0);
    }

    #[test]
    fn snapshot_levels_are_targeted() {
        let mut snap = StateSnapshot::new(array(&[1.0]), 0.0);
        apply_source_to_state(&mut snap, TimeLevel::New, &array(&[1.0]), 1.0, 0).unwrap();
        assert_eq!(snap.new_state().data()[0], 2.0);
        assert_eq!(snap.old().data()[0], 1.0);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let mut state = array(&[1.0, 2.0]);
        assert!(add_source(&mut state, &array(&[1.0]), 1.0, 0).is_err());
    }

    proptest! {
        #[test]
        fn time_center_is_exact_average(a in -1e300f64..1e300, b in -1e300f64..1e300) {
            let c = time_center(&array(&[a]), &array(&[b])).unwrap();
            prop_assert_eq!(c.data()[0], (a + b) / 2.0);
        }
    }
}
