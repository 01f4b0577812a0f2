//! Per-cell kernels of the level advance.

use rayon::prelude::*;
use smallvec::SmallVec;

use nova_core::{ArrayError, BurnZone, FaceFluxes, ReactionNetwork, StateArray, StateSchema};

/// `target = base - dt * div(fluxes)` on valid cells; ghost cells are
/// copied from `base`.
pub(crate) fn flux_update(
    target: &mut StateArray,
    base: &StateArray,
    fluxes: &FaceFluxes,
    dx: [f64; 3],
    dt: f64,
) -> Result<(), ArrayError> {
    target.copy_from(base)?;
    let region = *target.region();
    let valid = *target.valid();
    let ncomp = target.ncomp();
    target
        .data_mut()
        .par_chunks_mut(ncomp)
        .enumerate()
        .for_each(|(i, cell)| {
            let p = region.point(i);
            if !valid.contains(p) {
                return;
            }
            for (c, v) in cell.iter_mut().enumerate() {
                *v -= dt * fluxes.divergence(p, c, dx);
            }
        });
    Ok(())
}

/// Burn every cell in `valid.grow(ng)` for `dt`. Released energy goes
/// into both energies; species partial densities follow the returned
/// mass fractions. Returns the first failure, if any; cells burned before
/// it keep their update.
pub(crate) fn burn(
    schema: &StateSchema,
    network: &dyn ReactionNetwork,
    state: &mut StateArray,
    dt: f64,
    ng: usize,
) -> Option<String> {
    let region = *state.region();
    let target = state.valid().grow(ng.min(state.nghost()));
    let ncomp = state.ncomp();
    let species = schema.species();
    let failures: Vec<String> = state
        .data_mut()
        .par_chunks_mut(ncomp)
        .enumerate()
        .filter(|(i, _)| target.contains(region.point(*i)))
        .filter_map(|(i, cell)| {
            let rho = cell[schema.density()];
            let mut x: SmallVec<[f64; 16]> =
                cell[species.clone()].iter().map(|v| v / rho).collect();
            let zone = BurnZone {
                rho,
                eint: cell[schema.eint()] / rho,
                temperature: cell[schema.temp()],
                mass_fractions: &mut x[..],
                dt,
            };
            match network.burn(zone) {
                Ok(q) => {
                    cell[schema.eint()] += rho * q;
                    cell[schema.eden()] += rho * q;
                    for (c, xi) in species.clone().zip(&x) {
                        cell[c] = rho * xi;
                    }
                    None
                }
                Err(e) => Some(format!("at {:?}: {e}", region.point(i))),
            }
        })
        .collect();
    failures.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::{Direction, GridBox};
    use nova_test_utils::{ConstantReleaseNetwork, FailingNetwork};

    #[test]
    fn uniform_flux_leaves_state_unchanged() {
        let valid = GridBox::with_size(1, [4, 1, 1]);
        let mut base = StateArray::new(valid, 1, 1);
        base.fill(2.0);
        let mut fluxes = FaceFluxes::new(valid, 1);
        let faces = *fluxes.dir(0).faces();
        for f in faces.cells() {
            fluxes.dir_mut(0).set(f, 0, 3.0);
        }
        let mut out = base.zeros_like();
        flux_update(&mut out, &base, &fluxes, [0.25, 1.0, 1.0], 0.1).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn divergence_moves_mass_between_cells() {
        let valid = GridBox::with_size(1, [2, 1, 1]);
        let mut base = StateArray::new(valid, 1, 1);
        base.fill(1.0);
        let mut fluxes = FaceFluxes::new(valid, 1);
        fluxes.dir_mut(0).set([1, 0, 0], 0, 0.5);
        let mut out = base.zeros_like();
        flux_update(&mut out, &base, &fluxes, [1.0; 3], 0.2).unwrap();
        assert!((out.get([0, 0, 0], 0) - 0.9).abs() < 1e-15);
        assert!((out.get([1, 0, 0], 0) - 1.1).abs() < 1e-15);
        assert_eq!(out.get([-1, 0, 0], 0), 1.0);
        assert!((out.sum_valid(0) - 2.0).abs() < 1e-15);
    }

    fn gas(schema: &StateSchema) -> StateArray {
        let mut s = StateArray::new(GridBox::with_size(1, [3, 1, 1]), 1, schema.ncomp());
        let region = *s.region();
        for p in region.cells() {
            let c = s.cell_mut(p);
            c[schema.density()] = 2.0;
            c[schema.momentum(Direction::X)] = 0.0;
            c[schema.eint()] = 1.0;
            c[schema.eden()] = 1.0;
            c[schema.temp()] = 1.0;
            c[schema.species().start] = 2.0;
        }
        s
    }

    #[test]
    fn release_heats_both_energies() {
        let schema = StateSchema::builder().ndim(1).species(["he"]).build().unwrap();
        let mut s = gas(&schema);
        let failure = burn(&schema, &ConstantReleaseNetwork::new(3.0), &mut s, 0.5, 0);
        assert!(failure.is_none());
        let p = [1, 0, 0];
        assert_eq!(s.get(p, schema.eint()), 1.0 + 2.0 * 1.5);
        assert_eq!(s.get(p, schema.eden()), 1.0 + 2.0 * 1.5);
        assert_eq!(s.get(p, schema.species().start), 2.0);
        assert_eq!(s.get([-1, 0, 0], schema.eint()), 1.0);
    }

    #[test]
    fn failure_is_reported() {
        let schema = StateSchema::builder().ndim(1).species(["he"]).build().unwrap();
        let mut s = gas(&schema);
        let failure = burn(&schema, &FailingNetwork::new(0), &mut s, 0.5, 0);
        assert!(failure.is_some_and(|r| r.contains("deliberate")));
    }
}
