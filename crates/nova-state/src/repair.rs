//! Density, species, and energy repair passes.
//!
//! Every pass mutates cells inside `valid.grow(ng)` only and counts a
//! cell only when its stored bits actually changed, so repeating a pass
//! without an intervening mutation is a no-op that reports nothing.

use std::ops::Add;
use std::sync::Arc;

use rayon::prelude::*;

use nova_core::{GridBox, StateArray, StateSchema};

use crate::config::RepairConfig;

/// Counts of cells touched by a repair pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RepairReport {
    /// Cells examined (valid cells plus the requested ghost width).
    pub cells_examined: usize,
    /// Cells whose density was raised to the floor.
    pub density_resets: usize,
    /// Cells that arrived with non-positive density.
    pub negative_density_cells: usize,
    /// Cells whose species partial densities were clipped or renormalized.
    pub species_resets: usize,
    /// Cells whose internal energy was raised to the floor.
    pub energy_resets: usize,
    /// Cells holding NaN or infinite values; left untouched.
    pub unrepairable_cells: usize,
    /// Cells changed by any pass, including plain dual-energy syncs.
    pub repaired_cells: usize,
    /// Cells that needed a floor or a species renormalization.
    pub floored_cells: usize,
    /// Density added by the floor, summed over cells (not volume weighted).
    pub mass_added: f64,
}

impl RepairReport {
    /// Fraction of examined cells that needed a floor or a species
    /// renormalization. Dual-energy syncs do not count.
    pub fn severity(&self) -> f64 {
        if self.cells_examined == 0 {
            0.0
        } else {
            self.floored_cells as f64 / self.cells_examined as f64
        }
    }

    /// Whether nothing was changed and nothing was unrepairable.
    pub fn is_clean(&self) -> bool {
        self.repaired_cells == 0 && self.unrepairable_cells == 0
    }
}

impl Add for RepairReport {
    type Output = RepairReport;

    fn add(self, rhs: RepairReport) -> RepairReport {
        RepairReport {
            cells_examined: self.cells_examined + rhs.cells_examined,
            density_resets: self.density_resets + rhs.density_resets,
            negative_density_cells: self.negative_density_cells + rhs.negative_density_cells,
            species_resets: self.species_resets + rhs.species_resets,
            energy_resets: self.energy_resets + rhs.energy_resets,
            unrepairable_cells: self.unrepairable_cells + rhs.unrepairable_cells,
            repaired_cells: self.repaired_cells + rhs.repaired_cells,
            floored_cells: self.floored_cells + rhs.floored_cells,
            mass_added: self.mass_added + rhs.mass_added,
        }
    }
}

#[derive(Clone, Copy)]
struct Passes {
    density: bool,
    species: bool,
    energy: bool,
}

/// Applies the density floor, species normalization, and internal-energy
/// consistency rules of one schema.
#[derive(Clone, Debug)]
pub struct RepairPolicy {
    schema: Arc<StateSchema>,
    config: RepairConfig,
}

impl RepairPolicy {
    /// Create a policy for `schema`.
    pub fn new(schema: Arc<StateSchema>, config: RepairConfig) -> Self {
        Self { schema, config }
    }

    /// The thresholds in use.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// The schema this policy indexes with.
    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Full repair: density floor, then species, then internal energy.
    pub fn clean(&self, state: &mut StateArray, ng: usize) -> RepairReport {
        let report = self.run(
            state,
            ng,
            Passes {
                density: true,
                species: true,
                energy: true,
            },
        );
        if !report.is_clean() {
            log::debug!(
                "repair: {} density, {} species, {} energy resets, {} unrepairable of {} cells",
                report.density_resets,
                report.species_resets,
                report.energy_resets,
                report.unrepairable_cells,
                report.cells_examined
            );
        }
        report
    }

    /// Clip negative partial densities and renormalize their sum.
    pub fn normalize_species(&self, state: &mut StateArray, ng: usize) -> RepairReport {
        self.run(
            state,
            ng,
            Passes {
                density: false,
                species: true,
                energy: false,
            },
        )
    }

    /// Reconcile internal with total energy and apply the energy floor.
    pub fn enforce_consistent_internal_energy(
        &self,
        state: &mut StateArray,
        ng: usize,
    ) -> RepairReport {
        self.run(
            state,
            ng,
            Passes {
                density: false,
                species: false,
                energy: true,
            },
        )
    }

    fn run(&self, state: &mut StateArray, ng: usize, passes: Passes) -> RepairReport {
        let region = *state.region();
        let target: GridBox = state.valid().grow(ng.min(state.nghost()));
        let ncomp = state.ncomp();
        state
            .data_mut()
            .par_chunks_mut(ncomp)
            .enumerate()
            .filter(|(i, _)| target.contains(region.point(*i)))
            .map(|(_, cell)| self.repair_cell(cell, passes))
            .reduce(RepairReport::default, Add::add)
    }

    fn repair_cell(&self, cell: &mut [f64], passes: Passes) -> RepairReport {
        let mut report = RepairReport {
            cells_examined: 1,
            ..RepairReport::default()
        };
        if cell.iter().any(|v| !v.is_finite()) {
            report.unrepairable_cells = 1;
            return report;
        }
        let mut changed = false;
        if passes.density {
            let rho = cell[self.schema.density()];
            if rho <= 0.0 {
                report.negative_density_cells = 1;
            }
            let added = self.floor_density(cell);
            if added != 0.0 {
                report.density_resets = 1;
                report.mass_added = added;
                changed = true;
            }
        }
        if passes.species && self.normalize_cell_species(cell) {
            report.species_resets = 1;
            changed = true;
        }
        if passes.energy {
            let (floored, touched) = self.reconcile_energy(cell);
            if floored {
                report.energy_resets = 1;
            }
            changed |= touched;
        }
        report.repaired_cells = usize::from(changed);
        report.floored_cells = usize::from(
            report.density_resets + report.species_resets + report.energy_resets > 0,
        );
        report
    }

    /// Returns the density added (zero if the cell was untouched).
    fn floor_density(&self, cell: &mut [f64]) -> f64 {
        let s = &*self.schema;
        let floor = self.config.small_dens;
        let rho = cell[s.density()];
        if rho >= floor {
            return 0.0;
        }
        if rho > 0.0 {
            let factor = floor / rho;
            for (c, v) in cell.iter_mut().enumerate() {
                if s.mass_weighted(c) {
                    *v *= factor;
                }
            }
        } else {
            for c in s.momenta() {
                cell[c] = 0.0;
            }
            if let Some(h) = s.hybrid() {
                for c in h {
                    cell[c] = 0.0;
                }
            }
            for c in s.advected().chain(s.aux()) {
                cell[c] = 0.0;
            }
            let nspec = s.nspec();
            for c in s.species() {
                cell[c] = floor / nspec as f64;
            }
            let e = floor * self.config.small_eint;
            cell[s.eint()] = e;
            cell[s.eden()] = e;
        }
        cell[s.density()] = floor;
        floor - rho
    }

    /// Returns whether any partial density changed.
    fn normalize_cell_species(&self, cell: &mut [f64]) -> bool {
        let s = &*self.schema;
        let species = s.species();
        if species.is_empty() {
            return false;
        }
        let rho = cell[s.density()];
        if rho <= 0.0 {
            return false;
        }
        let before: Vec<u64> = cell[species.clone()].iter().map(|v| v.to_bits()).collect();
        for v in &mut cell[species.clone()] {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
        let sum: f64 = cell[species.clone()].iter().sum();
        if sum <= 0.0 {
            let n = species.len() as f64;
            for v in &mut cell[species.clone()] {
                *v = rho / n;
            }
        } else if (sum / rho - 1.0).abs() > self.config.species_tolerance {
            let scale = rho / sum;
            for v in &mut cell[species.clone()] {
                *v *= scale;
            }
        }
        cell[species]
            .iter()
            .zip(before)
            .any(|(v, b)| v.to_bits() != b)
    }

    /// Returns `(floor applied and changed bits, any bits changed)`.
    ///
    /// The rule is swept to a fixed point so that the stored pair is
    /// reproduced bit for bit by the next sweep.
    fn reconcile_energy(&self, cell: &mut [f64]) -> (bool, bool) {
        let s = &*self.schema;
        let (ie, ee) = (s.eint(), s.eden());
        let rho = cell[s.density()];
        if rho <= 0.0 {
            return (false, false);
        }
        let ke = kinetic_energy(s, cell);
        let floor = rho * self.config.small_eint;
        let eta = self.config.dual_energy_eta;
        let (mut total, mut eint) = (cell[ee], cell[ie]);
        let mut floored = false;
        for _ in 0..MAX_ENERGY_SWEEPS {
            let before = (total.to_bits(), eint.to_bits());
            if total - ke > eta * total {
                eint = total - ke;
            } else {
                total = ke + eint;
            }
            if eint < floor {
                total = ke + floor;
                eint = floor;
                floored = true;
            }
            if (total.to_bits(), eint.to_bits()) == before {
                break;
            }
        }
        let changed =
            (total.to_bits(), eint.to_bits()) != (cell[ee].to_bits(), cell[ie].to_bits());
        cell[ee] = total;
        cell[ie] = eint;
        (floored && changed, changed)
    }
}

const MAX_ENERGY_SWEEPS: usize = 8;

/// Kinetic energy density `|rho v|^2 / (2 rho)` of one cell.
pub fn kinetic_energy(schema: &StateSchema, cell: &[f64]) -> f64 {
    let rho = cell[schema.density()];
    let m2: f64 = schema.momenta().map(|c| cell[c] * cell[c]).sum();
    0.5 * m2 / rho
}
