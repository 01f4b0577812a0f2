//! Collaborator interfaces consumed by a level advance.
//!
//! Ghost fill, hyperbolic fluxes, linear solves, equation of state, and
//! reaction networks are implemented outside this workspace. The advance
//! talks to them only through these traits; every call is synchronous.

use crate::array::{FaceFluxes, StateArray};
use crate::error::{EosError, FillError, HydroError, ReactionError, SolveError};
use crate::geometry::LevelGeometry;
use crate::id::{Direction, LevelId};
use crate::primitive::PrimitiveLayout;
use crate::schema::StateSchema;

// ── Ghost fill ─────────────────────────────────────────────────────

/// Fills the ghost cells of a level state at a given time.
///
/// Implementations cover physical boundaries and, for fine levels,
/// interpolation from the coarser level. Valid cells must not change.
pub trait GhostFill: Send + Sync {
    /// Fill every ghost cell of `state`.
    fn fill_patch(
        &self,
        state: &mut StateArray,
        geom: &LevelGeometry,
        time: f64,
    ) -> Result<(), FillError>;
}

// ── Hyperbolic fluxes ──────────────────────────────────────────────

/// Inputs to one hyperbolic flux evaluation.
#[derive(Debug)]
pub struct HydroRequest<'a> {
    /// Conserved-state layout.
    pub schema: &'a StateSchema,
    /// Primitive-variable layout of `primitive`.
    pub layout: &'a PrimitiveLayout,
    /// Level geometry.
    pub geom: &'a LevelGeometry,
    /// Conserved state with filled ghost cells.
    pub conserved: &'a StateArray,
    /// Primitive variables matching `conserved`.
    pub primitive: &'a StateArray,
    /// Time at which the fluxes are evaluated.
    pub time: f64,
    /// Step size the fluxes will be used with.
    pub dt: f64,
}

/// Side information returned with hyperbolic fluxes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HydroOutcome {
    /// Largest signal speed observed per direction.
    pub max_wave_speed: [f64; 3],
}

/// Produces interface fluxes of every conserved component.
///
/// Fluxes are per unit area per unit time, one [`FaceFluxes`] entry per
/// active direction, over the faces of the valid box.
pub trait HyperbolicSolver: Send + Sync {
    /// Solver name for diagnostics.
    fn name(&self) -> &str;

    /// Write fluxes into `fluxes` (which arrives zeroed).
    fn compute_fluxes(
        &self,
        req: &HydroRequest<'_>,
        fluxes: &mut FaceFluxes,
    ) -> Result<HydroOutcome, HydroError>;
}

// ── Poisson solve ──────────────────────────────────────────────────

/// Which problem a gravity solve covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SolveMode {
    /// This level alone, with boundary values from the coarser level.
    Level,
    /// This level together with every finer level.
    Composite,
}

/// Inputs to a Poisson solve for the gravitational potential.
#[derive(Debug)]
pub struct PoissonRequest<'a> {
    /// Level being solved.
    pub level: LevelId,
    /// Level geometry.
    pub geom: &'a LevelGeometry,
    /// Right-hand side `4 pi G rho`, one component.
    pub rhs: &'a StateArray,
    /// Level or composite solve.
    pub mode: SolveMode,
    /// Time of the density field.
    pub time: f64,
}

/// The potential returned by a Poisson solve.
#[derive(Clone, Debug)]
pub struct PotentialSolution {
    /// Potential, one component, with at least one ghost cell.
    pub phi: StateArray,
    /// Whether the solver reached its tolerance.
    pub converged: bool,
    /// Final residual norm.
    pub residual: f64,
    /// Iterations performed.
    pub iterations: usize,
}

/// Linear solver for the gravitational potential.
pub trait PoissonSolver: Send + Sync {
    /// Solve `lap phi = rhs`.
    fn solve(&self, req: &PoissonRequest<'_>) -> Result<PotentialSolution, SolveError>;
}

// ── Diffusion operator ─────────────────────────────────────────────

/// Quantity whose diffusive flux is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiffusedQuantity {
    /// Temperature (thermal conduction).
    Temperature,
    /// Mass fraction of the species at this offset.
    Species(usize),
    /// Velocity component (viscosity).
    Velocity(Direction),
}

/// Boundary condition code passed to a diffusion solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BcCode {
    /// Periodic wrap.
    Periodic,
    /// Fixed value from the ghost cells.
    Dirichlet,
    /// Zero normal gradient.
    Neumann,
}

/// Inputs to one diffusive-flux evaluation.
#[derive(Debug)]
pub struct DiffusionRequest<'a> {
    /// Level being solved.
    pub level: LevelId,
    /// Level geometry.
    pub geom: &'a LevelGeometry,
    /// Diffused quantity.
    pub quantity: DiffusedQuantity,
    /// Field to diffuse, one component, ghost cells filled.
    pub field: &'a StateArray,
    /// Cell-centered coefficient, same shape as `field`.
    pub coefficient: &'a StateArray,
    /// Boundary codes, indexed `[dir][side]`.
    pub bc: [[BcCode; 2]; 3],
    /// Time of the field.
    pub time: f64,
}

/// Diffusive fluxes returned by a diffusion solve.
#[derive(Clone, Debug)]
pub struct DiffusionSolution {
    /// Face fluxes, one component.
    pub fluxes: FaceFluxes,
    /// Whether the solver reached its tolerance.
    pub converged: bool,
    /// Final residual norm.
    pub residual: f64,
}

/// Evaluates the diffusion operator as face fluxes.
pub trait DiffusionSolver: Send + Sync {
    /// Compute `-coefficient * grad(field)` on every face.
    fn apply_op(&self, req: &DiffusionRequest<'_>) -> Result<DiffusionSolution, SolveError>;
}

// ── Equation of state ──────────────────────────────────────────────

/// The independent variables of an EOS call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EosInput {
    /// Density and specific internal energy.
    RhoE {
        /// Density.
        rho: f64,
        /// Specific internal energy.
        e: f64,
    },
    /// Density and temperature.
    RhoT {
        /// Density.
        rho: f64,
        /// Temperature.
        t: f64,
    },
}

/// Thermodynamic state returned by an EOS call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EosState {
    /// Pressure.
    pub pressure: f64,
    /// Temperature.
    pub temperature: f64,
    /// Specific internal energy.
    pub eint: f64,
    /// Adiabatic sound speed.
    pub sound_speed: f64,
    /// Effective adiabatic index.
    pub gamma: f64,
}

/// Equation of state.
pub trait Eos: Send + Sync {
    /// Evaluate the EOS. `composition` holds mass fractions.
    fn evaluate(&self, input: EosInput, composition: &[f64]) -> Result<EosState, EosError>;
}

// ── Reactions ──────────────────────────────────────────────────────

/// One cell handed to a reaction network.
#[derive(Debug)]
pub struct BurnZone<'a> {
    /// Density (unchanged by the burn).
    pub rho: f64,
    /// Specific internal energy before the burn.
    pub eint: f64,
    /// Temperature before the burn.
    pub temperature: f64,
    /// Mass fractions, updated in place.
    pub mass_fractions: &'a mut [f64],
    /// Burn duration.
    pub dt: f64,
}

/// Local nuclear or chemical reaction network.
pub trait ReactionNetwork: Send + Sync {
    /// Burn one cell. Returns the specific energy released.
    fn burn(&self, zone: BurnZone<'_>) -> Result<f64, ReactionError>;
}

// ── External forcing ───────────────────────────────────────────────

/// User-supplied forcing evaluated cell by cell.
///
/// Implementations must be pure: the same position, time, and cell
/// values always give the same rate.
pub trait ExternalForcing: Send + Sync {
    /// Write the rate of every conserved component of one cell into
    /// `rate` (zeroed on entry). `cell` holds the conserved values at
    /// `position`.
    fn forcing(
        &self,
        schema: &StateSchema,
        position: [f64; 3],
        time: f64,
        cell: &[f64],
        rate: &mut [f64],
    );
}
