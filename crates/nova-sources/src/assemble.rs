//! Build the active term list from configuration and injected services.

use std::sync::Arc;

use nova_core::{DiffusionSolver, Eos, ExternalForcing, PoissonSolver, SourceKind};
use nova_source::SourceTerm;

use crate::config::SourcesConfig;
use crate::diffusion::DiffusionSource;
use crate::error::AssembleError;
use crate::ext::ExternalSource;
use crate::gravity::{GravityService, GravitySource};
use crate::hybrid::HybridMomentumSource;
use crate::rotation::RotationSource;
use crate::sponge::SpongeSource;
use crate::thermo::ThermoSource;

/// Collaborators the built-in kinds draw on.
#[derive(Clone, Default)]
pub struct SourceServices {
    eos: Option<Arc<dyn Eos>>,
    poisson: Option<Arc<dyn PoissonSolver>>,
    diffusion: Option<Arc<dyn DiffusionSolver>>,
    forcing: Option<Arc<dyn ExternalForcing>>,
}

impl SourceServices {
    /// No services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Equation of state (thermo).
    pub fn eos(mut self, eos: Arc<dyn Eos>) -> Self {
        self.eos = Some(eos);
        self
    }

    /// Poisson solver (gravity).
    pub fn poisson(mut self, solver: Arc<dyn PoissonSolver>) -> Self {
        self.poisson = Some(solver);
        self
    }

    /// Diffusion operator (diffusion).
    pub fn diffusion(mut self, solver: Arc<dyn DiffusionSolver>) -> Self {
        self.diffusion = Some(solver);
        self
    }

    /// External forcing; supplying it enables the `ext` kind.
    pub fn forcing(mut self, forcing: Arc<dyn ExternalForcing>) -> Self {
        self.forcing = Some(forcing);
        self
    }
}

fn require<T: ?Sized>(
    service: &Option<Arc<T>>,
    kind: SourceKind,
    name: &'static str,
) -> Result<Arc<T>, AssembleError> {
    service.clone().ok_or(AssembleError::MissingService {
        kind,
        service: name,
    })
}

/// Validate `config` and build one term per enabled kind.
pub fn assemble_sources(
    config: &SourcesConfig,
    services: &SourceServices,
) -> Result<Vec<Box<dyn SourceTerm>>, AssembleError> {
    config.validate()?;
    let mut terms: Vec<Box<dyn SourceTerm>> = Vec::new();
    if let Some(forcing) = &services.forcing {
        terms.push(Box::new(ExternalSource::new(Arc::clone(forcing))));
    }
    if let Some(c) = &config.thermo {
        let eos = require(&services.eos, SourceKind::Thermo, "equation of state")?;
        terms.push(Box::new(ThermoSource::new(eos, c.clone())));
    }
    if let Some(c) = &config.sponge {
        terms.push(Box::new(SpongeSource::new(c.clone())));
    }
    if let Some(c) = &config.diffusion {
        let solver = require(&services.diffusion, SourceKind::Diffusion, "diffusion solver")?;
        terms.push(Box::new(DiffusionSource::new(solver, c.clone())));
    }
    if let Some(c) = &config.hybrid {
        let eos = require(&services.eos, SourceKind::HybridMomentum, "equation of state")?;
        terms.push(Box::new(HybridMomentumSource::new(eos, c.clone())));
    }
    if let Some(c) = &config.gravity {
        let solver = require(&services.poisson, SourceKind::Gravity, "Poisson solver")?;
        let service = Arc::new(GravityService::new(solver, c.clone()));
        terms.push(Box::new(GravitySource::new(service)));
    }
    if let Some(c) = &config.rotation {
        terms.push(Box::new(RotationSource::new(c.clone())));
    }
    Ok(terms)
}
