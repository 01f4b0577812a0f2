//! Per-kind source configuration.
//!
//! Every struct has a `Default` and a `validate()` that reports the first
//! bad field as a message; [`SourcesConfig::validate`] tags it with the
//! kind.

use nova_core::SourceKind;

use crate::error::AssembleError;

/// Damping layer near the domain edge.
#[derive(Clone, Debug, PartialEq)]
pub struct SpongeConfig {
    /// Center the radius is measured from.
    pub center: [f64; 3],
    /// Radius where damping starts. Default: 0.4.
    pub r_inner: f64,
    /// Radius where damping reaches full strength. Default: 0.5.
    pub r_outer: f64,
    /// Damping timescale at full strength. Default: 0.1.
    pub timescale: f64,
}

impl Default for SpongeConfig {
    fn default() -> Self {
        Self {
            center: [0.5; 3],
            r_inner: 0.4,
            r_outer: 0.5,
            timescale: 0.1,
        }
    }
}

impl SpongeConfig {
    /// Check radii and timescale.
    pub fn validate(&self) -> Result<(), String> {
        if !self.r_inner.is_finite() || self.r_inner < 0.0 {
            return Err(format!(
                "r_inner must be finite and non-negative, got {}",
                self.r_inner
            ));
        }
        if !self.r_outer.is_finite() || self.r_outer <= self.r_inner {
            return Err(format!(
                "r_outer must exceed r_inner ({}), got {}",
                self.r_inner, self.r_outer
            ));
        }
        positive("timescale", self.timescale)
    }
}

/// Relaxation of the internal energy toward a target temperature.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermoConfig {
    /// Temperature the gas relaxes toward.
    pub target_temperature: f64,
    /// Relaxation timescale. Default: 1.0.
    pub timescale: f64,
}

impl Default for ThermoConfig {
    fn default() -> Self {
        Self {
            target_temperature: 1.0,
            timescale: 1.0,
        }
    }
}

impl ThermoConfig {
    /// Check target and timescale.
    pub fn validate(&self) -> Result<(), String> {
        positive("target_temperature", self.target_temperature)?;
        positive("timescale", self.timescale)
    }
}

/// Thermal conduction and (in 1-D) species diffusion.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffusionConfig {
    /// Constant thermal conductivity. Default: 1e-3.
    pub conductivity: f64,
    /// Species diffusivity; species diffuse only in 1-D. Default: none.
    pub species_diffusivity: Option<f64>,
    /// Use the new-time fluxes alone instead of the trapezoidal average.
    pub new_time_only: bool,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            conductivity: 1e-3,
            species_diffusivity: None,
            new_time_only: false,
        }
    }
}

impl DiffusionConfig {
    /// Check coefficients.
    pub fn validate(&self) -> Result<(), String> {
        non_negative("conductivity", self.conductivity)?;
        if let Some(d) = self.species_diffusivity {
            non_negative("species_diffusivity", d)?;
        }
        Ok(())
    }
}

/// Which potential the gravity source differentiates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GravityMode {
    /// Level-only solve each time.
    Level,
    /// Composite solve each time.
    #[default]
    Composite,
    /// Level solve plus the composite-minus-level correction from the
    /// old-time solve.
    LevelWithCorrection,
}

/// Form of the gravitational energy source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GravityEnergy {
    /// `rho v . g`, time-centered.
    Predictor,
    /// Mass-flux-weighted potential differences, new time only.
    #[default]
    Conservative,
}

/// Self-gravity.
#[derive(Clone, Debug, PartialEq)]
pub struct GravityConfig {
    /// Potential selection.
    pub mode: GravityMode,
    /// Energy source form.
    pub energy: GravityEnergy,
    /// `4 pi G` in code units. Default: 1.0.
    pub four_pi_g: f64,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            mode: GravityMode::default(),
            energy: GravityEnergy::default(),
            four_pi_g: 1.0,
        }
    }
}

impl GravityConfig {
    /// Check the coupling constant.
    pub fn validate(&self) -> Result<(), String> {
        positive("four_pi_g", self.four_pi_g)
    }
}

/// Rotating reference frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RotationConfig {
    /// Rotation axis origin.
    pub center: [f64; 3],
    /// Angular velocity vector.
    pub omega: [f64; 3],
    /// Constant angular acceleration.
    pub omega_dot: [f64; 3],
}

impl RotationConfig {
    /// Check that every vector is finite.
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("center", self.center),
            ("omega", self.omega),
            ("omega_dot", self.omega_dot),
        ] {
            if v.iter().any(|x| !x.is_finite()) {
                return Err(format!("{name} must be finite, got {v:?}"));
            }
        }
        Ok(())
    }
}

/// Hybrid (radial, angular, vertical) momentum.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridConfig {
    /// Origin of the cylindrical decomposition.
    pub center: [f64; 3],
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self { center: [0.5; 3] }
    }
}

/// The set of enabled built-in kinds. `None` disables a kind.
///
/// External forcing is enabled by supplying a forcing service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourcesConfig {
    /// Thermodynamic relaxation.
    pub thermo: Option<ThermoConfig>,
    /// Sponge damping.
    pub sponge: Option<SpongeConfig>,
    /// Diffusion.
    pub diffusion: Option<DiffusionConfig>,
    /// Hybrid momentum.
    pub hybrid: Option<HybridConfig>,
    /// Self-gravity.
    pub gravity: Option<GravityConfig>,
    /// Rotation.
    pub rotation: Option<RotationConfig>,
}

impl SourcesConfig {
    /// Validate every enabled kind.
    pub fn validate(&self) -> Result<(), AssembleError> {
        let tag = |kind: SourceKind| {
            move |reason: String| AssembleError::InvalidConfig { kind, reason }
        };
        if let Some(c) = &self.thermo {
            c.validate().map_err(tag(SourceKind::Thermo))?;
        }
        if let Some(c) = &self.sponge {
            c.validate().map_err(tag(SourceKind::Sponge))?;
        }
        if let Some(c) = &self.diffusion {
            c.validate().map_err(tag(SourceKind::Diffusion))?;
        }
        if let Some(c) = &self.gravity {
            c.validate().map_err(tag(SourceKind::Gravity))?;
        }
        if let Some(c) = &self.rotation {
            c.validate().map_err(tag(SourceKind::Rotation))?;
        }
        Ok(())
    }
}

fn positive(name: &str, v: f64) -> Result<(), String> {
    if !v.is_finite() || v <= 0.0 {
        return Err(format!("{name} must be finite and positive, got {v}"));
    }
    Ok(())
}

fn non_negative(name: &str, v: f64) -> Result<(), String> {
    if !v.is_finite() || v < 0.0 {
        return Err(format!("{name} must be finite and non-negative, got {v}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SpongeConfig::default().validate().is_ok());
        assert!(ThermoConfig::default().validate().is_ok());
        assert!(DiffusionConfig::default().validate().is_ok());
        assert!(GravityConfig::default().validate().is_ok());
        assert!(RotationConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_sponge_radii_rejected() {
        let c = SpongeConfig {
            r_inner: 0.5,
            r_outer: 0.4,
            ..SpongeConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn invalid_kind_is_tagged() {
        let cfg = SourcesConfig {
            gravity: Some(GravityConfig {
                four_pi_g: 0.0,
                ..GravityConfig::default()
            }),
            ..SourcesConfig::default()
        };
        match cfg.validate() {
            Err(AssembleError::InvalidConfig { kind, .. }) => assert_eq!(kind, SourceKind::Gravity),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }
}
