// Physics Engine - Impact Energy & Threat Classification
// Closed-form kinetic impact model driven by three bounded inputs

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{NeoError, NeoResult};

// =============================================================================
// MODEL CONSTANTS (SI Units)
// =============================================================================

/// Assumed bulk density of a rocky impactor (kg/m³)
pub const ROCK_DENSITY: f64 = 2700.0;

/// Megaton TNT equivalent (J)
pub const JOULES_PER_MEGATON: f64 = 4.184e15;

/// Crater diameter per meter of impactor diameter.
/// Empirical multiplier, not a validated crater-scaling law.
pub const CRATER_DIAMETER_MULTIPLIER: f64 = 20.0;

/// Affected radius (m) per meter of impactor diameter.
/// Empirical multiplier, not derived from blast modelling.
pub const AFFECTED_RADIUS_MULTIPLIER: f64 = 50.0;

/// Energies below this are LOW (MT)
pub const MODERATE_THRESHOLD_MT: f64 = 1.0;

/// Energies at or above this are SEVERE (MT)
pub const SEVERE_THRESHOLD_MT: f64 = 100.0;

// =============================================================================
// INPUT CONTROLS
// =============================================================================

/// A bounded numeric input with a fixed step, as exposed by the front end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputControl {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

pub const DIAMETER_CONTROL: InputControl = InputControl {
    min: 10.0,
    max: 1000.0,
    step: 10.0,
    default: 100.0,
};

pub const VELOCITY_CONTROL: InputControl = InputControl {
    min: 5.0,
    max: 72.0,
    step: 1.0,
    default: 20.0,
};

pub const ANGLE_CONTROL: InputControl = InputControl {
    min: 0.0,
    max: 90.0,
    step: 5.0,
    default: 45.0,
};

impl InputControl {
    /// Clamp to range and round to the nearest step
    pub fn snap(&self, value: f64) -> NeoResult<f64> {
        if !value.is_finite() {
            return Err(NeoError::Validation(format!(
                "control value must be finite, got {}",
                value
            )));
        }
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        Ok((self.min + steps * self.step).min(self.max))
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

// =============================================================================
// IMPACT PARAMETERS
// =============================================================================

/// Inputs for one impact scenario.
///
/// Domain of validity: any finite `diameter_m > 0` and
/// `velocity_km_s > 0` computes, including values outside the control
/// ranges. The formulas are tuned for the control ranges (10-1000 m,
/// 5-72 km/s); far outside them the empirical multipliers lose meaning.
/// `impact_angle_deg` must be finite and non-negative but does not enter
/// any formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactParameters {
    pub diameter_m: f64,
    pub velocity_km_s: f64,
    pub impact_angle_deg: f64,
}

impl ImpactParameters {
    pub fn new(diameter_m: f64, velocity_km_s: f64, impact_angle_deg: f64) -> Self {
        Self {
            diameter_m,
            velocity_km_s,
            impact_angle_deg,
        }
    }

    pub fn validate(&self) -> NeoResult<()> {
        if !self.diameter_m.is_finite() || self.diameter_m <= 0.0 {
            return Err(NeoError::Validation(format!(
                "diameter must be a positive finite number of meters, got {}",
                self.diameter_m
            )));
        }
        if !self.velocity_km_s.is_finite() || self.velocity_km_s <= 0.0 {
            return Err(NeoError::Validation(format!(
                "velocity must be a positive finite number of km/s, got {}",
                self.velocity_km_s
            )));
        }
        if !self.impact_angle_deg.is_finite() || self.impact_angle_deg < 0.0 {
            return Err(NeoError::Validation(format!(
                "impact angle must be a non-negative finite number of degrees, got {}",
                self.impact_angle_deg
            )));
        }
        Ok(())
    }
}

impl Default for ImpactParameters {
    fn default() -> Self {
        Self::new(
            DIAMETER_CONTROL.default,
            VELOCITY_CONTROL.default,
            ANGLE_CONTROL.default,
        )
    }
}

// =============================================================================
// THREAT CLASSIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Moderate,
    Severe,
}

impl ThreatLevel {
    /// Strict `<` on both thresholds: exactly 1 MT is MODERATE,
    /// exactly 100 MT is SEVERE.
    pub fn from_megatons(energy_mt: f64) -> Self {
        if energy_mt < MODERATE_THRESHOLD_MT {
            ThreatLevel::Low
        } else if energy_mt < SEVERE_THRESHOLD_MT {
            ThreatLevel::Moderate
        } else {
            ThreatLevel::Severe
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Moderate => "MODERATE",
            ThreatLevel::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// IMPACT MODEL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub energy_megatons_tnt: f64,
    pub crater_diameter_m: f64,
    pub affected_radius_km: f64,
    pub threat_level: ThreatLevel,
}

/// Mass of a homogeneous rocky sphere (kg)
pub fn impactor_mass(diameter_m: f64) -> f64 {
    let radius = diameter_m / 2.0;
    let volume = (4.0 / 3.0) * PI * radius.powi(3);
    volume * ROCK_DENSITY
}

/// Kinetic impact energy in joules
pub fn kinetic_energy_joules(diameter_m: f64, velocity_km_s: f64) -> f64 {
    let velocity_m_s = velocity_km_s * 1000.0;
    0.5 * impactor_mass(diameter_m) * velocity_m_s.powi(2)
}

/// Evaluate one impact scenario.
///
/// `impact_angle_deg` is validated but not used.
pub fn compute_impact(params: &ImpactParameters) -> NeoResult<ImpactResult> {
    params.validate()?;

    let energy_megatons_tnt =
        kinetic_energy_joules(params.diameter_m, params.velocity_km_s) / JOULES_PER_MEGATON;

    Ok(ImpactResult {
        energy_megatons_tnt,
        crater_diameter_m: params.diameter_m * CRATER_DIAMETER_MULTIPLIER,
        affected_radius_km: params.diameter_m * AFFECTED_RADIUS_MULTIPLIER / 1000.0,
        threat_level: ThreatLevel::from_megatons(energy_megatons_tnt),
    })
}

// =============================================================================
// SIZE CATEGORIES
// =============================================================================

/// Qualitative impactor class by diameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeCategory {
    /// Below 50 m; catch-all under the city-scale class
    Small,
    /// 50-100 m, Tunguska-like
    CityScale,
    /// 100-1000 m
    Regional,
    /// 1 km and up
    Global,
}

impl SizeCategory {
    pub fn from_diameter(diameter_m: f64) -> Self {
        match diameter_m {
            d if d < 50.0 => SizeCategory::Small,
            d if d < 100.0 => SizeCategory::CityScale,
            d if d < 1000.0 => SizeCategory::Regional,
            _ => SizeCategory::Global,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SizeCategory::Small => "Below City-Scale (<50m)",
            SizeCategory::CityScale => "City-Scale Impact (50-100m)",
            SizeCategory::Regional => "Regional Catastrophe (100-1000m)",
            SizeCategory::Global => "Global Extinction (1km+)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SizeCategory::Small => {
                "Smaller than the City-Scale class. NEO Watch groups these separately and gives no consequence estimate for them."
            }
            SizeCategory::CityScale => {
                "Similar to the 1908 Tunguska event. Could devastate a metropolitan area but unlikely to cause global effects."
            }
            SizeCategory::Regional => {
                "Could destroy multiple cities and cause continental climate disruption. These are the primary focus of planetary defense."
            }
            SizeCategory::Global => {
                "Would cause worldwide devastation and potentially mass extinction. Most of these are already cataloged."
            }
        }
    }
}

// =============================================================================
// PLANETARY DEFENSE STRATEGIES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeflectionStrategy {
    KineticImpactor,
    GravityTractor,
    NuclearDeflection,
}

impl DeflectionStrategy {
    pub const ALL: [DeflectionStrategy; 3] = [
        DeflectionStrategy::KineticImpactor,
        DeflectionStrategy::GravityTractor,
        DeflectionStrategy::NuclearDeflection,
    ];

    pub fn badge(&self) -> &'static str {
        match self {
            DeflectionStrategy::KineticImpactor => "KINETIC IMPACTOR",
            DeflectionStrategy::GravityTractor => "GRAVITY TRACTOR",
            DeflectionStrategy::NuclearDeflection => "NUCLEAR DEFLECTION",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeflectionStrategy::KineticImpactor => {
                "Redirect asteroid trajectory by colliding a spacecraft at high velocity. Effective for early detection."
            }
            DeflectionStrategy::GravityTractor => {
                "Use a spacecraft's gravitational pull to slowly alter the asteroid's path over time. Non-destructive method."
            }
            DeflectionStrategy::NuclearDeflection => {
                "Last resort: use a nuclear explosion to vaporize surface material and change trajectory. High risk."
            }
        }
    }
}

/// Strategies worth considering for a given warning time, in order of
/// preference. Long lead times allow slow methods; short ones leave
/// only high-energy options.
pub fn recommend_strategies(warning_years: f64) -> Vec<DeflectionStrategy> {
    if warning_years >= 10.0 {
        vec![
            DeflectionStrategy::GravityTractor,
            DeflectionStrategy::KineticImpactor,
        ]
    } else if warning_years >= 5.0 {
        vec![DeflectionStrategy::KineticImpactor]
    } else {
        vec![
            DeflectionStrategy::KineticImpactor,
            DeflectionStrategy::NuclearDeflection,
        ]
    }
}

// =============================================================================
// TESTS
// =============================================================================
