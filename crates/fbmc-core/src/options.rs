//! Model options carried by market results and FBMC configuration.
//!
//! [`ModelOptions`] mirrors the option tree published with every base-case
//! result (`optimization.plant_types`, `grid.capacity_multiplier`).
//! [`FbmcConfig`] holds the tunables of the flow-based domain computation.
//! Both support partial documents where unspecified values use defaults.

use crate::error::{FbmcError, FbmcResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Generation shift key strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GskStrategy {
    /// Equal share for every node of a zone
    Flat,
    /// Share proportional to dispatchable generation capacity
    #[default]
    Gmax,
}

impl GskStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GskStrategy::Flat => "flat",
            GskStrategy::Gmax => "gmax",
        }
    }
}

impl fmt::Display for GskStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GskStrategy {
    type Err = FbmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(GskStrategy::Flat),
            "gmax" => Ok(GskStrategy::Gmax),
            other => Err(FbmcError::Config(format!(
                "unknown GSK strategy '{}'; supported values: flat, gmax",
                other
            ))),
        }
    }
}

/// Plant-type tags excluded from dispatchable capacity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantTypes {
    /// Time-series driven plants (wind, solar, run-of-river, ...)
    pub ts: Vec<String>,
    /// Storage plants
    pub es: Vec<String>,
}

impl PlantTypes {
    /// Whether a plant of this type contributes to the `gmax` key.
    pub fn is_dispatchable(&self, plant_type: &str) -> bool {
        !self.ts.iter().any(|t| t == plant_type) && !self.es.iter().any(|t| t == plant_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationOptions {
    pub plant_types: PlantTypes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridOptions {
    /// Line capacities are divided by this factor when computing RAM
    pub capacity_multiplier: f64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            capacity_multiplier: 1.0,
        }
    }
}

/// Options published alongside a market result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub optimization: OptimizationOptions,
    pub grid: GridOptions,
}

/// Tunables of the flow-based domain computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FbmcConfig {
    /// Zones subject to flow-based capacity allocation
    pub flowbased_region: Vec<String>,
    /// Zone-to-zone PTDF threshold above which a line is critical
    pub cb_threshold: f64,
    /// LODF threshold above which an outage is relevant for a line
    pub lodf_sensitivity: f64,
    /// Share of the thermal limit reserved as FRM/FAV
    pub frm_fraction: f64,
    /// Allocation key used for the per-timestep domains
    pub gsk_strategy: GskStrategy,
    /// RAM values below this are replaced once any RAM is negative
    pub ram_clamp_threshold: f64,
    /// Replacement value for clamped RAM
    pub ram_clamp_value: f64,
    /// Replacement for non-positive right-hand sides in 2-D projections
    pub rhs_floor: f64,
}

impl Default for FbmcConfig {
    fn default() -> Self {
        Self {
            flowbased_region: ["DE", "FR", "NL", "BE", "LU"]
                .iter()
                .map(|z| z.to_string())
                .collect(),
            cb_threshold: 5e-2,
            lodf_sensitivity: 10e-2,
            frm_fraction: 0.2,
            gsk_strategy: GskStrategy::Gmax,
            ram_clamp_threshold: 100.0,
            ram_clamp_value: 10_000.0,
            rhs_floor: 0.1,
        }
    }
}

impl FbmcConfig {
    pub fn from_yaml_str(data: &str) -> FbmcResult<Self> {
        let config: Self = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(data: &str) -> FbmcResult<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file; other extensions try both.
    pub fn from_path(path: &Path) -> FbmcResult<Self> {
        let data = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml_str(&data)
            }
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&data),
            _ => Self::from_yaml_str(&data).or_else(|_| Self::from_json_str(&data)),
        }
    }

    pub fn validate(&self) -> FbmcResult<()> {
        if !(self.cb_threshold >= 0.0) {
            return Err(FbmcError::Config(format!(
                "cb_threshold must be non-negative, got {}",
                self.cb_threshold
            )));
        }
        if !(self.lodf_sensitivity >= 0.0) {
            return Err(FbmcError::Config(format!(
                "lodf_sensitivity must be non-negative, got {}",
                self.lodf_sensitivity
            )));
        }
        if !(0.0..1.0).contains(&self.frm_fraction) {
            return Err(FbmcError::Config(format!(
                "frm_fraction must lie in [0, 1), got {}",
                self.frm_fraction
            )));
        }
        if !(self.ram_clamp_threshold >= 0.0) {
            return Err(FbmcError::Config(format!(
                "ram_clamp_threshold must be non-negative, got {}",
                self.ram_clamp_threshold
            )));
        }
        if !(self.ram_clamp_value > 0.0) {
            return Err(FbmcError::Config(format!(
                "ram_clamp_value must be positive, got {}",
                self.ram_clamp_value
            )));
        }
        if !(self.rhs_floor > 0.0) {
            return Err(FbmcError::Config(format!(
                "rhs_floor must be positive, got {}",
                self.rhs_floor
            )));
        }
        Ok(())
    }
}
