use crate::driver::FieldView;
use crate::error::{FluidError, Result};
use crate::field::EdgePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable tuning for one simulation instance.
///
/// Valid ranges are checked by [`FluidConfig::validate`]:
///
/// * `resolution >= 8` (rounded up to a multiple of the 8-wide tile by the grid)
/// * `viscosity > 0`, finite
/// * `grid_step_size > 0`, finite
/// * `aspect > 0`, finite (height / width of the simulated area)
/// * `radius_scale`, `velocity_scale`, `force`, `exponent` finite and `>= 0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidConfig {
    pub resolution: usize,
    pub aspect: f32,
    pub viscosity: f32,
    pub force: f32,
    pub exponent: f32,
    pub radius_scale: f32,
    pub velocity_scale: f32,
    pub grid_step_size: f32,
    pub grid_height: f32,
    pub edge_policy: EdgePolicy,
    pub preview: FieldView,
}

impl Default for FluidConfig {
    fn default() -> Self {
        Self {
            resolution: 512,
            aspect: 1.0,
            viscosity: 1e-6,
            force: 300.0,
            exponent: 200.0,
            radius_scale: 2.2,
            velocity_scale: 1.4,
            grid_step_size: 0.5,
            grid_height: 0.4,
            edge_policy: EdgePolicy::Zero,
            preview: FieldView::V3,
        }
    }
}

impl FluidConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded fluid config from {:?}", path);
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution < 8 {
            return Err(invalid(format!(
                "resolution must be at least 8, got {}",
                self.resolution
            )));
        }
        positive("viscosity", self.viscosity)?;
        positive("grid_step_size", self.grid_step_size)?;
        positive("aspect", self.aspect)?;
        non_negative("force", self.force)?;
        non_negative("exponent", self.exponent)?;
        non_negative("radius_scale", self.radius_scale)?;
        non_negative("velocity_scale", self.velocity_scale)?;
        if !self.grid_height.is_finite() {
            return Err(invalid("grid_height must be finite".to_string()));
        }
        Ok(())
    }

    /// World-space width of the grid: `resolution * grid_step_size`.
    pub fn world_extent(&self) -> f32 {
        self.resolution as f32 * self.grid_step_size
    }
}

fn invalid(message: String) -> FluidError {
    FluidError::InvalidConfig(message)
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and > 0, got {value}")))
    }
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite and >= 0, got {value}")))
    }
}
