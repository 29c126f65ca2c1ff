//! Runtime configuration for the deformation field.
//!
//! All tunables live in a single [`DeformationConfig`] resource so the demo
//! app can load them from JSON and the UI panel can edit them live. Values
//! that shape the buffers (`resolution`, `capture_extent`) are read once at
//! initialization; everything else is re-read on every update.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::DeformationError;
use crate::kernel::KernelExecution;

/// Default field resolution (texels per axis).
pub const DEFAULT_RESOLUTION: usize = 1024;

/// Default world-space width of the captured region.
pub const DEFAULT_CAPTURE_EXTENT: f32 = 4096.0;

/// Largest accepted resolution. 16384² texels is already 1 GiB per buffer.
pub const MAX_RESOLUTION: usize = 16384;

/// How the snapshot source is driven.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    /// Capture runs on the `AsyncComputeTaskPool` and is polled every frame.
    #[default]
    Async,
    /// Capture runs synchronously inside the scheduling system.
    Inline,
}

/// Tunables for the persistent deformation field.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationConfig {
    /// Global toggle. When false the field is left static.
    pub enabled: bool,
    /// Minimum seconds between two qualifying updates (0 = every frame).
    pub min_update_interval: f32,
    /// Texels per axis for snapshot and both persistent buffers. Power of two.
    pub resolution: usize,
    /// World-space width covered by the field.
    pub capture_extent: f32,
    /// Exponential smoothing rate (1/s). `inf` makes the filter instant.
    pub temporal_filter_factor: f32,
    /// Depth added per second while a texel is in contact.
    pub accumulation_rate: f32,
    /// Maximum accumulated depth.
    pub accumulation_cap: f32,
    /// Depth removed per second while a texel is free (0 = hold forever).
    pub decay_rate: f32,
    /// Shapes the build-up as `(1 - depth / cap) ^ exponent`. 0 disables.
    pub non_uniform_exponent: f32,
    /// Observed height above which a texel counts as disturbed.
    pub contact_threshold: f32,
    /// Seconds a capture may stay in flight before the update is abandoned.
    pub capture_timeout_secs: f32,
    pub capture_mode: CaptureMode,
    pub kernel_execution: KernelExecution,
    /// Derive the normal surface after each height pass.
    pub compute_normals: bool,
}

impl Default for DeformationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_update_interval: 0.0,
            resolution: DEFAULT_RESOLUTION,
            capture_extent: DEFAULT_CAPTURE_EXTENT,
            temporal_filter_factor: 2.0,
            accumulation_rate: 55.0,
            accumulation_cap: 110.0,
            decay_rate: 0.0,
            non_uniform_exponent: 0.0,
            contact_threshold: 0.0,
            capture_timeout_secs: 0.5,
            capture_mode: CaptureMode::Async,
            kernel_execution: KernelExecution::Parallel,
            compute_normals: true,
        }
    }
}

impl DeformationConfig {
    /// World-space size of one texel (`capture_extent / resolution`).
    pub fn texel_world_size(&self) -> f32 {
        self.capture_extent / self.resolution as f32
    }

    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DeformationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DeformationError::Configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting, returning the first problem found.
    pub fn validate(&self) -> Result<(), DeformationError> {
        if self.resolution == 0 {
            return Err(config_error("resolution must be positive"));
        }
        if !self.resolution.is_power_of_two() {
            return Err(config_error(format!(
                "resolution {} is not a power of two",
                self.resolution
            )));
        }
        if self.resolution > MAX_RESOLUTION {
            return Err(config_error(format!(
                "resolution {} exceeds the maximum of {MAX_RESOLUTION}",
                self.resolution
            )));
        }
        if !(self.capture_extent.is_finite() && self.capture_extent > 0.0) {
            return Err(config_error(format!(
                "capture extent {} must be finite and positive",
                self.capture_extent
            )));
        }
        if !(self.accumulation_cap.is_finite() && self.accumulation_cap > 0.0) {
            return Err(config_error(format!(
                "accumulation cap {} must be finite and positive",
                self.accumulation_cap
            )));
        }
        if !(self.accumulation_rate.is_finite() && self.accumulation_rate >= 0.0) {
            return Err(config_error("accumulation rate must be finite and >= 0"));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate >= 0.0) {
            return Err(config_error("decay rate must be finite and >= 0"));
        }
        // +inf is allowed and means "no smoothing".
        if self.temporal_filter_factor.is_nan() || self.temporal_filter_factor < 0.0 {
            return Err(config_error("temporal filter factor must be >= 0"));
        }
        if !(self.non_uniform_exponent.is_finite() && self.non_uniform_exponent >= 0.0) {
            return Err(config_error("non-uniform exponent must be finite and >= 0"));
        }
        if !self.contact_threshold.is_finite() {
            return Err(config_error("contact threshold must be finite"));
        }
        if !(self.min_update_interval.is_finite() && self.min_update_interval >= 0.0) {
            return Err(config_error("minimum update interval must be finite and >= 0"));
        }
        if self.capture_timeout_secs.is_nan() || self.capture_timeout_secs <= 0.0 {
            return Err(config_error("capture timeout must be positive"));
        }
        Ok(())
    }
}

fn config_error(msg: impl Into<String>) -> DeformationError {
    DeformationError::Configuration(msg.into())
}
