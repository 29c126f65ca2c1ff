//! Field update kernel.
//!
//! Two passes per update:
//!
//! 1. **Height pass** — for every output texel, resample the previous buffer
//!    at `p + offset` (clamped edges), read the snapshot at `p`, run the
//!    accumulation model and the exponential temporal filter, clamp to
//!    `[0, cap]`.
//! 2. **Normal pass** — central differences over the buffer written by pass 1.
//!
//! Texels are independent within a pass, so each pass splits the output into
//! row bands and runs them on the `ComputeTaskPool`. The pool scope joins all
//! bands before returning, which is the barrier between the two passes.

use bevy::prelude::*;
use bevy::tasks::{ComputeTaskPool, TaskPool};
use serde::{Deserialize, Serialize};

use crate::config::DeformationConfig;
use crate::error::DeformationError;
use crate::field::{HeightGrid, NormalGrid};

/// How the row bands of a pass are executed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelExecution {
    #[default]
    Parallel,
    Serial,
}

// =============================================================================
// Parameters
// =============================================================================

/// Scalars for one update. Rebuilt every qualifying frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateParameters {
    pub delta_time: f32,
    pub temporal_filter_factor: f32,
    pub accumulation_rate: f32,
    pub accumulation_cap: f32,
    pub decay_rate: f32,
    pub non_uniform_exponent: f32,
    pub contact_threshold: f32,
}

impl UpdateParameters {
    pub fn from_config(config: &DeformationConfig, delta_time: f32) -> Self {
        Self {
            delta_time,
            temporal_filter_factor: config.temporal_filter_factor,
            accumulation_rate: config.accumulation_rate,
            accumulation_cap: config.accumulation_cap,
            decay_rate: config.decay_rate,
            non_uniform_exponent: config.non_uniform_exponent,
            contact_threshold: config.contact_threshold,
        }
    }

    /// A paused, stepped-back, or corrupt frame time.
    pub fn temporal_anomaly(&self) -> Option<DeformationError> {
        if self.delta_time.is_finite() && self.delta_time > 0.0 {
            None
        } else {
            Some(DeformationError::TemporalAnomaly {
                delta_time: self.delta_time,
            })
        }
    }
}

// =============================================================================
// Per-texel math (pure, testable without buffers)
// =============================================================================

/// Frame-rate independent blend weight `1 - exp(-factor * dt)`.
///
/// Returns exactly 0 for anomalous frame times and non-positive factors, and
/// exactly 1 for an infinite factor.
pub fn temporal_weight(factor: f32, delta_time: f32) -> f32 {
    if !(delta_time.is_finite() && delta_time > 0.0) {
        return 0.0;
    }
    if factor.is_nan() || factor <= 0.0 {
        return 0.0;
    }
    if factor == f32::INFINITY {
        return 1.0;
    }
    1.0 - (-factor * delta_time).exp()
}

/// Accumulation model: where this texel is heading before temporal filtering.
///
/// In contact, depth grows by `rate * dt`, optionally slowed near the cap by
/// `(1 - prev / cap) ^ exponent`. Out of contact it decays linearly (or holds
/// when `decay_rate` is 0). NaN observations never count as contact.
pub fn accumulation_target(prev: f32, observed: f32, params: &UpdateParameters) -> f32 {
    let dt = params.delta_time;
    if observed > params.contact_threshold {
        let shape = if params.non_uniform_exponent > 0.0 {
            (1.0 - prev / params.accumulation_cap)
                .max(0.0)
                .powf(params.non_uniform_exponent)
        } else {
            1.0
        };
        prev + params.accumulation_rate * dt * shape
    } else if params.decay_rate > 0.0 {
        prev - params.decay_rate * dt
    } else {
        prev
    }
}

/// Full per-texel update: accumulate, filter, clamp.
#[inline]
pub fn filter_texel(prev: f32, observed: f32, params: &UpdateParameters, weight: f32) -> f32 {
    if weight == 0.0 {
        return prev;
    }
    let target = accumulation_target(prev, observed, params);
    let filtered = if weight >= 1.0 {
        target
    } else {
        prev + (target - prev) * weight
    };
    filtered.clamp(0.0, params.accumulation_cap)
}

// =============================================================================
// Passes
// =============================================================================

/// Height pass: `out[p] = filter(prev(p + offset), snapshot(p))`.
///
/// `offset` is in texels. Whole-texel offsets resample exactly.
pub fn run_height_pass(
    prev: &HeightGrid,
    snapshot: &HeightGrid,
    offset: Vec2,
    params: &UpdateParameters,
    out: &mut HeightGrid,
    execution: KernelExecution,
) -> Result<(), DeformationError> {
    let resolution = prev.resolution();
    if snapshot.resolution() != resolution || out.resolution() != resolution {
        return Err(DeformationError::Configuration(format!(
            "mismatched buffer sizes: previous {resolution}, snapshot {}, output {}",
            snapshot.resolution(),
            out.resolution()
        )));
    }

    if let Some(anomaly) = params.temporal_anomaly() {
        debug!("Deformation kernel: {anomaly}");
    }
    let weight = temporal_weight(params.temporal_filter_factor, params.delta_time);

    for_each_band(
        out.values_mut(),
        resolution,
        execution,
        |first_row, rows: &mut [f32]| {
            for (k, row) in rows.chunks_mut(resolution).enumerate() {
                let y = first_row + k;
                for (x, texel) in row.iter_mut().enumerate() {
                    let previous =
                        prev.sample_bilinear(x as f32 + offset.x, y as f32 + offset.y);
                    *texel = filter_texel(previous, snapshot.get(x, y), params, weight);
                }
            }
        },
    );
    Ok(())
}

/// Normal pass over an already filtered height buffer.
///
/// The field stores depth (the surface is pushed down by it), so the normal is
/// `normalize(h(x+1) - h(x-1), 2 * texel_size, h(y+1) - h(y-1))` with grid
/// `x` along world X and grid `y` along world Z.
pub fn run_normal_pass(
    heights: &HeightGrid,
    texel_world_size: f32,
    out: &mut NormalGrid,
    execution: KernelExecution,
) -> Result<(), DeformationError> {
    let resolution = heights.resolution();
    if out.resolution() != resolution {
        return Err(DeformationError::Configuration(format!(
            "mismatched buffer sizes: heights {resolution}, normals {}",
            out.resolution()
        )));
    }
    let span = 2.0 * texel_world_size;

    for_each_band(
        out.values_mut(),
        resolution,
        execution,
        |first_row, rows: &mut [Vec3]| {
            for (k, row) in rows.chunks_mut(resolution).enumerate() {
                let y = (first_row + k) as i64;
                for (x, normal) in row.iter_mut().enumerate() {
                    let x = x as i64;
                    let dx = heights.get_clamped(x + 1, y) - heights.get_clamped(x - 1, y);
                    let dz = heights.get_clamped(x, y + 1) - heights.get_clamped(x, y - 1);
                    let n = Vec3::new(dx, span, dz).normalize_or_zero();
                    *normal = if n == Vec3::ZERO { Vec3::Y } else { n };
                }
            }
        },
    );
    Ok(())
}

/// Split `values` into bands of whole rows and run `f(first_row, band)` on each.
fn for_each_band<T, F>(values: &mut [T], resolution: usize, execution: KernelExecution, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    match execution {
        KernelExecution::Serial => f(0, values),
        KernelExecution::Parallel => {
            let pool = ComputeTaskPool::get_or_init(TaskPool::default);
            let bands = pool.thread_num().max(1);
            let rows_per_band = resolution.div_ceil(bands).max(1);
            let f = &f;
            pool.scope(|scope| {
                for (band, chunk) in values.chunks_mut(rows_per_band * resolution).enumerate() {
                    scope.spawn(async move { f(band * rows_per_band, chunk) });
                }
            });
        }
    }
}
