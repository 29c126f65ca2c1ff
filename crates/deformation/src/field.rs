//! Field storage: square scalar grids, the normal surface, and the
//! ping-pong buffer pair addressed by role.

use bevy::prelude::*;

use crate::error::DeformationError;

// =============================================================================
// HeightGrid
// =============================================================================

/// Square grid of scalar heights, row-major (`y * resolution + x`).
///
/// Used for both persistent buffers and for snapshots. Texel centers sit on
/// integer coordinates; sampling outside the grid clamps to the nearest edge
/// texel.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    values: Vec<f32>,
    resolution: usize,
}

impl HeightGrid {
    /// Allocate a zeroed grid. Fails instead of aborting when memory is short.
    pub fn new(resolution: usize) -> Result<Self, DeformationError> {
        let values = try_alloc(resolution, 0.0_f32)?;
        Ok(Self { values, resolution })
    }

    /// Wrap existing row-major values; `values.len()` must be `resolution²`.
    pub fn from_values(resolution: usize, values: Vec<f32>) -> Result<Self, DeformationError> {
        let expected = resolution.checked_mul(resolution);
        if resolution == 0 || expected != Some(values.len()) {
            return Err(DeformationError::Configuration(format!(
                "grid of {} values does not match resolution {resolution}",
                values.len()
            )));
        }
        Ok(Self { values, resolution })
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.resolution + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, val: f32) {
        self.values[y * self.resolution + x] = val;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Read a texel with clamped-edge addressing.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let max = self.resolution as i64 - 1;
        let cx = x.clamp(0, max) as usize;
        let cy = y.clamp(0, max) as usize;
        self.get(cx, cy)
    }

    /// Bilinear sample at texel-space coordinates with clamped edges.
    ///
    /// Whole-texel coordinates return the stored value exactly.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let fx = x.floor();
        let fy = y.floor();
        let x0 = fx as i64;
        let y0 = fy as i64;
        let tx = x - fx;
        let ty = y - fy;
        if tx == 0.0 && ty == 0.0 {
            return self.get_clamped(x0, y0);
        }
        let a = self.get_clamped(x0, y0);
        let b = self.get_clamped(x0 + 1, y0);
        let c = self.get_clamped(x0, y0 + 1);
        let d = self.get_clamped(x0 + 1, y0 + 1);
        let top = a + (b - a) * tx;
        let bottom = c + (d - c) * tx;
        top + (bottom - top) * ty
    }

    /// Reset every texel to the neutral baseline (zero deformation).
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    /// Maximum value across all texels.
    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0_f32, f32::max)
    }

    /// Number of texels with a value > 0.
    pub fn deformed_texels(&self) -> u32 {
        self.values.iter().filter(|&&v| v > 0.0).count() as u32
    }
}

// =============================================================================
// NormalGrid
// =============================================================================

/// Per-texel surface normals derived from a filtered height buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalGrid {
    values: Vec<Vec3>,
    resolution: usize,
}

impl NormalGrid {
    /// Allocate a flat (all `+Y`) normal surface.
    pub fn new(resolution: usize) -> Result<Self, DeformationError> {
        let values = try_alloc(resolution, Vec3::Y)?;
        Ok(Self { values, resolution })
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Vec3 {
        self.values[y * self.resolution + x]
    }

    pub fn values(&self) -> &[Vec3] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Vec3] {
        &mut self.values
    }

    pub fn clear(&mut self) {
        self.values.fill(Vec3::Y);
    }
}

fn try_alloc<T: Clone>(resolution: usize, fill: T) -> Result<Vec<T>, DeformationError> {
    if resolution == 0 {
        return Err(DeformationError::Configuration(
            "resolution must be positive".to_string(),
        ));
    }
    let texels = resolution
        .checked_mul(resolution)
        .ok_or(DeformationError::ResourceExhaustion { texels: usize::MAX })?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(texels)
        .map_err(|_| DeformationError::ResourceExhaustion { texels })?;
    values.resize(texels, fill);
    Ok(values)
}

// =============================================================================
// FieldPair (ping-pong buffers)
// =============================================================================

/// Role a buffer plays during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Published, read by consumers and by the kernel.
    Current,
    /// Write target of the next update.
    Next,
}

/// Physical storage slot of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSlot {
    A,
    B,
}

impl FieldSlot {
    pub fn other(self) -> Self {
        match self {
            FieldSlot::A => FieldSlot::B,
            FieldSlot::B => FieldSlot::A,
        }
    }
}

/// Two equally sized persistent buffers addressed by role.
///
/// The role tag is the only thing that changes on swap; buffers are never
/// moved or copied. `read_write` hands out the current buffer shared and the
/// next buffer exclusively, so the kernel can never write what it reads.
#[derive(Debug, Clone)]
pub struct FieldPair {
    a: HeightGrid,
    b: HeightGrid,
    current: FieldSlot,
}

impl FieldPair {
    pub fn new(resolution: usize) -> Result<Self, DeformationError> {
        Ok(Self {
            a: HeightGrid::new(resolution)?,
            b: HeightGrid::new(resolution)?,
            current: FieldSlot::A,
        })
    }

    pub fn resolution(&self) -> usize {
        self.a.resolution()
    }

    /// Which slot currently plays `role`.
    pub fn slot_for(&self, role: FieldRole) -> FieldSlot {
        match role {
            FieldRole::Current => self.current,
            FieldRole::Next => self.current.other(),
        }
    }

    /// Which role `slot` currently plays.
    pub fn role_of(&self, slot: FieldSlot) -> FieldRole {
        if slot == self.current {
            FieldRole::Current
        } else {
            FieldRole::Next
        }
    }

    /// The buffer currently published to readers.
    pub fn current(&self) -> &HeightGrid {
        self.slot(self.current)
    }

    pub fn slot(&self, slot: FieldSlot) -> &HeightGrid {
        match slot {
            FieldSlot::A => &self.a,
            FieldSlot::B => &self.b,
        }
    }

    /// `(current, next)`: read the former, write the latter.
    pub fn read_write(&mut self) -> (&HeightGrid, &mut HeightGrid) {
        match self.current {
            FieldSlot::A => (&self.a, &mut self.b),
            FieldSlot::B => (&self.b, &mut self.a),
        }
    }

    /// Promote `Next` to `Current`. The old current becomes the next write target.
    pub fn swap_roles(&mut self) {
        self.current = self.current.other();
    }

    pub fn clear(&mut self) {
        self.a.clear();
        self.b.clear();
    }
}
