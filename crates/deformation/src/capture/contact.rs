//! CPU contact rasteriser used as the default snapshot source.

use bevy::prelude::*;

use super::{CaptureRequest, CaptureScene, Snapshot, SnapshotSource};
use crate::error::DeformationError;
use crate::field::HeightGrid;

/// Something that presses into the surface (a foot, a wheel, a walker).
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct DeformationContact {
    /// World radius of the contact disc.
    pub radius: f32,
    /// Observed height reported inside the disc.
    pub depth: f32,
}

impl Default for DeformationContact {
    fn default() -> Self {
        Self {
            radius: 1.0,
            depth: 1.0,
        }
    }
}

/// A contact flattened to plain data for capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactStamp {
    pub position: Vec2,
    pub radius: f32,
    pub depth: f32,
}

impl ContactStamp {
    pub fn new(position: Vec2, contact: &DeformationContact) -> Self {
        Self {
            position,
            radius: contact.radius,
            depth: contact.depth,
        }
    }

    fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.radius.is_finite()
            && self.radius >= 0.0
            && self.depth.is_finite()
            && self.depth > 0.0
    }
}

/// Rasterises every contact as a disc; overlapping discs keep the maximum.
///
/// The texel nearest a contact is always stamped, so contacts smaller than a
/// texel still register. Contacts whose center lies outside the window are
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactStampSource;

impl SnapshotSource for ContactStampSource {
    fn capture(
        &self,
        request: &CaptureRequest,
        scene: &CaptureScene,
    ) -> Result<Snapshot, DeformationError> {
        let mut grid = HeightGrid::new(request.resolution)?;
        for stamp in scene.contacts.iter().filter(|s| s.is_valid()) {
            stamp_disc(&mut grid, request, stamp);
        }
        Snapshot::new(request, grid)
    }
}

fn stamp_disc(grid: &mut HeightGrid, request: &CaptureRequest, stamp: &ContactStamp) {
    let resolution = request.resolution as i64;
    let center = request.world_to_texel(stamp.position);
    let nearest = center.round();
    let (nx, ny) = (nearest.x as i64, nearest.y as i64);
    if nx < 0 || ny < 0 || nx >= resolution || ny >= resolution {
        return;
    }
    raise(grid, nx as usize, ny as usize, stamp.depth);

    let reach = (stamp.radius / request.texel_size()).ceil() as i64;
    let r2 = stamp.radius * stamp.radius;
    let x_range = (nx - reach).max(0)..=(nx + reach).min(resolution - 1);
    for y in (ny - reach).max(0)..=(ny + reach).min(resolution - 1) {
        for x in x_range.clone() {
            let world = request.texel_to_world(x as usize, y as usize);
            if world.distance_squared(stamp.position) <= r2 {
                raise(grid, x as usize, y as usize, stamp.depth);
            }
        }
    }
}

fn raise(grid: &mut HeightGrid, x: usize, y: usize, depth: f32) {
    if grid.get(x, y) < depth {
        grid.set(x, y, depth);
    }
}
