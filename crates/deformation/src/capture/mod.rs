//! Snapshot capture.
//!
//! A [`SnapshotSource`] turns a [`CaptureRequest`] (square window centered on
//! the recentred field origin) into an R×R [`Snapshot`] of observed contact
//! height. The orchestrator drives it through [`PendingCapture`], either on
//! the `AsyncComputeTaskPool` or inline.
//!
//! The built-in [`ContactStampSource`] rasterises [`DeformationContact`]
//! components and stands in for a real depth camera.

pub mod contact;
pub mod pending;

pub use contact::{ContactStamp, ContactStampSource, DeformationContact};
pub use pending::{CapturePoll, PendingCapture};

use std::sync::Arc;

use bevy::prelude::*;

use crate::error::DeformationError;
use crate::field::HeightGrid;

/// One capture of the window around the field origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    /// World XZ position of the window center (whole-texel aligned).
    pub center: Vec2,
    /// World width of the window.
    pub extent: f32,
    pub resolution: usize,
    /// Monotonic id; a snapshot answers exactly one request.
    pub sequence: u64,
}

impl CaptureRequest {
    pub fn texel_size(&self) -> f32 {
        self.extent / self.resolution as f32
    }

    /// World XZ position of the center of texel `(x, y)`.
    ///
    /// Texel `R / 2` sits on the window center.
    pub fn texel_to_world(&self, x: usize, y: usize) -> Vec2 {
        let half = (self.resolution / 2) as f32;
        self.center + (Vec2::new(x as f32, y as f32) - Vec2::splat(half)) * self.texel_size()
    }

    /// Continuous texel coordinate of a world position (inverse of
    /// [`texel_to_world`](Self::texel_to_world)).
    pub fn world_to_texel(&self, world: Vec2) -> Vec2 {
        let half = (self.resolution / 2) as f32;
        (world - self.center) / self.texel_size() + Vec2::splat(half)
    }
}

/// Everything a source may look at while capturing. Cloned into async tasks.
#[derive(Debug, Clone, Default)]
pub struct CaptureScene {
    pub contacts: Vec<ContactStamp>,
}

/// Observed contact height for one request. Moved into the update that
/// consumes it; there is no way to read it twice.
#[derive(Debug)]
pub struct Snapshot {
    grid: HeightGrid,
    sequence: u64,
}

impl Snapshot {
    /// Wrap a captured grid, checking it matches the request.
    pub fn new(request: &CaptureRequest, grid: HeightGrid) -> Result<Self, DeformationError> {
        if grid.resolution() != request.resolution {
            return Err(DeformationError::CaptureUnavailable(format!(
                "snapshot resolution {} does not match requested {}",
                grid.resolution(),
                request.resolution
            )));
        }
        Ok(Self {
            grid,
            sequence: request.sequence,
        })
    }

    pub fn resolution(&self) -> usize {
        self.grid.resolution()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn into_grid(self) -> HeightGrid {
        self.grid
    }
}

/// External producer of snapshots.
pub trait SnapshotSource: Send + Sync + 'static {
    /// Whether a capture can be requested this frame.
    fn is_ready(&self) -> bool {
        true
    }

    fn capture(
        &self,
        request: &CaptureRequest,
        scene: &CaptureScene,
    ) -> Result<Snapshot, DeformationError>;
}

/// The installed snapshot source. Replace it to plug in another backend.
#[derive(Resource, Clone)]
pub struct CaptureBackend(pub Arc<dyn SnapshotSource>);

impl CaptureBackend {
    pub fn new(source: impl SnapshotSource) -> Self {
        Self(Arc::new(source))
    }
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::new(ContactStampSource)
    }
}
