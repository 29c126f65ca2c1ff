//! Types and constants for the deformation overlay.

use bevy::prelude::*;

/// Y position of the overlay quad (just above the ground plane at Y=0).
pub(crate) const OVERLAY_Y: f32 = 0.05;

/// Depth mapped to the top of the preview ramp when nothing deeper exists.
pub(crate) const MIN_PREVIEW_RANGE: f32 = 1.0;

/// Overlay display settings, edited from the UI panel.
#[derive(Resource, Debug, Clone)]
pub struct DeformationOverlay {
    pub visible: bool,
    /// Preview opacity.
    pub opacity: f32,
}

impl Default for DeformationOverlay {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 0.85,
        }
    }
}

/// GPU-side copies of the latest published field.
#[derive(Resource, Debug, Clone, Default)]
pub struct DeformationTextures {
    pub heights: Handle<Image>,
    pub normals: Handle<Image>,
    pub preview: Handle<Image>,
    /// Generation the images were last encoded from.
    pub generation: u64,
}

/// Marker for the overlay quad entity.
#[derive(Component)]
pub struct DeformationQuad;
