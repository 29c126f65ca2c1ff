use bevy::prelude::*;

pub mod camera;
pub mod deformation_view;

use deformation::DeformationSet;

pub use deformation_view::{DeformationOverlay, DeformationTextures};

pub struct RenderingPlugin;

impl Plugin for RenderingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(deformation_view::DeformationViewPlugin)
            .add_systems(Startup, camera::setup_camera)
            .add_systems(
                Update,
                (
                    camera::camera_orbit_keys,
                    camera::camera_orbit_drag,
                    camera::camera_zoom,
                    camera::follow_anchor.after(DeformationSet::Track),
                    camera::apply_orbit_camera,
                )
                    .chain(),
            );
    }
}
