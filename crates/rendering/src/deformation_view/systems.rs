//! ECS systems for the deformation overlay.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::TextureFormat;

use deformation::{DeformationField, DeformationSet, FieldPublished};

use super::image_gen::{create_blank_image, height_image, normal_image, preview_image, quad_center};
use super::types::{DeformationOverlay, DeformationQuad, DeformationTextures, OVERLAY_Y};

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct DeformationViewPlugin;

impl Plugin for DeformationViewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DeformationOverlay>()
            .init_resource::<DeformationTextures>()
            .add_systems(Startup, spawn_deformation_quad)
            .add_systems(
                Update,
                (upload_published_field, update_overlay_visibility)
                    .chain()
                    .after(DeformationSet::Update),
            );
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

/// Create the placeholder textures and the overlay quad.
fn spawn_deformation_quad(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut textures: ResMut<DeformationTextures>,
    overlay: Res<DeformationOverlay>,
) {
    textures.heights = images.add(create_blank_image(TextureFormat::R32Float, 4));
    textures.normals = images.add(create_blank_image(TextureFormat::Rgba8Unorm, 4));
    textures.preview = images.add(create_blank_image(TextureFormat::Rgba8UnormSrgb, 4));

    // Unit quad on the XZ plane; scaled to the capture extent on publish.
    // UV (0, 0) is texel (0, 0) at the -X/-Z corner.
    let mesh = meshes.add(
        Mesh::new(
            bevy::render::mesh::PrimitiveTopology::TriangleList,
            RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
        )
        .with_inserted_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![
                [-0.5, 0.0, -0.5],
                [0.5, 0.0, -0.5],
                [0.5, 0.0, 0.5],
                [-0.5, 0.0, 0.5],
            ],
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 1.0, 0.0]; 4])
        .with_inserted_attribute(
            Mesh::ATTRIBUTE_UV_0,
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        )
        .with_inserted_indices(bevy::render::mesh::Indices::U32(vec![0, 2, 1, 0, 3, 2])),
    );

    let material = materials.add(StandardMaterial {
        base_color_texture: Some(textures.preview.clone()),
        base_color: Color::srgba(1.0, 1.0, 1.0, overlay.opacity),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        double_sided: true,
        cull_mode: None,
        ..default()
    });

    commands.spawn((
        Mesh3d(mesh),
        MeshMaterial3d(material),
        Transform::from_xyz(0.0, OVERLAY_Y, 0.0),
        Visibility::Hidden,
        DeformationQuad,
    ));
}

/// Re-encode the textures and move the quad when a new generation is published.
fn upload_published_field(
    mut published: EventReader<FieldPublished>,
    field: Res<DeformationField>,
    mut textures: ResMut<DeformationTextures>,
    mut images: ResMut<Assets<Image>>,
    mut quad_q: Query<&mut Transform, With<DeformationQuad>>,
) {
    // Only the newest generation matters.
    let Some(latest) = published.read().map(|e| e.generation).max() else {
        return;
    };
    let Some(view) = field.view() else {
        // Cleared or released: nothing to show until the next capture.
        textures.generation = latest;
        return;
    };

    if let Some(image) = images.get_mut(&textures.heights) {
        *image = height_image(view.heights);
    }
    if let Some(image) = images.get_mut(&textures.normals) {
        *image = normal_image(view.normals);
    }
    if let Some(image) = images.get_mut(&textures.preview) {
        *image = preview_image(view.heights);
    }
    textures.generation = view.generation;

    let extent = view.resolution as f32 * view.post_delta;
    let center = quad_center(view.origin, view.post_delta);
    for mut transform in &mut quad_q {
        transform.translation = Vec3::new(center.x, OVERLAY_Y, center.y);
        transform.scale = Vec3::new(extent, 1.0, extent);
    }
}

/// Apply overlay visibility and opacity.
fn update_overlay_visibility(
    overlay: Res<DeformationOverlay>,
    field: Res<DeformationField>,
    mut quad_q: Query<(&MeshMaterial3d<StandardMaterial>, &mut Visibility), With<DeformationQuad>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !overlay.is_changed() && !field.is_changed() {
        return;
    }
    let show = overlay.visible && field.view().is_some();
    for (mat_handle, mut vis) in &mut quad_q {
        *vis = if show {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        if let Some(mat) = materials.get_mut(mat_handle) {
            mat.base_color = Color::srgba(1.0, 1.0, 1.0, overlay.opacity);
        }
    }
}
