//! Encoding the published field into texture bytes.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

use deformation::field::{HeightGrid, NormalGrid};

use super::colors::{depth_color, to_rgba8};
use super::types::MIN_PREVIEW_RANGE;

fn texture(size: usize, data: Vec<u8>, format: TextureFormat) -> Image {
    let mut image = Image::new(
        Extent3d {
            width: size as u32,
            height: size as u32,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        format,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    );
    image.sampler = bevy::image::ImageSampler::linear();
    image
}

/// Transparent 1x1 placeholder used until the first publication.
pub(crate) fn create_blank_image(format: TextureFormat, bytes_per_texel: usize) -> Image {
    texture(1, vec![0u8; bytes_per_texel], format)
}

/// Little-endian `f32` bytes, row-major.
pub(crate) fn encode_heights(heights: &HeightGrid) -> Vec<u8> {
    heights
        .values()
        .iter()
        .flat_map(|h| h.to_le_bytes())
        .collect()
}

/// Unit normals remapped from `[-1, 1]` into `[0, 255]`.
pub(crate) fn encode_normals(normals: &NormalGrid) -> Vec<u8> {
    let mut data = Vec::with_capacity(normals.values().len() * 4);
    for n in normals.values() {
        let packed = *n * 0.5 + Vec3::splat(0.5);
        data.extend_from_slice(&to_rgba8(packed.to_array(), 1.0));
    }
    data
}

/// Depth scaled by the deepest texel, untouched texels fully transparent.
pub(crate) fn encode_preview(heights: &HeightGrid) -> Vec<u8> {
    let range = heights.max_value().max(MIN_PREVIEW_RANGE);
    let mut data = Vec::with_capacity(heights.values().len() * 4);
    for &h in heights.values() {
        let pixel = if h > 0.0 {
            to_rgba8(depth_color(h / range), 1.0)
        } else {
            [0, 0, 0, 0]
        };
        data.extend_from_slice(&pixel);
    }
    data
}

pub(crate) fn height_image(heights: &HeightGrid) -> Image {
    texture(
        heights.resolution(),
        encode_heights(heights),
        TextureFormat::R32Float,
    )
}

pub(crate) fn normal_image(normals: &NormalGrid) -> Image {
    texture(
        normals.resolution(),
        encode_normals(normals),
        TextureFormat::Rgba8Unorm,
    )
}

pub(crate) fn preview_image(heights: &HeightGrid) -> Image {
    texture(
        heights.resolution(),
        encode_preview(heights),
        TextureFormat::Rgba8UnormSrgb,
    )
}

/// World XZ center of the quad covering the field.
///
/// Texel `i` sits at `origin + (i - R/2) * d`, so the texel block
/// `[-0.5, R - 0.5]` is centered half a texel before the origin.
pub(crate) fn quad_center(origin: Vec2, texel_size: f32) -> Vec2 {
    origin - Vec2::splat(0.5 * texel_size)
}
