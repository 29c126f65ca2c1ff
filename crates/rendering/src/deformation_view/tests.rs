//! Tests for deformation overlay encoding.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use bevy::render::render_resource::TextureFormat;

    use deformation::field::{HeightGrid, NormalGrid};

    use crate::deformation_view::colors::{depth_color, to_rgba8};
    use crate::deformation_view::image_gen::{
        create_blank_image, encode_heights, encode_normals, encode_preview, height_image,
        preview_image, quad_center,
    };

    #[test]
    fn test_depth_color_endpoints_and_clamping() {
        assert_eq!(depth_color(0.0), depth_color(-3.0));
        assert_eq!(depth_color(1.0), depth_color(7.0));
        assert_eq!(depth_color(f32::NAN), depth_color(0.0));
        // Deeper is darker.
        let shallow: f32 = depth_color(0.1).iter().sum();
        let deep: f32 = depth_color(0.9).iter().sum();
        assert!(deep < shallow);
    }

    #[test]
    fn test_to_rgba8_rounds_and_clamps() {
        assert_eq!(to_rgba8([0.0, 1.0, 2.0], 0.5), [0, 255, 255, 128]);
        assert_eq!(to_rgba8([-1.0, 0.5, 1.0], 1.0), [0, 128, 255, 255]);
    }

    #[test]
    fn test_encode_heights_is_little_endian_row_major() {
        let grid = HeightGrid::from_values(2, vec![0.0, 1.5, -2.0, 4.25]).unwrap();
        let bytes = encode_heights(&grid);
        assert_eq!(bytes.len(), 16);
        let decoded: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(decoded, vec![0.0, 1.5, -2.0, 4.25]);
    }

    #[test]
    fn test_encode_flat_normals_points_up() {
        let normals = NormalGrid::new(4).unwrap();
        let bytes = encode_normals(&normals);
        assert_eq!(bytes.len(), 4 * 4 * 4);
        for px in bytes.chunks_exact(4) {
            assert_eq!(px, &[128, 255, 128, 255]);
        }
    }

    #[test]
    fn test_encode_preview_leaves_undisturbed_texels_clear() {
        let grid = HeightGrid::from_values(2, vec![0.0, 2.0, 0.0, 4.0]).unwrap();
        let bytes = encode_preview(&grid);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(bytes[7], 255);
        assert_eq!(&bytes[12..16], &to_rgba8(depth_color(1.0), 1.0));
        assert_eq!(&bytes[4..8], &to_rgba8(depth_color(0.5), 1.0));
    }

    #[test]
    fn test_images_match_field_resolution() {
        let grid = HeightGrid::new(16).unwrap();
        let heights = height_image(&grid);
        assert_eq!(heights.width(), 16);
        assert_eq!(heights.height(), 16);
        assert_eq!(heights.texture_descriptor.format, TextureFormat::R32Float);
        assert_eq!(heights.data.len(), 16 * 16 * 4);

        let preview = preview_image(&grid);
        assert_eq!(
            preview.texture_descriptor.format,
            TextureFormat::Rgba8UnormSrgb
        );
    }

    #[test]
    fn test_blank_image_is_single_texel() {
        let img = create_blank_image(TextureFormat::Rgba8Unorm, 4);
        assert_eq!(img.width(), 1);
        assert_eq!(img.data, vec![0u8; 4]);
    }

    #[test]
    fn test_quad_center_covers_texel_block() {
        // R = 16, d = 4: texel 0 at origin - 32, texel 15 at origin + 28.
        let origin = Vec2::new(100.0, -40.0);
        let d = 4.0;
        let center = quad_center(origin, d);
        let half = 16.0 * d * 0.5;
        let first_texel = origin - Vec2::splat(8.0 * d);
        let last_texel = origin + Vec2::splat(7.0 * d);
        assert_eq!(center - Vec2::splat(half), first_texel - Vec2::splat(0.5 * d));
        assert_eq!(center + Vec2::splat(half), last_texel + Vec2::splat(0.5 * d));
    }
}
