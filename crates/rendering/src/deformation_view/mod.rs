//! Deformation overlay: the published field drawn as a textured ground quad.
//!
//! Every `FieldPublished` event re-encodes the current buffer into three
//! images: raw depth (`R32Float`), packed normals (`Rgba8Unorm`) and a
//! color-ramped preview shown on a quad that tracks the field's origin.
//! Between publications the textures are left alone.

mod colors;
mod image_gen;
mod systems;
mod tests;
mod types;

pub use systems::DeformationViewPlugin;
pub use types::{DeformationOverlay, DeformationQuad, DeformationTextures};
