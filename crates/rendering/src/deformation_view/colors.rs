//! Depth ramp for the preview texture.

/// Evenly spaced sRGB control points from undisturbed to fully compacted.
const DEPTH_RAMP: [[f32; 3]; 6] = [
    [0.94, 0.96, 0.98], // fresh
    [0.78, 0.86, 0.94],
    [0.55, 0.70, 0.88],
    [0.35, 0.50, 0.78],
    [0.22, 0.30, 0.62],
    [0.14, 0.14, 0.40], // packed
];

/// Sample the depth ramp at `t` (clamped to `[0, 1]`).
pub(crate) fn depth_color(t: f32) -> [f32; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let max_idx = (DEPTH_RAMP.len() - 1) as f32;
    let scaled = t * max_idx;
    let lo = (scaled as usize).min(DEPTH_RAMP.len() - 2);
    let frac = scaled - lo as f32;
    let a = DEPTH_RAMP[lo];
    let b = DEPTH_RAMP[lo + 1];
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}

/// Convert a 0..1 RGB triplet to RGBA8 with the given alpha.
pub(crate) fn to_rgba8(rgb: [f32; 3], alpha: f32) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(rgb[0]), q(rgb[1]), q(rgb[2]), q(alpha)]
}
