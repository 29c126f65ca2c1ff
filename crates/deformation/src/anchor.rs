//! Re-centering controller.
//!
//! Keeps the fixed-resolution field aligned with a moving anchor. The field
//! origin is tracked as a whole-texel coordinate so the anchor can travel
//! arbitrarily far without the origin losing precision; the sub-texel
//! remainder is published separately as `sample_offset`.

use bevy::prelude::*;

use crate::config::DeformationConfig;

/// Marks the entity the deformation field follows. Only the first anchor
/// found is used.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct DeformationAnchor;

/// Where the published field sits in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorState {
    /// Anchor position on the XZ plane at the time of the update.
    pub position: Vec2,
    /// Field center in whole texels (`world = texel * post_delta`).
    pub origin_texel: IVec2,
    /// Sub-texel remainder `pos / post_delta - origin_texel`, each axis in [-0.5, 0.5).
    pub sample_offset: Vec2,
    /// World size of one texel.
    pub post_delta: f32,
}

impl AnchorState {
    /// World-space XZ position of the field center.
    pub fn origin_world(&self) -> Vec2 {
        self.origin_texel.as_vec2() * self.post_delta
    }
}

/// Snap a world position to the nearest whole texel.
///
/// Returns the texel coordinate and the remainder in texel units.
pub fn snap_to_texel(position: Vec2, post_delta: f32) -> (IVec2, Vec2) {
    let scaled = position / post_delta;
    let snapped = (scaled + Vec2::splat(0.5)).floor();
    (snapped.as_ivec2(), scaled - snapped)
}

/// Result of aligning the field with a new anchor position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recentering {
    pub origin_texel: IVec2,
    /// Whole-texel displacement since the previous origin. The kernel reads
    /// old texel `(i + shift.x, j + shift.y)` for new texel `(i, j)`.
    pub shift: IVec2,
    pub sample_offset: Vec2,
    /// The old and new windows do not overlap at all.
    pub discontinuous: bool,
}

/// First activation: no previous origin, so no shift.
///
/// The sub-texel remainder is published from the very first update rather
/// than starting at zero, since the origin is already snapped to a texel.
pub fn first_anchor(position: Vec2, post_delta: f32) -> Recentering {
    let (origin_texel, sample_offset) = snap_to_texel(position, post_delta);
    Recentering {
        origin_texel,
        shift: IVec2::ZERO,
        sample_offset,
        discontinuous: false,
    }
}

/// Align with `position` given the previously anchored origin.
pub fn recenter(
    position: Vec2,
    previous_origin: IVec2,
    post_delta: f32,
    resolution: usize,
) -> Recentering {
    let (origin_texel, sample_offset) = snap_to_texel(position, post_delta);
    let shift = origin_texel.saturating_sub(previous_origin);
    let limit = resolution as u32;
    Recentering {
        origin_texel,
        shift,
        sample_offset,
        discontinuous: shift.x.unsigned_abs() >= limit || shift.y.unsigned_abs() >= limit,
    }
}

/// Per-frame scheduling outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    Run,
    /// Less than `min_update_interval` since the last qualifying update.
    Throttled,
    /// Runtime toggle is off; the field stays static.
    Disabled,
    /// No anchor entity exists.
    Inactive,
}

/// Tracks the anchor and the time since the last qualifying update.
#[derive(Resource, Debug, Default)]
pub struct RecenterController {
    position: Option<Vec2>,
    time_since_update: f32,
    last_decision: Option<UpdateDecision>,
}

impl RecenterController {
    /// Record this frame's anchor position (`None` when no anchor exists)
    /// and advance the elapsed time. Anomalous frame times do not count.
    pub fn observe(&mut self, position: Option<Vec2>, delta_time: f32) {
        self.position = position.filter(|p| p.is_finite());
        if delta_time.is_finite() && delta_time > 0.0 {
            self.time_since_update += delta_time;
        }
    }

    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    pub fn time_since_update(&self) -> f32 {
        self.time_since_update
    }

    pub fn last_decision(&self) -> Option<UpdateDecision> {
        self.last_decision
    }

    /// Decide whether an update runs this frame.
    ///
    /// A pending first capture ignores the throttle. Time spent disabled or
    /// without an anchor is dropped so it cannot be replayed as one huge step.
    pub fn decide(
        &mut self,
        config: &DeformationConfig,
        needs_first_capture: bool,
    ) -> UpdateDecision {
        let decision = if !config.enabled {
            UpdateDecision::Disabled
        } else if self.position.is_none() {
            UpdateDecision::Inactive
        } else if needs_first_capture {
            UpdateDecision::Run
        } else if self.time_since_update < config.min_update_interval {
            UpdateDecision::Throttled
        } else {
            UpdateDecision::Run
        };
        if matches!(
            decision,
            UpdateDecision::Disabled | UpdateDecision::Inactive
        ) {
            self.discard_elapsed();
        }
        self.last_decision = Some(decision);
        decision
    }

    /// Alignment for the current position, or `None` without an anchor.
    pub fn recentering(
        &self,
        previous_origin: Option<IVec2>,
        post_delta: f32,
        resolution: usize,
    ) -> Option<Recentering> {
        let position = self.position?;
        Some(match previous_origin {
            None => first_anchor(position, post_delta),
            Some(origin) => recenter(position, origin, post_delta, resolution),
        })
    }

    /// Take the elapsed time for an update that is about to run.
    pub fn consume_elapsed(&mut self) -> f32 {
        std::mem::take(&mut self.time_since_update)
    }

    /// Give time back after an update was abandoned.
    pub fn restore_elapsed(&mut self, elapsed: f32) {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.time_since_update += elapsed;
        }
    }

    pub fn discard_elapsed(&mut self) {
        self.time_since_update = 0.0;
    }
}
