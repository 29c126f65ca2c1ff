//! Field state machine, published view, stats and events.

use bevy::prelude::*;

use crate::anchor::{AnchorState, Recentering};
use crate::capture::{CaptureRequest, PendingCapture, Snapshot};
use crate::config::DeformationConfig;
use crate::error::DeformationError;
use crate::field::{FieldPair, HeightGrid, NormalGrid};
use crate::kernel::{run_height_pass, run_normal_pass, UpdateParameters};

// =============================================================================
// Phase
// =============================================================================

/// Lifecycle of the field.
///
/// `Uninitialized → AwaitingFirstCapture → Steady → ResetRequested → Cleared → Steady`.
/// `Cleared` is handled exactly like `AwaitingFirstCapture`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FieldPhase {
    #[default]
    Uninitialized,
    AwaitingFirstCapture,
    Steady,
    ResetRequested,
    Cleared,
}

// =============================================================================
// Update plan
// =============================================================================

/// Everything needed to finish an update once its snapshot arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdatePlan {
    pub request: CaptureRequest,
    pub recentering: Recentering,
    /// Seconds since the last qualifying update.
    pub delta_time: f32,
    /// The field had no origin when this plan was made.
    pub first_capture: bool,
}

/// What `apply_update` did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First capture after initialization or a reset: the origin was set and
    /// the snapshot merged into the empty field without re-centering.
    Primed,
    /// Kernel ran and the buffers swapped roles.
    Applied,
    /// The anchor jumped past the window; the field was cleared and then
    /// updated from the new position.
    Restarted,
}

// =============================================================================
// DeformationField
// =============================================================================

/// Sole owner of the ping-pong buffers and the normal surface.
#[derive(Resource, Debug, Default)]
pub struct DeformationField {
    phase: FieldPhase,
    pair: Option<FieldPair>,
    normals: Option<NormalGrid>,
    anchor: Option<AnchorState>,
    post_delta: f32,
    capture_extent: f32,
    generation: u64,
    next_sequence: u64,
}

impl DeformationField {
    /// Allocate both buffers from `config` and wait for the first capture.
    pub fn initialize(&mut self, config: &DeformationConfig) -> Result<(), DeformationError> {
        if self.phase != FieldPhase::Uninitialized {
            return Err(self.invalid("initialize"));
        }
        config.validate()?;
        let pair = FieldPair::new(config.resolution)?;
        let normals = NormalGrid::new(config.resolution)?;
        self.pair = Some(pair);
        self.normals = Some(normals);
        self.anchor = None;
        self.post_delta = config.texel_world_size();
        self.capture_extent = config.capture_extent;
        self.phase = FieldPhase::AwaitingFirstCapture;
        Ok(())
    }

    pub fn phase(&self) -> FieldPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        self.phase != FieldPhase::Uninitialized
    }

    pub fn needs_first_capture(&self) -> bool {
        matches!(
            self.phase,
            FieldPhase::AwaitingFirstCapture | FieldPhase::Cleared
        )
    }

    pub fn resolution(&self) -> usize {
        self.pair.as_ref().map_or(0, FieldPair::resolution)
    }

    pub fn post_delta(&self) -> f32 {
        self.post_delta
    }

    /// Bumped on every publish (update or clear).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn anchor(&self) -> Option<&AnchorState> {
        self.anchor.as_ref()
    }

    /// Origin to recenter from, or `None` when the next capture is a first one.
    pub fn previous_origin(&self) -> Option<IVec2> {
        if self.needs_first_capture() {
            None
        } else {
            self.anchor.map(|a| a.origin_texel)
        }
    }

    pub fn buffer_pair(&self) -> Option<&FieldPair> {
        self.pair.as_ref()
    }

    /// Build the plan and capture request for an update about to be scheduled.
    pub fn begin_update(
        &mut self,
        recentering: Recentering,
        delta_time: f32,
    ) -> Result<UpdatePlan, DeformationError> {
        if !self.accepts_updates() {
            return Err(self.invalid("begin an update"));
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let first_capture = self.needs_first_capture();
        let recentering = if first_capture {
            Recentering {
                shift: IVec2::ZERO,
                discontinuous: false,
                ..recentering
            }
        } else {
            recentering
        };
        Ok(UpdatePlan {
            request: CaptureRequest {
                center: recentering.origin_texel.as_vec2() * self.post_delta,
                extent: self.capture_extent,
                resolution: self.resolution(),
                sequence,
            },
            recentering,
            delta_time,
            first_capture,
        })
    }

    /// Merge `snapshot` into the field, swap roles and publish.
    ///
    /// On error the published buffer is left exactly as it was.
    pub fn apply_update(
        &mut self,
        plan: UpdatePlan,
        snapshot: Snapshot,
        config: &DeformationConfig,
    ) -> Result<UpdateOutcome, DeformationError> {
        if !self.accepts_updates() {
            return Err(self.invalid("apply an update"));
        }
        // Tunables are re-read every update and may have been edited live.
        config.validate()?;
        if snapshot.sequence() != plan.request.sequence {
            return Err(DeformationError::CaptureUnavailable(format!(
                "snapshot {} does not answer request {}",
                snapshot.sequence(),
                plan.request.sequence
            )));
        }
        if plan.first_capture != self.needs_first_capture() {
            return Err(DeformationError::CaptureUnavailable(
                "update was planned before the field was reset".to_string(),
            ));
        }
        let post_delta = self.post_delta;
        let phase = self.phase;
        let (Some(pair), Some(normals)) = (self.pair.as_mut(), self.normals.as_mut()) else {
            return Err(DeformationError::InvalidPhase {
                operation: "apply an update",
                phase,
            });
        };
        if snapshot.resolution() != pair.resolution() {
            return Err(DeformationError::CaptureUnavailable(format!(
                "snapshot resolution {} does not match field resolution {}",
                snapshot.resolution(),
                pair.resolution()
            )));
        }

        let recentering = plan.recentering;
        let (offset, outcome) = if plan.first_capture {
            (Vec2::ZERO, UpdateOutcome::Primed)
        } else if recentering.discontinuous {
            pair.clear();
            (Vec2::ZERO, UpdateOutcome::Restarted)
        } else {
            (recentering.shift.as_vec2(), UpdateOutcome::Applied)
        };
        let params = UpdateParameters::from_config(config, plan.delta_time);
        let grid = snapshot.into_grid();
        let (current, next) = pair.read_write();
        run_height_pass(
            current,
            &grid,
            offset,
            &params,
            next,
            config.kernel_execution,
        )?;
        pair.swap_roles();
        if config.compute_normals {
            run_normal_pass(pair.current(), post_delta, normals, config.kernel_execution)?;
        } else {
            normals.clear();
        }

        self.anchor = Some(AnchorState {
            position: plan.request.center + recentering.sample_offset * post_delta,
            origin_texel: recentering.origin_texel,
            sample_offset: recentering.sample_offset,
            post_delta,
        });
        self.phase = FieldPhase::Steady;
        self.generation += 1;
        Ok(outcome)
    }

    /// Mark the field for clearing (level transition, teleport by script, ...).
    pub fn request_reset(&mut self) -> Result<(), DeformationError> {
        match self.phase {
            FieldPhase::Uninitialized => Err(self.invalid("request a reset")),
            _ => {
                self.phase = FieldPhase::ResetRequested;
                Ok(())
            }
        }
    }

    /// Zero both buffers and the normals. The next capture re-anchors the origin.
    pub fn clear(&mut self) -> Result<(), DeformationError> {
        if self.phase != FieldPhase::ResetRequested {
            return Err(self.invalid("clear"));
        }
        if let Some(pair) = self.pair.as_mut() {
            pair.clear();
        }
        if let Some(normals) = self.normals.as_mut() {
            normals.clear();
        }
        self.anchor = None;
        self.phase = FieldPhase::Cleared;
        self.generation += 1;
        Ok(())
    }

    /// Drop the buffers. The field can be initialized again afterwards.
    pub fn release(&mut self) {
        self.pair = None;
        self.normals = None;
        self.anchor = None;
        self.phase = FieldPhase::Uninitialized;
    }

    /// Read-only view of the published buffer, or `None` before the first
    /// capture. Borrowing the field for the view's lifetime means the buffer
    /// cannot be rewritten while it is being read.
    pub fn view(&self) -> Option<FieldView<'_>> {
        let pair = self.pair.as_ref()?;
        let normals = self.normals.as_ref()?;
        let anchor = self.anchor.as_ref()?;
        Some(FieldView {
            heights: pair.current(),
            normals,
            resolution: pair.resolution(),
            post_delta: self.post_delta,
            origin: anchor.origin_world(),
            sample_offset: anchor.sample_offset,
            generation: self.generation,
        })
    }

    fn accepts_updates(&self) -> bool {
        matches!(
            self.phase,
            FieldPhase::AwaitingFirstCapture | FieldPhase::Steady | FieldPhase::Cleared
        )
    }

    fn invalid(&self, operation: &'static str) -> DeformationError {
        DeformationError::InvalidPhase {
            operation,
            phase: self.phase,
        }
    }
}

// =============================================================================
// FieldView
// =============================================================================

/// What consumers (shading, gameplay queries) read.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub heights: &'a HeightGrid,
    pub normals: &'a NormalGrid,
    pub resolution: usize,
    /// World size of one texel.
    pub post_delta: f32,
    /// World XZ position of texel `(R/2, R/2)`.
    pub origin: Vec2,
    /// Anchor's sub-texel remainder, in texels.
    pub sample_offset: Vec2,
    pub generation: u64,
}

impl FieldView<'_> {
    /// Continuous texel coordinate of a world XZ position.
    pub fn world_to_texel(&self, world: Vec2) -> Vec2 {
        (world - self.origin) / self.post_delta + Vec2::splat((self.resolution / 2) as f32)
    }

    /// Bilinear depth at a world XZ position, `None` outside the field.
    pub fn sample_world(&self, world: Vec2) -> Option<f32> {
        let t = self.world_to_texel(world);
        let max = self.resolution as f32 - 0.5;
        if !(t.x >= -0.5 && t.y >= -0.5 && t.x <= max && t.y <= max) {
            return None;
        }
        Some(self.heights.sample_bilinear(t.x, t.y))
    }

    pub fn normal_at(&self, x: usize, y: usize) -> Vec3 {
        self.normals.get(x, y)
    }
}

// =============================================================================
// Pending update
// =============================================================================

/// The capture in flight and the plan waiting for it.
#[derive(Resource, Default)]
pub struct UpdateInFlight {
    pub plan: Option<UpdatePlan>,
    pub capture: PendingCapture,
}

impl UpdateInFlight {
    pub fn is_busy(&self) -> bool {
        self.plan.is_some() || self.capture.is_in_flight()
    }

    /// Abandon the pending update. Returns its elapsed time so it can be restored.
    pub fn cancel(&mut self) -> Option<f32> {
        self.capture.cancel();
        self.plan.take().map(|p| p.delta_time)
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Why a frame did not update the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Inactive,
    Throttled,
    CapturePending,
    CaptureFailed,
    CaptureTimedOut,
    /// A live config edit failed validation.
    InvalidConfig,
}

/// Running counters, read by the UI panel.
#[derive(Resource, Debug, Clone, Default)]
pub struct DeformationStats {
    pub updates_applied: u64,
    pub frames_skipped: u64,
    pub failed_captures: u64,
    pub timed_out_captures: u64,
    pub resets: u64,
    pub restarts: u64,
    pub last_skip: Option<SkipReason>,
    pub generation: u64,
    /// Deepest texel in the published buffer.
    pub max_depth: f32,
    /// Texels with any deformation.
    pub deformed_texels: u32,
}

impl DeformationStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        self.frames_skipped += 1;
        self.last_skip = Some(reason);
        match reason {
            SkipReason::CaptureFailed => self.failed_captures += 1,
            SkipReason::CaptureTimedOut => self.timed_out_captures += 1,
            _ => {}
        }
    }

    pub fn record_publish(&mut self, field: &DeformationField) {
        self.generation = field.generation();
        match field.view() {
            Some(view) => {
                self.max_depth = view.heights.max_value();
                self.deformed_texels = view.heights.deformed_texels();
            }
            None => {
                self.max_depth = 0.0;
                self.deformed_texels = 0;
            }
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Ask for the field to be cleared back to the neutral baseline.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ResetDeformation;

/// A new buffer was published.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPublished {
    pub generation: u64,
}
