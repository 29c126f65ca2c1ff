//! Frame orchestrator.
//!
//! `DeformationField` owns the ping-pong buffers and walks them through
//! `Uninitialized → AwaitingFirstCapture → Steady → [ResetRequested → Cleared]`.
//! The systems in [`systems`] drive it once per frame: observe the anchor,
//! decide, capture, run the kernel, swap, publish.

pub mod systems;
mod tests;
pub mod types;

pub use systems::{
    collect_capture, field_initialized, handle_reset_requests, init_deformation_field,
    release_field_on_exit, schedule_capture, track_anchor,
};
pub use types::{
    DeformationField, DeformationStats, FieldPhase, FieldPublished, FieldView, ResetDeformation,
    SkipReason, UpdateInFlight, UpdateOutcome, UpdatePlan,
};
