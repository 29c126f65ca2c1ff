//! Persistent deformation height-field that follows a moving anchor.
//!
//! Footprints and compaction are captured around the anchor every qualifying
//! frame, merged into a double-buffered field with an exponential temporal
//! filter and an accumulation model, and kept world-aligned by re-centering
//! the field in whole texels as the anchor travels.

use bevy::prelude::*;

pub mod anchor;
pub mod capture;
pub mod config;
pub mod error;
pub mod field;
pub mod kernel;
pub mod orchestrator;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use anchor::{DeformationAnchor, RecenterController, UpdateDecision};
pub use capture::{CaptureBackend, DeformationContact, SnapshotSource};
pub use config::{CaptureMode, DeformationConfig};
pub use error::DeformationError;
pub use orchestrator::{
    DeformationField, DeformationStats, FieldPhase, FieldPublished, FieldView, ResetDeformation,
};

/// Ordering of the per-frame deformation systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeformationSet {
    /// Sample the anchor and advance the elapsed time.
    Track,
    /// Resets, capture scheduling, kernel and publication.
    Update,
}

pub struct DeformationPlugin;

impl Plugin for DeformationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DeformationConfig>()
            .init_resource::<CaptureBackend>()
            .init_resource::<DeformationField>()
            .init_resource::<RecenterController>()
            .init_resource::<orchestrator::UpdateInFlight>()
            .init_resource::<DeformationStats>()
            .add_event::<ResetDeformation>()
            .add_event::<FieldPublished>()
            .configure_sets(
                Update,
                (DeformationSet::Track, DeformationSet::Update)
                    .chain()
                    .run_if(orchestrator::field_initialized),
            )
            .add_systems(Startup, orchestrator::init_deformation_field)
            .add_systems(
                Update,
                orchestrator::track_anchor.in_set(DeformationSet::Track),
            )
            .add_systems(
                Update,
                (
                    orchestrator::handle_reset_requests,
                    orchestrator::schedule_capture,
                    orchestrator::collect_capture,
                )
                    .chain()
                    .in_set(DeformationSet::Update),
            )
            .add_systems(Last, orchestrator::release_field_on_exit);
    }
}
