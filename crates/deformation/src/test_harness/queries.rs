//! Read-only queries for `DeformationTestWorld`.

use bevy::prelude::*;

use crate::anchor::RecenterController;
use crate::orchestrator::{DeformationField, DeformationStats, FieldPhase};

use super::{DeformationTestWorld, PublishedLog};

impl DeformationTestWorld {
    pub fn field(&self) -> &DeformationField {
        self.app.world().resource::<DeformationField>()
    }

    pub fn stats(&self) -> &DeformationStats {
        self.app.world().resource::<DeformationStats>()
    }

    pub fn controller(&self) -> &RecenterController {
        self.app.world().resource::<RecenterController>()
    }

    pub fn phase(&self) -> FieldPhase {
        self.field().phase()
    }

    pub fn generation(&self) -> u64 {
        self.field().generation()
    }

    /// Published depth at a world XZ position; `None` outside the field or
    /// before the first capture.
    pub fn depth_at(&self, world: Vec2) -> Option<f32> {
        self.field().view()?.sample_world(world)
    }

    /// Deepest texel in the published buffer.
    pub fn max_depth(&self) -> f32 {
        self.field()
            .view()
            .map_or(0.0, |view| view.heights.max_value())
    }

    /// Generations announced through `FieldPublished`, in order.
    pub fn published(&self) -> &[u64] {
        &self.app.world().resource::<PublishedLog>().0
    }

    /// The exit requested by the app, if any (a fatal setup error sends one).
    pub fn app_exit(&self) -> Option<AppExit> {
        self.app.should_exit()
    }
}
