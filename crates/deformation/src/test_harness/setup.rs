//! Builder and mutation methods: anchors, contacts, config, resets.

use bevy::prelude::*;

use crate::anchor::DeformationAnchor;
use crate::capture::DeformationContact;
use crate::config::DeformationConfig;
use crate::orchestrator::ResetDeformation;

use super::DeformationTestWorld;

fn on_ground(position: Vec2) -> Transform {
    Transform::from_xyz(position.x, 0.0, position.y)
}

impl DeformationTestWorld {
    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    /// Spawn the anchor at world XZ `position`.
    pub fn with_anchor_at(mut self, position: Vec2) -> Self {
        self.spawn_anchor(position);
        self
    }

    /// Spawn a contact disc at world XZ `position`.
    pub fn with_contact(mut self, position: Vec2, radius: f32, depth: f32) -> Self {
        self.spawn_contact(position, radius, depth);
        self
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn spawn_anchor(&mut self, position: Vec2) -> Entity {
        let entity = self
            .app
            .world_mut()
            .spawn((DeformationAnchor, on_ground(position)))
            .id();
        self.anchor = Some(entity);
        entity
    }

    pub fn spawn_contact(&mut self, position: Vec2, radius: f32, depth: f32) -> Entity {
        self.app
            .world_mut()
            .spawn((DeformationContact { radius, depth }, on_ground(position)))
            .id()
    }

    /// Move the anchor spawned by this harness.
    pub fn move_anchor(&mut self, position: Vec2) {
        if let Some(entity) = self.anchor {
            self.move_entity(entity, position);
        }
    }

    pub fn move_entity(&mut self, entity: Entity, position: Vec2) {
        if let Some(mut transform) = self.app.world_mut().get_mut::<Transform>(entity) {
            *transform = on_ground(position);
        }
    }

    pub fn remove_anchor(&mut self) {
        if let Some(entity) = self.anchor.take() {
            self.app.world_mut().despawn(entity);
        }
    }

    pub fn despawn(&mut self, entity: Entity) {
        self.app.world_mut().despawn(entity);
    }

    /// Edit the live config.
    pub fn configure(&mut self, edit: impl FnOnce(&mut DeformationConfig)) {
        edit(&mut self.app.world_mut().resource_mut::<DeformationConfig>());
    }

    /// Queue a `ResetDeformation` event for the next frame.
    pub fn request_reset(&mut self) {
        self.app.world_mut().send_event(ResetDeformation);
    }
}
