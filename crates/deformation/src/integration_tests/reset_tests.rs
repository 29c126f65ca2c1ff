//! `ResetDeformation` handling.

use bevy::prelude::*;

use crate::orchestrator::FieldPhase;
use crate::test_harness::DeformationTestWorld;

#[test]
fn test_reset_clears_and_recaptures_same_frame() {
    let mut world = DeformationTestWorld::new()
        .with_anchor_at(Vec2::ZERO)
        .with_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(5);
    assert!(world.max_depth() > 4.0);

    // The old footprint is gone; the standing contact is captured again at once.
    world.request_reset();
    world.tick(1);
    assert_eq!(world.phase(), FieldPhase::Steady);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 1.0).abs() < 1e-4, "depth {depth}");
    assert_eq!(world.stats().resets, 1);
    assert_eq!(world.stats().deformed_texels, 1);

    world.tick(1);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 2.0).abs() < 1e-4, "depth {depth}");
}

#[test]
fn test_reset_without_contacts_publishes_empty_field() {
    let mut world = DeformationTestWorld::new().with_anchor_at(Vec2::ZERO);
    let foot = world.spawn_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(3);
    world.despawn(foot);
    world.request_reset();
    world.tick(1);
    assert_eq!(world.phase(), FieldPhase::Steady);
    assert_eq!(world.max_depth(), 0.0);
    assert_eq!(world.depth_at(Vec2::ZERO), Some(0.0));
}

#[test]
fn test_reset_while_disabled_stays_cleared() {
    let mut world = DeformationTestWorld::new()
        .with_anchor_at(Vec2::ZERO)
        .with_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(3);
    world.configure(|c| c.enabled = false);
    let before = world.generation();

    world.request_reset();
    world.tick(2);
    assert_eq!(world.phase(), FieldPhase::Cleared);
    assert!(world.field().needs_first_capture());
    assert!(world.depth_at(Vec2::ZERO).is_none());
    assert_eq!(world.generation(), before + 1);
    assert_eq!(world.published().last(), Some(&(before + 1)));
    assert_eq!(world.stats().deformed_texels, 0);
}

#[test]
fn test_reset_reanchors_at_new_position() {
    let mut world = DeformationTestWorld::new()
        .with_anchor_at(Vec2::ZERO)
        .with_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(3);
    world.move_anchor(Vec2::new(200.0, 0.0));
    world.request_reset();
    world.tick(1);
    assert_eq!(world.stats().restarts, 0);
    assert_eq!(
        world.field().anchor().unwrap().origin_texel,
        IVec2::new(50, 0)
    );
}

#[test]
fn test_multiple_reset_events_clear_once() {
    let mut world = DeformationTestWorld::new().with_anchor_at(Vec2::ZERO);
    world.tick(2);
    world.request_reset();
    world.request_reset();
    world.tick(1);
    assert_eq!(world.stats().resets, 1);
}
