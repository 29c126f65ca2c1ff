//! End-to-end behavior of a healthy pipeline: startup, first capture,
//! accumulation, decay, normals and publication events.

use bevy::prelude::*;

use crate::config::DeformationConfig;
use crate::orchestrator::{FieldPhase, SkipReason};
use crate::test_harness::DeformationTestWorld;

const EPS: f32 = 1e-4;

fn walking_world() -> DeformationTestWorld {
    DeformationTestWorld::new()
        .with_anchor_at(Vec2::ZERO)
        .with_contact(Vec2::ZERO, 1.0, 1.0)
}

#[test]
fn test_field_initializes_on_startup() {
    let world = DeformationTestWorld::new();
    assert_eq!(world.phase(), FieldPhase::AwaitingFirstCapture);
    assert_eq!(world.field().resolution(), 16);
    assert!((world.field().post_delta() - 4.0).abs() < f32::EPSILON);
    assert!(world.app_exit().is_none());
}

#[test]
fn test_without_anchor_field_stays_inactive() {
    let mut world = DeformationTestWorld::new().with_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(5);
    assert_eq!(world.phase(), FieldPhase::AwaitingFirstCapture);
    assert_eq!(world.generation(), 0);
    assert_eq!(world.stats().last_skip, Some(SkipReason::Inactive));
    assert!(world.stats().frames_skipped >= 5);
    assert!(world.depth_at(Vec2::ZERO).is_none());
}

#[test]
fn test_first_frame_leaves_footprint_then_accumulates() {
    let mut world = walking_world();

    world.tick(1);
    assert_eq!(world.phase(), FieldPhase::Steady);
    assert_eq!(world.generation(), 1);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 1.0).abs() < EPS, "depth after the first update: {depth}");

    world.tick(1);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 2.0).abs() < EPS, "depth after two updates: {depth}");

    world.tick(3);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 5.0).abs() < EPS, "depth after five updates: {depth}");
    assert_eq!(world.stats().deformed_texels, 1);
}

#[test]
fn test_depth_saturates_at_cap() {
    let mut world = walking_world();
    world.tick(40);
    assert_eq!(world.max_depth(), 10.0);
    assert!((world.stats().max_depth - 10.0).abs() < f32::EPSILON);
}

#[test]
fn test_footprint_holds_after_contact_leaves() {
    let mut world = DeformationTestWorld::new().with_anchor_at(Vec2::ZERO);
    let foot = world.spawn_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(4);
    world.despawn(foot);
    let before = world.depth_at(Vec2::ZERO).unwrap();
    world.tick(10);
    assert_eq!(world.depth_at(Vec2::ZERO), Some(before));
}

#[test]
fn test_decay_erases_footprint() {
    let mut world = DeformationTestWorld::new().with_anchor_at(Vec2::ZERO);
    world.configure(|c| c.decay_rate = 20.0);
    let foot = world.spawn_contact(Vec2::ZERO, 1.0, 1.0);
    world.tick(6);
    assert!(world.depth_at(Vec2::ZERO).unwrap() > 5.0);

    world.despawn(foot);
    world.tick(1);
    let depth = world.depth_at(Vec2::ZERO).unwrap();
    assert!((depth - 4.0).abs() < EPS, "one decay step from 6.0: {depth}");
    world.tick(5);
    assert_eq!(world.depth_at(Vec2::ZERO), Some(0.0));
}

#[test]
fn test_contacts_merge_into_one_field() {
    let mut world = walking_world()
        .with_contact(Vec2::new(8.0, 0.0), 1.0, 1.0)
        .with_contact(Vec2::new(-12.0, 20.0), 1.0, 1.0);
    world.tick(3);
    for p in [Vec2::ZERO, Vec2::new(8.0, 0.0), Vec2::new(-12.0, 20.0)] {
        let depth = world.depth_at(p).unwrap();
        assert!((depth - 3.0).abs() < EPS, "depth at {p}: {depth}");
    }
    assert_eq!(world.stats().deformed_texels, 3);
}

#[test]
fn test_normals_tilt_away_from_footprint_center() {
    let mut world = walking_world();
    world.tick(4);
    let field = world.field();
    let view = field.view().unwrap();
    let left = view.normal_at(7, 8);
    let right = view.normal_at(9, 8);
    assert!(left.x > 0.0, "left normal {left:?}");
    assert!(right.x < 0.0, "right normal {right:?}");
    assert_eq!(view.normal_at(0, 0), Vec3::Y);
}

#[test]
fn test_normals_skipped_when_disabled() {
    let mut world = walking_world();
    world.configure(|c| c.compute_normals = false);
    world.tick(4);
    let field = world.field();
    let view = field.view().unwrap();
    assert!(view.normals.values().iter().all(|&n| n == Vec3::Y));
}

#[test]
fn test_published_events_follow_generations() {
    let mut world = walking_world();
    world.tick(4);
    assert_eq!(world.published(), &[1, 2, 3, 4]);
    assert_eq!(world.stats().updates_applied, 4);
    assert_eq!(world.stats().generation, 4);
}

#[test]
fn test_invalid_config_requests_exit() {
    let mut world = DeformationTestWorld::with_config(DeformationConfig {
        resolution: 12,
        ..DeformationTestWorld::test_config()
    })
    .with_anchor_at(Vec2::ZERO);
    assert!(world.app_exit().is_some());
    assert_eq!(world.phase(), FieldPhase::Uninitialized);
    world.tick(2);
    assert_eq!(world.generation(), 0);
    assert!(world.published().is_empty());
}
