//! The keyboard-driven anchor: a walker the field follows.

use bevy::prelude::*;

use deformation::{DeformationAnchor, DeformationContact};
use rendering::camera::OrbitCamera;

const WALK_SPEED: f32 = 4.0;
const SPRINT_MULTIPLIER: f32 = 3.0;
/// How far `T` jumps the player, far enough to force a field restart.
const TELEPORT_DISTANCE: f32 = 5000.0;
const PLAYER_HEIGHT: f32 = 1.8;

#[derive(Component)]
pub struct Player;

pub fn spawn_player(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Capsule3d::new(0.35, PLAYER_HEIGHT - 0.7))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.85, 0.35, 0.25),
            ..default()
        })),
        Transform::from_xyz(0.0, PLAYER_HEIGHT * 0.5, 0.0),
        Player,
        DeformationAnchor,
        DeformationContact {
            radius: 0.5,
            depth: 1.0,
        },
    ));
}

/// Ground-plane direction for WASD input, relative to the camera yaw.
///
/// `input.y` is forward, `input.x` is right. The result is normalized or zero.
pub(crate) fn movement_direction(input: Vec2, yaw: f32) -> Vec2 {
    if input == Vec2::ZERO {
        return Vec2::ZERO;
    }
    let (s, c) = yaw.sin_cos();
    let forward = Vec2::new(-s, -c);
    let right = Vec2::new(c, -s);
    (forward * input.y + right * input.x).normalize_or_zero()
}

/// WASD to walk, Shift to sprint, T to teleport.
pub fn move_player(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    orbit: Res<OrbitCamera>,
    mut player: Query<&mut Transform, With<Player>>,
) {
    let Ok(mut transform) = player.get_single_mut() else {
        return;
    };

    if keys.just_pressed(KeyCode::KeyT) {
        transform.translation.x += TELEPORT_DISTANCE;
        info!("Teleported player to x = {:.0}", transform.translation.x);
        return;
    }

    let mut input = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        input.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        input.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }
    let dir = movement_direction(input, orbit.yaw);
    if dir == Vec2::ZERO {
        return;
    }

    let mut speed = WALK_SPEED;
    if keys.pressed(KeyCode::ShiftLeft) {
        speed *= SPRINT_MULTIPLIER;
    }
    let step = dir * speed * time.delta_secs();
    transform.translation.x += step.x;
    transform.translation.z += step.y;
    transform.look_to(Vec3::new(dir.x, 0.0, dir.y), Vec3::Y);
}
