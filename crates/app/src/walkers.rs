//! Wandering walkers that leave footprints around the player.

use bevy::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use deformation::DeformationContact;

use crate::player::Player;

const WALKER_COUNT: usize = 24;
const WALKER_SPEED: f32 = 1.5;
/// Walkers farther than this from the player turn back toward them.
const LEASH_RADIUS: f32 = 40.0;
const MAX_TURN_RATE: f32 = 1.2;
const WALKER_SEED: u64 = 0x5eed_f00d;

#[derive(Resource)]
pub struct WalkerRng(pub ChaCha8Rng);

impl Default for WalkerRng {
    fn default() -> Self {
        Self(ChaCha8Rng::seed_from_u64(WALKER_SEED))
    }
}

#[derive(Component, Debug, Clone)]
pub struct Walker {
    /// Heading angle on the XZ plane, radians from +X toward +Z.
    pub heading: f32,
    /// Current turn rate (rad/s), re-rolled periodically.
    pub turn: f32,
    /// Seconds until the next re-roll.
    pub retarget_in: f32,
}

pub fn spawn_walkers(
    mut commands: Commands,
    mut rng: ResMut<WalkerRng>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Capsule3d::new(0.25, 0.8));
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.45, 0.7),
        ..default()
    });
    for _ in 0..WALKER_COUNT {
        let pos = Vec2::new(
            rng.0.gen_range(-LEASH_RADIUS..LEASH_RADIUS),
            rng.0.gen_range(-LEASH_RADIUS..LEASH_RADIUS),
        );
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_xyz(pos.x, 0.65, pos.y),
            Walker {
                heading: rng.0.gen_range(0.0..std::f32::consts::TAU),
                turn: 0.0,
                retarget_in: 0.0,
            },
            DeformationContact {
                radius: 0.35,
                depth: 0.6,
            },
        ));
    }
}

/// Heading after steering back inside the leash, if needed.
pub(crate) fn leash_heading(position: Vec2, heading: f32, home: Vec2) -> f32 {
    let offset = home - position;
    if offset.length_squared() <= LEASH_RADIUS * LEASH_RADIUS {
        return heading;
    }
    offset.y.atan2(offset.x)
}

pub fn wander(
    time: Res<Time>,
    mut rng: ResMut<WalkerRng>,
    player: Query<&Transform, (With<Player>, Without<Walker>)>,
    mut walkers: Query<(&mut Transform, &mut Walker)>,
) {
    let dt = time.delta_secs();
    let home = player
        .get_single()
        .map(|t| Vec2::new(t.translation.x, t.translation.z))
        .unwrap_or(Vec2::ZERO);

    for (mut transform, mut walker) in &mut walkers {
        walker.retarget_in -= dt;
        if walker.retarget_in <= 0.0 {
            walker.turn = rng.0.gen_range(-MAX_TURN_RATE..MAX_TURN_RATE);
            walker.retarget_in = rng.0.gen_range(1.0..4.0);
        }
        let pos = Vec2::new(transform.translation.x, transform.translation.z);
        walker.heading = leash_heading(pos, walker.heading + walker.turn * dt, home);

        let dir = Vec2::from_angle(walker.heading);
        transform.translation.x += dir.x * WALKER_SPEED * dt;
        transform.translation.z += dir.y * WALKER_SPEED * dt;
    }
}
