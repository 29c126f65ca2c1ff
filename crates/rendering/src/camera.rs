use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use deformation::DeformationAnchor;

const ZOOM_SPEED: f32 = 0.15;
const MIN_DISTANCE: f32 = 10.0;
const MAX_DISTANCE: f32 = 2000.0;
const MIN_PITCH: f32 = 10.0 * std::f32::consts::PI / 180.0;
const MAX_PITCH: f32 = 85.0 * std::f32::consts::PI / 180.0;
const ORBIT_SENSITIVITY: f32 = 0.005;
const KEY_YAW_SPEED: f32 = 1.5;
/// Fraction of the remaining gap to the anchor closed per second.
const FOLLOW_RATE: f32 = 6.0;

/// Orbital camera model: camera orbits around a focus point that chases the anchor.
#[derive(Resource)]
pub struct OrbitCamera {
    /// Ground point the camera looks at
    pub focus: Vec3,
    /// Horizontal rotation in radians
    pub yaw: f32,
    /// Elevation angle in radians (clamped between MIN_PITCH and MAX_PITCH)
    pub pitch: f32,
    /// Distance from focus point
    pub distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            yaw: 0.0,
            pitch: 50.0_f32.to_radians(),
            distance: 160.0,
        }
    }
}

#[derive(Resource, Default)]
pub struct CameraOrbitDrag {
    pub dragging: bool,
    pub last_pos: Vec2,
}

pub fn setup_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    let (pos, look_at) = orbit_to_transform(&orbit);

    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(pos).looking_at(look_at, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(50.0, 120.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(orbit);
    commands.init_resource::<CameraOrbitDrag>();
}

pub(crate) fn orbit_to_transform(orbit: &OrbitCamera) -> (Vec3, Vec3) {
    // Spherical to cartesian offset from focus
    let x = orbit.distance * orbit.pitch.cos() * orbit.yaw.sin();
    let y = orbit.distance * orbit.pitch.sin();
    let z = orbit.distance * orbit.pitch.cos() * orbit.yaw.cos();
    let pos = orbit.focus + Vec3::new(x, y, z);
    (pos, orbit.focus)
}

/// Frame-rate independent approach of `current` toward `target`.
pub(crate) fn follow_step(current: Vec3, target: Vec3, dt: f32) -> Vec3 {
    let t = 1.0 - (-FOLLOW_RATE * dt.max(0.0)).exp();
    current.lerp(target, t)
}

pub(crate) fn zoomed_distance(distance: f32, scroll_lines: f32) -> f32 {
    (distance * (1.0 - scroll_lines * ZOOM_SPEED)).clamp(MIN_DISTANCE, MAX_DISTANCE)
}

/// System: keep the focus on the deformation anchor.
pub fn follow_anchor(
    time: Res<Time>,
    anchors: Query<&Transform, With<DeformationAnchor>>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let Some(anchor) = anchors.iter().next() else {
        return;
    };
    let target = Vec3::new(anchor.translation.x, 0.0, anchor.translation.z);
    if orbit.focus.distance_squared(target) > 1e-6 {
        orbit.focus = follow_step(orbit.focus, target, time.delta_secs());
    }
}

/// System: apply OrbitCamera state to the actual camera Transform each frame.
pub fn apply_orbit_camera(
    orbit: Res<OrbitCamera>,
    mut query: Query<&mut Transform, With<Camera3d>>,
) {
    if !orbit.is_changed() {
        return;
    }
    let (pos, look_at) = orbit_to_transform(&orbit);
    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };
    *transform = Transform::from_translation(pos).looking_at(look_at, Vec3::Y);
}

/// Q/E: rotate around the anchor.
pub fn camera_orbit_keys(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let mut dir = 0.0;
    if keys.pressed(KeyCode::KeyQ) {
        dir -= 1.0;
    }
    if keys.pressed(KeyCode::KeyE) {
        dir += 1.0;
    }
    if dir != 0.0 {
        orbit.yaw += dir * KEY_YAW_SPEED * time.delta_secs();
    }
}

/// Right-mouse drag: orbit (horizontal = yaw, vertical = pitch).
pub fn camera_orbit_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut drag: ResMut<CameraOrbitDrag>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Right) {
        if let Some(pos) = window.cursor_position() {
            drag.dragging = true;
            drag.last_pos = pos;
        }
    }

    if buttons.just_released(MouseButton::Right) {
        drag.dragging = false;
    }

    if drag.dragging {
        if let Some(pos) = window.cursor_position() {
            let delta = pos - drag.last_pos;
            orbit.yaw += delta.x * ORBIT_SENSITIVITY;
            orbit.pitch = (orbit.pitch - delta.y * ORBIT_SENSITIVITY).clamp(MIN_PITCH, MAX_PITCH);
            drag.last_pos = pos;
        }
    }
}

/// Scroll wheel: zoom (change distance).
pub fn camera_zoom(mut scroll_evts: EventReader<MouseWheel>, mut orbit: ResMut<OrbitCamera>) {
    for evt in scroll_evts.read() {
        let dy = match evt.unit {
            MouseScrollUnit::Line => evt.y,
            MouseScrollUnit::Pixel => evt.y / 100.0,
        };
        orbit.distance = zoomed_distance(orbit.distance, dy);
    }
}
