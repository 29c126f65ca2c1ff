use bevy::prelude::*;
use bevy::render::view::screenshot::{save_to_disk, Screenshot};
use bevy::window::PresentMode;

use deformation::DeformationPlugin;
use rendering::camera::OrbitCamera;

mod player;
mod settings;
mod walkers;

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Deformation Demo".to_string(),
            resolution: (1280.0, 720.0).into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }));

    let config_path = std::env::var(settings::CONFIG_ENV).ok();
    match settings::load_config(config_path.as_deref()) {
        Ok(config) => {
            if let Some(path) = &config_path {
                info!("Loaded deformation config from {path}");
            }
            app.insert_resource(config);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }

    app.add_plugins((DeformationPlugin, rendering::RenderingPlugin, ui::UiPlugin))
        .init_resource::<walkers::WalkerRng>()
        .add_systems(
            Startup,
            (setup_ground, player::spawn_player, walkers::spawn_walkers),
        )
        .add_systems(
            Update,
            (player::move_player, walkers::wander).before(deformation::DeformationSet::Track),
        );

    // Screenshot mode: walks the player for a while, saves a few views and exits
    if std::env::var("DEFORMATION_SCREENSHOTS").is_ok() {
        app.insert_resource(ScreenshotQueue {
            frame: 0,
            current: 0,
            presets: vec![
                ShotPreset { name: "01_close", yaw: 0.4, pitch: 55f32.to_radians(), distance: 30.0 },
                ShotPreset { name: "02_window", yaw: 0.0, pitch: 80f32.to_radians(), distance: 160.0 },
            ],
        });
        app.add_systems(Update, drive_screenshots);
    }

    app.run();
}

fn setup_ground(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(4000.0, 4000.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.92, 0.95),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::IDENTITY,
    ));
}

#[derive(Resource)]
struct ScreenshotQueue {
    frame: u32,
    current: usize,
    presets: Vec<ShotPreset>,
}

struct ShotPreset {
    name: &'static str,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

fn drive_screenshots(
    mut commands: Commands,
    mut queue: ResMut<ScreenshotQueue>,
    mut orbit: ResMut<OrbitCamera>,
    mut exit: EventWriter<AppExit>,
) {
    queue.frame += 1;

    // Let the walkers leave some tracks first
    if queue.frame < 300 {
        return;
    }

    let idx = queue.current;
    if idx >= queue.presets.len() {
        if queue.frame > 300 + queue.presets.len() as u32 * 12 + 20 {
            exit.send(AppExit::Success);
        }
        return;
    }

    let phase = (queue.frame - 300) % 12;

    if phase == 0 {
        let p = &queue.presets[idx];
        orbit.yaw = p.yaw;
        orbit.pitch = p.pitch;
        orbit.distance = p.distance;
    } else if phase == 6 {
        let name = queue.presets[idx].name;
        let path = format!("/tmp/deformation_{}.png", name);
        commands
            .spawn(Screenshot::primary_window())
            .observe(save_to_disk(path));
        queue.current += 1;
    }
}
