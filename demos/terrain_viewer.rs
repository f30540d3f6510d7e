//! `terrain_viewer` — loads a glTF terrain and shades its "Grass" mesh,
//! with an egui panel to switch between the tiled texture and the patterns.
//!
//! Run with:
//!   cargo run --example terrain_viewer --features egui -- [scene.gltf] [config.json]

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_terrain_shading::{ShadingConfig, TerrainShadingPlugin, ui::ShadingPanelPlugin};

fn load_config() -> ShadingConfig {
    let mut args = std::env::args().skip(1);
    let scene = args.next();
    let mut config = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| ShadingConfig::from_json_str(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(e) => {
                eprintln!("using default config, could not read {path}: {e}");
                ShadingConfig::default()
            }
        },
        None => ShadingConfig::default(),
    };
    if let Some(scene) = scene {
        config.scene_path = scene;
    }
    if config.persist_path.is_none() {
        config.persist_path = Some("terrain_shading.json".into());
    }
    config
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "bevy_terrain_shading — viewer".into(),
                resolution: (1280, 720).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_plugins(TerrainShadingPlugin::new(load_config()))
        .add_plugins(ShadingPanelPlugin)
        .add_systems(Startup, setup)
        .add_systems(Update, orbit_camera)
        .run();
}

#[derive(Component)]
struct Orbit {
    radius: f32,
    height: f32,
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 40.0, 120.0).looking_at(Vec3::ZERO, Vec3::Y),
        Orbit {
            radius: 120.0,
            height: 40.0,
        },
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(50.0, 100.0, 30.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Slow turntable so the shading can be judged from every side.
fn orbit_camera(time: Res<Time>, mut cameras: Query<(&mut Transform, &Orbit)>) {
    let angle = time.elapsed_secs() * 0.05;
    for (mut transform, orbit) in &mut cameras {
        *transform = Transform::from_xyz(
            orbit.radius * angle.sin(),
            orbit.height,
            orbit.radius * angle.cos(),
        )
        .looking_at(Vec3::ZERO, Vec3::Y);
    }
}
