//! `bevy_terrain_shading` — texture or procedural-pattern shading for one
//! mesh of a glTF terrain.
//!
//! # Architecture
//! - [`params::ParameterSet`] holds every adjustable value; writes clamp and
//!   never rebind on their own.
//! - [`resolver::resolve`] finds the target mesh by name once the scene is
//!   spawned and measures its vertical [`resolver::MeshExtent`].
//! - [`controller::ShadingContext`] owns parameters, load state and viewport
//!   size, and turns requests into "rebind with this mode" decisions.
//! - [`binder`] builds a fresh [`StandardMaterial`] (tiled grass) or
//!   [`material::PatternMaterial`] (one of six patterns) and swaps it onto
//!   the mesh.
//!
//! Send [`ShadingRequest`] messages to drive it; enable the `egui` feature
//! for a ready-made control panel.

pub mod async_gen;
pub mod binder;
pub mod config;
pub mod controller;
pub mod error;
pub mod material;
pub mod noise;
pub mod params;
pub mod persist;
pub mod resolver;
pub mod systems;
pub mod tile;
#[cfg(feature = "egui")]
pub mod ui;

pub use binder::{ActiveShading, ShadingMode};
pub use config::{ShadingConfig, TileSource};
pub use controller::ShadingContext;
pub use error::ShadingError;
pub use params::{ParameterSet, Pattern};
pub use resolver::MeshSelector;
pub use systems::ShadingRequest;

use bevy::prelude::*;

/// Bevy plugin that loads the terrain and keeps its mesh shaded.
#[derive(Default)]
pub struct TerrainShadingPlugin {
    pub config: ShadingConfig,
}

impl TerrainShadingPlugin {
    pub fn new(config: ShadingConfig) -> Self {
        Self { config }
    }
}

impl Plugin for TerrainShadingPlugin {
    fn build(&self, app: &mut App) {
        let mut params = self.config.initial.clone();
        params.sanitize();
        if let Some(path) = &self.config.persist_path {
            match persist::restore(path, params.clone()) {
                Ok(restored) => params = restored,
                Err(e) => warn!("ignoring saved shading settings {}: {e}", path.display()),
            }
        }

        app.add_plugins(material::PatternMaterialPlugin)
            .insert_resource(self.config.clone())
            .insert_resource(ShadingContext::new(params))
            .init_resource::<async_gen::GrassTile>()
            .init_resource::<ActiveShading>()
            .init_resource::<systems::SettingsSave>()
            .add_message::<ShadingRequest>()
            .add_systems(
                Startup,
                (systems::spawn_terrain_scene, systems::start_grass_tile),
            )
            .add_systems(
                Update,
                (
                    systems::watch_scene_load,
                    systems::track_viewport,
                    async_gen::poll_tile_task,
                    systems::handle_shading_requests,
                    systems::flush_settings,
                )
                    .chain(),
            );
    }
}
