//! Startup configuration for [`crate::TerrainShadingPlugin`].

use std::path::PathBuf;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::{params::ParameterSet, resolver::MeshSelector, tile::GrassTileConfig};

/// Where texture mode gets its tile image from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TileSource {
    /// An image file, resolved by the asset server (e.g. `"textures/grass.jpg"`).
    File(String),
    /// Generate a seamless tile in the background.
    Procedural(GrassTileConfig),
}

impl Default for TileSource {
    fn default() -> Self {
        TileSource::Procedural(GrassTileConfig::default())
    }
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// glTF file holding the terrain; scene 0 is spawned.
    pub scene_path: String,
    /// Identifies the mesh to shade.
    pub mesh: MeshSelector,
    pub tile: TileSource,
    /// Parameters at startup, including the initial mode.
    pub initial: ParameterSet,
    /// When set, parameters are restored from and saved to this JSON file.
    pub persist_path: Option<PathBuf>,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            scene_path: "models/terrain.gltf".into(),
            mesh: MeshSelector::default(),
            tile: TileSource::default(),
            initial: ParameterSet::default(),
            persist_path: None,
        }
    }
}

impl ShadingConfig {
    /// Parse a JSON config. Missing fields take their defaults and numeric
    /// parameters are clamped into range.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.initial.sanitize();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Pattern;

    #[test]
    fn partial_json_fills_defaults() {
        let config = ShadingConfig::from_json_str(
            r#"{
                "scene_path": "models/level.gltf",
                "mesh": { "Name": "Meadow" },
                "initial": { "active_pattern": "Grid", "texture_repeat": 4 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.scene_path, "models/level.gltf");
        assert_eq!(config.mesh, MeshSelector::Name("Meadow".into()));
        assert_eq!(config.initial.active_pattern, Pattern::Grid);
        // Clamped up to the lower bound.
        assert_eq!(config.initial.texture_repeat, 25.0);
        assert_eq!(config.tile, TileSource::default());
        assert_eq!(config.persist_path, None);
    }

    #[test]
    fn child_path_selector_parses() {
        let config = ShadingConfig::from_json_str(r#"{ "mesh": { "ChildPath": [0, 14] } }"#).unwrap();
        assert_eq!(config.mesh, MeshSelector::ChildPath(vec![0, 14]));
    }
}
