//! Builds the material for the active mode and swaps it onto the mesh.
//!
//! Binding is split in two steps:
//! 1. [`describe`] turns the mode, parameters, mesh extent and viewport size
//!    into a [`MaterialSpec`]. It is pure, so equal inputs always give equal
//!    specs.
//! 2. [`create_material`] realises a spec as a fresh asset and [`attach`]
//!    puts it on every primitive of the target mesh, removing whichever
//!    material type was there before.
//!
//! Nothing is patched in place: every rebind creates a new asset and drops
//! the handle to the old one.

use bevy::{
    ecs::system::SystemParam,
    math::{Affine2, UVec2, Vec2, Vec4},
    prelude::*,
};

use crate::{
    controller::ShadingContext,
    material::{PatternMaterial, PatternUniforms},
    params::{ParameterSet, Pattern},
    resolver::MeshExtent,
};

/// Which material the mesh should carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    /// Tiled grass image on a lit standard material.
    Textured,
    /// Procedural pattern program with the given branch selected.
    Pattern(Pattern),
}

/// Everything needed to build a material, without creating it.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialSpec {
    Textured {
        /// Tile repetitions across the mesh UV range, both axes.
        repeat: f32,
        /// `None` while a procedural tile is still being generated.
        tile: Option<Handle<Image>>,
    },
    Pattern(PatternUniforms),
}

/// Flat colour shown in texture mode until the tile image exists.
const TILE_PENDING_COLOR: Color = Color::srgb(0.09, 0.45, 0.1);

/// Fill the pattern program's inputs.
///
/// Every pattern's private values are written, not only `pattern`'s.
pub fn pattern_uniforms(
    pattern: Pattern,
    params: &ParameterSet,
    extent: MeshExtent,
    resolution: UVec2,
) -> PatternUniforms {
    let rgb = |c: [f32; 3]| Vec4::new(c[0], c[1], c[2], 1.0);
    PatternUniforms {
        resolution: resolution.as_vec2(),
        extent_min: extent.min,
        extent_max: extent.max,
        grass_color: rgb(params.grass_color),
        hill_color: rgb(params.hill_color),
        noise_color: rgb(params.noise_color),
        pattern: pattern.index() as u32,
        height_threshold: params.height_threshold,
        grass_normal_suppression: params.grass_normal_suppression,
        hill_normal_suppression: params.hill_normal_suppression,
        uv_zoom: params.uv_zoom,
        space_scale: params.space_scale,
        marble_scale: params.marble.scale,
        turbulence_scale: params.turbulence.scale,
        half_tone_scale: params.half_tone.scale,
        half_tone_frequency: params.half_tone.frequency,
        half_tone_radius: params.half_tone.radius,
        half_tone_rotation: params.half_tone.rotation,
        iq_noise_scale: params.iq_noise.scale,
        grid_scale: params.grid.scale,
        simplex_scale: params.simplex.scale,
        _padding: 0.0,
    }
}

/// Describe the material for `mode`. Texture mode ignores `extent` and
/// `resolution`.
pub fn describe(
    mode: ShadingMode,
    params: &ParameterSet,
    extent: MeshExtent,
    resolution: UVec2,
    tile: Option<&Handle<Image>>,
) -> MaterialSpec {
    match mode {
        ShadingMode::Textured => MaterialSpec::Textured {
            repeat: params.texture_repeat,
            tile: tile.cloned(),
        },
        ShadingMode::Pattern(pattern) => {
            MaterialSpec::Pattern(pattern_uniforms(pattern, params, extent, resolution))
        }
    }
}

/// Handle to the material currently on the mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum BoundShading {
    Textured(Handle<StandardMaterial>),
    Pattern(Handle<PatternMaterial>),
}

impl BoundShading {
    pub fn mode_kind(&self) -> &'static str {
        match self {
            BoundShading::Textured(_) => "texture",
            BoundShading::Pattern(_) => "pattern",
        }
    }
}

/// The last binding made. Holding it here keeps exactly one strong handle
/// alongside the ones on the primitives.
#[derive(Resource, Default, Debug)]
pub struct ActiveShading(pub Option<BoundShading>);

/// Realise `spec` as a new material asset.
pub fn create_material(
    spec: &MaterialSpec,
    standard: &mut Assets<StandardMaterial>,
    patterns: &mut Assets<PatternMaterial>,
) -> BoundShading {
    match spec {
        MaterialSpec::Textured { repeat, tile } => {
            let base_color = if tile.is_some() {
                Color::WHITE
            } else {
                TILE_PENDING_COLOR
            };
            BoundShading::Textured(standard.add(StandardMaterial {
                base_color,
                base_color_texture: tile.clone(),
                uv_transform: Affine2::from_scale(Vec2::splat(*repeat)),
                perceptual_roughness: 0.9,
                ..default()
            }))
        }
        MaterialSpec::Pattern(uniforms) => BoundShading::Pattern(patterns.add(PatternMaterial {
            uniforms: *uniforms,
        })),
    }
}

/// Put `bound` on every primitive, detaching the other material type.
pub fn attach(commands: &mut Commands, primitives: &[Entity], bound: &BoundShading) {
    for &entity in primitives {
        let Ok(mut target) = commands.get_entity(entity) else {
            warn!("terrain primitive {entity} vanished before it could be shaded");
            continue;
        };
        match bound {
            BoundShading::Textured(handle) => {
                target
                    .remove::<MeshMaterial3d<PatternMaterial>>()
                    .insert(MeshMaterial3d(handle.clone()));
            }
            BoundShading::Pattern(handle) => {
                target
                    .remove::<MeshMaterial3d<StandardMaterial>>()
                    .insert(MeshMaterial3d(handle.clone()));
            }
        }
    }
}

/// System parameter bundling what a rebind touches.
///
/// Only code holding a `Binder` assigns the terrain material.
#[derive(SystemParam)]
pub struct Binder<'w, 's> {
    commands: Commands<'w, 's>,
    standard: ResMut<'w, Assets<StandardMaterial>>,
    patterns: ResMut<'w, Assets<PatternMaterial>>,
    active: ResMut<'w, ActiveShading>,
}

impl Binder<'_, '_> {
    /// Rebind the terrain for `mode`. Does nothing if the scene is not ready.
    pub fn apply(
        &mut self,
        mode: ShadingMode,
        context: &ShadingContext,
        tile: Option<&Handle<Image>>,
    ) {
        let Some(target) = context.target() else {
            return;
        };
        let spec = describe(
            mode,
            context.params(),
            target.extent,
            context.resolution(),
            tile,
        );
        let bound = create_material(&spec, &mut self.standard, &mut self.patterns);
        attach(&mut self.commands, target.primitives, &bound);
        let kind = bound.mode_kind();
        let previous = self.active.0.replace(bound);
        debug!(
            "rebound {} primitive(s) with a {kind} material ({mode:?}), replacing {}",
            target.primitives.len(),
            previous.as_ref().map_or("nothing", BoundShading::mode_kind)
        );
    }
}
