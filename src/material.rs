//! GPU side of the pattern shading: the material asset and its uniform block.
//!
//! All six patterns live in one WGSL program (`terrain_patterns.wgsl`). The
//! `pattern` field picks the branch at runtime, so switching patterns only
//! swaps uniform values and never needs a new pipeline.

use bevy::{
    asset::embedded_asset,
    math::{Vec2, Vec4},
    prelude::*,
    render::render_resource::{AsBindGroup, ShaderType},
    shader::ShaderRef,
};

/// Asset path of the embedded pattern shader.
pub const PATTERN_SHADER_PATH: &str = "embedded://bevy_terrain_shading/terrain_patterns.wgsl";

/// Registers [`PatternMaterial`] and embeds its shader.
pub struct PatternMaterialPlugin;

impl Plugin for PatternMaterialPlugin {
    fn build(&self, app: &mut App) {
        embedded_asset!(app, "terrain_patterns.wgsl");
        app.add_plugins(MaterialPlugin::<PatternMaterial>::default());
    }
}

/// Every input of the pattern program, laid out as one uniform buffer.
///
/// Inactive patterns still receive their stored values so no shader input is
/// ever left undefined.
#[derive(Clone, Copy, Debug, Default, PartialEq, ShaderType)]
pub struct PatternUniforms {
    /// Viewport size in physical pixels.
    pub resolution: Vec2,
    /// Lowest vertex height of the target mesh.
    pub extent_min: f32,
    /// Highest vertex height of the target mesh.
    pub extent_max: f32,
    /// Linear RGB in `xyz`, `w` unused.
    pub grass_color: Vec4,
    pub hill_color: Vec4,
    pub noise_color: Vec4,
    /// 1-based pattern discriminator.
    pub pattern: u32,
    pub height_threshold: f32,
    pub grass_normal_suppression: f32,
    pub hill_normal_suppression: f32,
    pub uv_zoom: f32,
    pub space_scale: f32,
    pub marble_scale: f32,
    pub turbulence_scale: f32,
    pub half_tone_scale: f32,
    pub half_tone_frequency: f32,
    pub half_tone_radius: f32,
    pub half_tone_rotation: f32,
    pub iq_noise_scale: f32,
    pub grid_scale: f32,
    pub simplex_scale: f32,
    pub _padding: f32,
}

/// Material that draws one of the six procedural patterns.
#[derive(Asset, AsBindGroup, TypePath, Debug, Clone, Default)]
pub struct PatternMaterial {
    #[uniform(0)]
    pub uniforms: PatternUniforms,
}

impl Material for PatternMaterial {
    fn fragment_shader() -> ShaderRef {
        PATTERN_SHADER_PATH.into()
    }
}
