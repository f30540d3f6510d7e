//! Parameter store for the terrain shading subsystem.
//!
//! [`ParameterSet`] is plain data. Writing to it never rebinds a material;
//! whoever edits it must go through [`crate::controller::ShadingContext`] (or
//! send a [`crate::ShadingRequest`]) so the binder runs afterwards.
//!
//! Numeric fields are bounded. Out-of-range writes are clamped rather than
//! rejected, which is what a slider would do anyway.

use std::f32::consts::{FRAC_PI_2, PI};

use bevy::color::Color;
use serde::{Deserialize, Serialize};

use crate::error::ShadingError;

/// The six procedural patterns the shading program can draw.
///
/// Discriminants match the `pattern` uniform the shader branches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    #[default]
    Marble = 1,
    Turbulence = 2,
    HalfTone = 3,
    IqNoise = 4,
    Grid = 5,
    Simplex = 6,
}

impl Pattern {
    pub const ALL: [Pattern; 6] = [
        Pattern::Marble,
        Pattern::Turbulence,
        Pattern::HalfTone,
        Pattern::IqNoise,
        Pattern::Grid,
        Pattern::Simplex,
    ];

    /// Look up a pattern by its 1-based index.
    pub fn from_index(index: u8) -> Result<Self, ShadingError> {
        match index {
            1..=6 => Ok(Self::ALL[index as usize - 1]),
            _ => Err(ShadingError::InvalidSelection { value: index }),
        }
    }

    /// 1-based index, also the shader discriminator.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Pattern::Marble => "Marble",
            Pattern::Turbulence => "Turbulence",
            Pattern::HalfTone => "Half-tone",
            Pattern::IqNoise => "IQ noise",
            Pattern::Grid => "Grid",
            Pattern::Simplex => "Simplex",
        }
    }
}

impl TryFrom<u8> for Pattern {
    type Error = ShadingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

/// Legal range of a numeric parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
    /// Slider increment. Informational; writes are not snapped to it.
    pub step: f32,
}

impl Bounds {
    const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

/// Names every numeric field of [`ParameterSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericParam {
    TextureRepeat,
    HeightThreshold,
    GrassNormalSuppression,
    HillNormalSuppression,
    UvZoom,
    SpaceScale,
    MarbleScale,
    TurbulenceScale,
    HalfToneScale,
    HalfToneFrequency,
    HalfToneRadius,
    HalfToneRotation,
    IqNoiseScale,
    GridScale,
    SimplexScale,
}

const SCALE_BOUNDS: Bounds = Bounds::new(0.0, 15.0, 0.001);
const SUPPRESSION_BOUNDS: Bounds = Bounds::new(1.0, 4.0, 0.001);

impl NumericParam {
    pub const ALL: [NumericParam; 15] = [
        NumericParam::TextureRepeat,
        NumericParam::HeightThreshold,
        NumericParam::GrassNormalSuppression,
        NumericParam::HillNormalSuppression,
        NumericParam::UvZoom,
        NumericParam::SpaceScale,
        NumericParam::MarbleScale,
        NumericParam::TurbulenceScale,
        NumericParam::HalfToneScale,
        NumericParam::HalfToneFrequency,
        NumericParam::HalfToneRadius,
        NumericParam::HalfToneRotation,
        NumericParam::IqNoiseScale,
        NumericParam::GridScale,
        NumericParam::SimplexScale,
    ];

    /// Stable field name, used as the key in persisted settings.
    pub fn key(self) -> &'static str {
        match self {
            NumericParam::TextureRepeat => "texture_repeat",
            NumericParam::HeightThreshold => "height_threshold",
            NumericParam::GrassNormalSuppression => "grass_normal_suppression",
            NumericParam::HillNormalSuppression => "hill_normal_suppression",
            NumericParam::UvZoom => "uv_zoom",
            NumericParam::SpaceScale => "space_scale",
            NumericParam::MarbleScale => "marble_scale",
            NumericParam::TurbulenceScale => "turbulence_scale",
            NumericParam::HalfToneScale => "half_tone_scale",
            NumericParam::HalfToneFrequency => "half_tone_frequency",
            NumericParam::HalfToneRadius => "half_tone_radius",
            NumericParam::HalfToneRotation => "half_tone_rotation",
            NumericParam::IqNoiseScale => "iq_noise_scale",
            NumericParam::GridScale => "grid_scale",
            NumericParam::SimplexScale => "simplex_scale",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    pub fn bounds(self) -> Bounds {
        match self {
            NumericParam::TextureRepeat => Bounds::new(25.0, 320.0, 1.0),
            NumericParam::HeightThreshold => Bounds::new(0.8, 1.0, 0.0001),
            NumericParam::GrassNormalSuppression | NumericParam::HillNormalSuppression => {
                SUPPRESSION_BOUNDS
            }
            NumericParam::UvZoom | NumericParam::SpaceScale => Bounds::new(0.1, 50.0, 0.01),
            NumericParam::HalfToneFrequency => Bounds::new(1.0, 200.0, 0.5),
            NumericParam::HalfToneRadius => Bounds::new(0.05, 1.0, 0.001),
            NumericParam::HalfToneRotation => Bounds::new(0.0, FRAC_PI_2, 0.001),
            NumericParam::MarbleScale
            | NumericParam::TurbulenceScale
            | NumericParam::HalfToneScale
            | NumericParam::IqNoiseScale
            | NumericParam::GridScale
            | NumericParam::SimplexScale => SCALE_BOUNDS,
        }
    }

    /// The pattern that owns this field, if it is pattern-private.
    pub fn owner(self) -> Option<Pattern> {
        match self {
            NumericParam::MarbleScale => Some(Pattern::Marble),
            NumericParam::TurbulenceScale => Some(Pattern::Turbulence),
            NumericParam::HalfToneScale
            | NumericParam::HalfToneFrequency
            | NumericParam::HalfToneRadius
            | NumericParam::HalfToneRotation => Some(Pattern::HalfTone),
            NumericParam::IqNoiseScale => Some(Pattern::IqNoise),
            NumericParam::GridScale => Some(Pattern::Grid),
            NumericParam::SimplexScale => Some(Pattern::Simplex),
            _ => None,
        }
    }
}

/// Names the colour fields of [`ParameterSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorParam {
    Grass,
    Hill,
    Noise,
}

impl ColorParam {
    pub const ALL: [ColorParam; 3] = [ColorParam::Grass, ColorParam::Hill, ColorParam::Noise];

    pub fn key(self) -> &'static str {
        match self {
            ColorParam::Grass => "grass_color",
            ColorParam::Hill => "hill_color",
            ColorParam::Noise => "noise_color",
        }
    }
}

/// Private scale of a single-factor pattern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub scale: f32,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self { scale: 2.1 }
    }
}

/// Half-tone dots: scale plus dot grid frequency, dot radius and grid rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HalfToneParams {
    pub scale: f32,
    pub frequency: f32,
    pub radius: f32,
    /// Grid rotation in radians.
    pub rotation: f32,
}

impl Default for HalfToneParams {
    fn default() -> Self {
        Self {
            scale: 2.1,
            frequency: 40.0,
            radius: 0.45,
            rotation: PI / 12.0,
        }
    }
}

/// Every user-adjustable value of the shading subsystem.
///
/// Texture and pattern values live side by side; switching modes never
/// resets the other side, so toggling back restores what was there before.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSet {
    pub texture_enabled: bool,
    pub texture_repeat: f32,
    pub active_pattern: Pattern,
    pub height_threshold: f32,
    /// Linear RGB \[0, 1\].
    pub grass_color: [f32; 3],
    /// Linear RGB \[0, 1\].
    pub hill_color: [f32; 3],
    /// Linear RGB \[0, 1\]. Ink colour used by the noise patterns.
    pub noise_color: [f32; 3],
    pub grass_normal_suppression: f32,
    pub hill_normal_suppression: f32,
    /// Global UV scale applied before any pattern-private scale.
    pub uv_zoom: f32,
    /// World-space scale for the patterns sampled from position.
    pub space_scale: f32,
    pub marble: ScaleParams,
    pub turbulence: ScaleParams,
    pub half_tone: HalfToneParams,
    pub iq_noise: ScaleParams,
    pub grid: ScaleParams,
    pub simplex: ScaleParams,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            texture_enabled: false,
            texture_repeat: 200.0,
            active_pattern: Pattern::Marble,
            height_threshold: 0.85,
            grass_color: srgb_hex(0x0d9b12),
            hill_color: srgb_hex(0xf3c409),
            noise_color: srgb_hex(0x0000ff),
            grass_normal_suppression: 2.25,
            hill_normal_suppression: 1.5,
            uv_zoom: 10.0,
            space_scale: 10.0,
            marble: ScaleParams { scale: 2.75 },
            turbulence: ScaleParams::default(),
            half_tone: HalfToneParams::default(),
            iq_noise: ScaleParams::default(),
            grid: ScaleParams::default(),
            simplex: ScaleParams::default(),
        }
    }
}

impl ParameterSet {
    pub fn get(&self, param: NumericParam) -> f32 {
        match param {
            NumericParam::TextureRepeat => self.texture_repeat,
            NumericParam::HeightThreshold => self.height_threshold,
            NumericParam::GrassNormalSuppression => self.grass_normal_suppression,
            NumericParam::HillNormalSuppression => self.hill_normal_suppression,
            NumericParam::UvZoom => self.uv_zoom,
            NumericParam::SpaceScale => self.space_scale,
            NumericParam::MarbleScale => self.marble.scale,
            NumericParam::TurbulenceScale => self.turbulence.scale,
            NumericParam::HalfToneScale => self.half_tone.scale,
            NumericParam::HalfToneFrequency => self.half_tone.frequency,
            NumericParam::HalfToneRadius => self.half_tone.radius,
            NumericParam::HalfToneRotation => self.half_tone.rotation,
            NumericParam::IqNoiseScale => self.iq_noise.scale,
            NumericParam::GridScale => self.grid.scale,
            NumericParam::SimplexScale => self.simplex.scale,
        }
    }

    fn slot(&mut self, param: NumericParam) -> &mut f32 {
        match param {
            NumericParam::TextureRepeat => &mut self.texture_repeat,
            NumericParam::HeightThreshold => &mut self.height_threshold,
            NumericParam::GrassNormalSuppression => &mut self.grass_normal_suppression,
            NumericParam::HillNormalSuppression => &mut self.hill_normal_suppression,
            NumericParam::UvZoom => &mut self.uv_zoom,
            NumericParam::SpaceScale => &mut self.space_scale,
            NumericParam::MarbleScale => &mut self.marble.scale,
            NumericParam::TurbulenceScale => &mut self.turbulence.scale,
            NumericParam::HalfToneScale => &mut self.half_tone.scale,
            NumericParam::HalfToneFrequency => &mut self.half_tone.frequency,
            NumericParam::HalfToneRadius => &mut self.half_tone.radius,
            NumericParam::HalfToneRotation => &mut self.half_tone.rotation,
            NumericParam::IqNoiseScale => &mut self.iq_noise.scale,
            NumericParam::GridScale => &mut self.grid.scale,
            NumericParam::SimplexScale => &mut self.simplex.scale,
        }
    }

    /// Write `value`, clamped to the field's [`Bounds`], and return what was
    /// stored. NaN and infinities are ignored and the prior value returned.
    pub fn set(&mut self, param: NumericParam, value: f32) -> f32 {
        let slot = self.slot(param);
        if value.is_finite() {
            *slot = param.bounds().clamp(value);
        }
        *slot
    }

    pub fn color(&self, param: ColorParam) -> [f32; 3] {
        match param {
            ColorParam::Grass => self.grass_color,
            ColorParam::Hill => self.hill_color,
            ColorParam::Noise => self.noise_color,
        }
    }

    /// Write a linear RGB colour; each channel is clamped to \[0, 1\].
    /// Non-finite channels keep their prior value.
    pub fn set_color(&mut self, param: ColorParam, rgb: [f32; 3]) {
        let slot = match param {
            ColorParam::Grass => &mut self.grass_color,
            ColorParam::Hill => &mut self.hill_color,
            ColorParam::Noise => &mut self.noise_color,
        };
        for (stored, c) in slot.iter_mut().zip(rgb) {
            if c.is_finite() {
                *stored = c.clamp(0.0, 1.0);
            }
        }
    }

    /// Record a pattern by 1-based index. Out-of-range indices leave the
    /// current selection untouched.
    pub fn select_pattern(&mut self, index: u8) -> Result<Pattern, ShadingError> {
        let pattern = Pattern::from_index(index)?;
        self.active_pattern = pattern;
        Ok(pattern)
    }

    /// Clamp every numeric field into its bounds. Used after deserialising
    /// values that bypassed [`ParameterSet::set`].
    pub fn sanitize(&mut self) {
        let defaults = ParameterSet::default();
        for param in NumericParam::ALL {
            let value = self.get(param);
            self.set(param, if value.is_finite() { value } else { defaults.get(param) });
        }
        for param in ColorParam::ALL {
            let fallback = defaults.color(param);
            let mut rgb = self.color(param);
            for (c, d) in rgb.iter_mut().zip(fallback) {
                if !c.is_finite() {
                    *c = d;
                }
            }
            self.set_color(param, rgb);
        }
    }
}

/// Decode a `0xRRGGBB` sRGB colour into linear RGB.
pub fn srgb_hex(hex: u32) -> [f32; 3] {
    let [_, r, g, b] = hex.to_be_bytes();
    let linear = Color::srgb_u8(r, g, b).to_linear();
    [linear.red, linear.green, linear.blue]
}
