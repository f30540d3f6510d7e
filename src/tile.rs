//! Procedural grass tile used by texture mode when no photo is configured.
//!
//! Two FBM layers are mixed: a broad one for patches of lush and dry grass,
//! and a fine one for blade-scale speckle. The result is uploaded with a
//! repeat sampler and an sRGB-correct mip chain, since the terrain repeats it
//! a few hundred times and would shimmer badly without mips.

use std::sync::OnceLock;

use bevy::{
    asset::RenderAssetUsages,
    image::{Image, ImageAddressMode, ImageFilterMode, ImageSampler, ImageSamplerDescriptor},
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
};
use noise::{Fbm, MultiFractal, Perlin};
use serde::{Deserialize, Serialize};

use crate::noise::TileableNoise;

/// Largest tile edge accepted by [`GrassTileConfig::generate`].
pub const MAX_TILE_SIZE: u32 = 2048;

/// Invalid tile dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    ZeroSize,
    TooLarge { size: u32, max: u32 },
}

impl std::fmt::Display for TileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileError::ZeroSize => write!(f, "grass tile size must be non-zero"),
            TileError::TooLarge { size, max } => {
                write!(f, "grass tile size {size} exceeds the {max} texel limit")
            }
        }
    }
}

impl std::error::Error for TileError {}

/// Appearance of the generated grass tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassTileConfig {
    pub seed: u32,
    /// Edge length in texels; the tile is square.
    pub size: u32,
    pub patch_scale: f64,
    pub patch_octaves: usize,
    pub blade_scale: f64,
    pub blade_octaves: usize,
    /// Weight of the blade layer against the patch layer, \[0, 1\].
    pub blade_weight: f64,
    /// Linear RGB \[0, 1\].
    pub color_lush: [f32; 3],
    /// Linear RGB \[0, 1\].
    pub color_dry: [f32; 3],
}

impl Default for GrassTileConfig {
    fn default() -> Self {
        Self {
            seed: 21,
            size: 256,
            patch_scale: 1.5,
            patch_octaves: 4,
            blade_scale: 12.0,
            blade_octaves: 3,
            blade_weight: 0.4,
            color_lush: [0.05, 0.30, 0.04],
            color_dry: [0.28, 0.36, 0.08],
        }
    }
}

/// Raw RGBA8 sRGB pixels of a square tile, row-major.
pub struct TilePixels {
    pub size: u32,
    pub rgba: Vec<u8>,
}

impl GrassTileConfig {
    /// Render the tile on the calling thread.
    pub fn generate(&self) -> Result<TilePixels, TileError> {
        let size = self.size;
        if size == 0 {
            return Err(TileError::ZeroSize);
        }
        if size > MAX_TILE_SIZE {
            return Err(TileError::TooLarge {
                size,
                max: MAX_TILE_SIZE,
            });
        }

        let patches = TileableNoise::new(
            Fbm::<Perlin>::new(self.seed).set_octaves(self.patch_octaves),
            self.patch_scale,
        );
        let blades = TileableNoise::new(
            Fbm::<Perlin>::new(self.seed.wrapping_add(7)).set_octaves(self.blade_octaves),
            self.blade_scale,
        );
        let weight = self.blade_weight.clamp(0.0, 1.0);

        let n = size as usize;
        let mut rgba = vec![0u8; n * n * 4];
        for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
            let u = (i % n) as f64 / n as f64;
            let v = (i / n) as f64 / n as f64;
            let t = patches.sample_unit(u, v) * (1.0 - weight) + blades.sample_unit(u, v) * weight;
            let t = t as f32;
            for c in 0..3 {
                let linear = self.color_lush[c] + (self.color_dry[c] - self.color_lush[c]) * t;
                px[c] = linear_to_srgb(linear);
            }
            px[3] = 255;
        }
        Ok(TilePixels { size, rgba })
    }
}

impl TilePixels {
    /// Build a repeat-addressed, mipmapped image ready for `Assets<Image>`.
    pub fn into_image(self) -> Image {
        // Image::new checks the buffer against the base level, so the mips
        // are appended afterwards.
        let mut image = Image::new(
            Extent3d {
                width: self.size,
                height: self.size,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            self.rgba,
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        );
        if let Some(base) = image.data.take() {
            let (data, mip_levels) = build_mips(base, self.size);
            image.data = Some(data);
            image.texture_descriptor.mip_level_count = mip_levels;
        }
        image.sampler = repeat_sampler();
        image
    }
}

/// Repeat on both axes with trilinear filtering.
pub fn repeat_sampler() -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        mag_filter: ImageFilterMode::Linear,
        min_filter: ImageFilterMode::Linear,
        mipmap_filter: ImageFilterMode::Linear,
        anisotropy_clamp: 16,
        ..Default::default()
    })
}

/// Append successive 2×2 box-filtered levels to a square sRGB base level.
///
/// Averaging happens in linear light; averaging the encoded bytes would darken
/// every level. Returns the buffer and the level count including the base.
fn build_mips(mut data: Vec<u8>, size: u32) -> (Vec<u8>, u32) {
    let mut levels = 1;
    let mut src_offset = 0usize;
    let mut src = size as usize;
    while src > 1 {
        let dst = src / 2;
        let dst_offset = data.len();
        data.resize(dst_offset + dst * dst * 4, 0);
        for y in 0..dst {
            for x in 0..dst {
                let texel = |dx: usize, dy: usize| src_offset + ((2 * y + dy) * src + 2 * x + dx) * 4;
                let quad = [texel(0, 0), texel(1, 0), texel(0, 1), texel(1, 1)];
                let out = dst_offset + (y * dst + x) * 4;
                for c in 0..3 {
                    let sum: f32 = quad.iter().map(|&i| srgb_to_linear(data[i + c])).sum();
                    data[out + c] = linear_to_srgb(sum * 0.25);
                }
                let alpha: u32 = quad.iter().map(|&i| data[i + 3] as u32).sum();
                data[out + 3] = (alpha / 4) as u8;
            }
        }
        src_offset = dst_offset;
        src = dst;
        levels += 1;
    }
    (data, levels)
}

fn srgb_to_linear(v: u8) -> f32 {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        std::array::from_fn(|i| {
            let c = i as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    })[v as usize]
}

fn linear_to_srgb(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sizes() {
        let zero = GrassTileConfig {
            size: 0,
            ..Default::default()
        };
        assert_eq!(zero.generate().err(), Some(TileError::ZeroSize));
        let huge = GrassTileConfig {
            size: MAX_TILE_SIZE + 1,
            ..Default::default()
        };
        assert!(matches!(huge.generate(), Err(TileError::TooLarge { .. })));
    }

    #[test]
    fn tile_is_opaque_and_green() {
        let tile = GrassTileConfig {
            size: 32,
            ..Default::default()
        }
        .generate()
        .unwrap();
        assert_eq!(tile.rgba.len(), 32 * 32 * 4);
        for px in tile.rgba.chunks_exact(4) {
            assert_eq!(px[3], 255);
            assert!(px[1] >= px[0] && px[1] >= px[2], "not green: {px:?}");
        }
    }

    #[test]
    fn mip_chain_reaches_one_texel() {
        let base = vec![128u8; 8 * 8 * 4];
        let (data, levels) = build_mips(base, 8);
        assert_eq!(levels, 4);
        assert_eq!(data.len(), (64 + 16 + 4 + 1) * 4);
        // A flat colour stays flat through every level.
        assert!(data.chunks_exact(4).all(|px| px[..3] == [128, 128, 128]));
    }

    #[test]
    fn image_uses_repeat_addressing() {
        let image = GrassTileConfig {
            size: 16,
            ..Default::default()
        }
        .generate()
        .unwrap()
        .into_image();
        assert_eq!(image.texture_descriptor.mip_level_count, 5);
        let ImageSampler::Descriptor(desc) = &image.sampler else {
            panic!("expected an explicit sampler");
        };
        assert!(matches!(desc.address_mode_u, ImageAddressMode::Repeat));
        assert!(matches!(desc.address_mode_v, ImageAddressMode::Repeat));
    }
}
