//! Seamless 2-D noise for the procedural grass tile.
//!
//! A tile repeated hundreds of times across the terrain shows every seam, so
//! UVs are lifted onto a 4-D torus before sampling:
//!
//!   (u, v) -> (cos 2πu, sin 2πu, cos 2πv, sin 2πv) · radius
//!
//! `u = 0` and `u = 1` land on the same point, likewise for `v`.

use std::f64::consts::TAU;

use noise::NoiseFn;

/// Samples a 4-D noise function on a torus so the result tiles in `u` and `v`.
pub struct TileableNoise<N> {
    source: N,
    /// Torus radius in noise space; larger means more features per tile.
    pub radius: f64,
}

impl<N: NoiseFn<f64, 4>> TileableNoise<N> {
    pub fn new(source: N, radius: f64) -> Self {
        Self { source, radius }
    }

    /// Raw sample in roughly `[-1, 1]` at normalised UV.
    pub fn sample(&self, u: f64, v: f64) -> f64 {
        let (su, cu) = (TAU * u).sin_cos();
        let (sv, cv) = (TAU * v).sin_cos();
        self.source.get([
            cu * self.radius,
            su * self.radius,
            cv * self.radius,
            sv * self.radius,
        ])
    }

    /// Sample remapped to `[0, 1]`.
    pub fn sample_unit(&self, u: f64, v: f64) -> f64 {
        (self.sample(u, v) * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use noise::{Fbm, Perlin};

    use super::*;

    #[test]
    fn opposite_edges_match() {
        let noise = TileableNoise::new(Fbm::<Perlin>::new(3), 2.5);
        for t in [0.0, 0.2, 0.45, 0.8] {
            assert!((noise.sample(0.0, t) - noise.sample(1.0, t)).abs() < 1e-9);
            assert!((noise.sample(t, 0.0) - noise.sample(t, 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn unit_samples_stay_in_range_and_vary() {
        let noise = TileableNoise::new(Perlin::new(9), 4.0);
        let samples: Vec<f64> = (0..32)
            .flat_map(|y| (0..32).map(move |x| (x as f64 / 32.0, y as f64 / 32.0)))
            .map(|(u, v)| noise.sample_unit(u, v))
            .collect();
        assert!(samples.iter().all(|s| (0.0..=1.0).contains(s)));
        let lo = samples.iter().cloned().fold(f64::MAX, f64::min);
        let hi = samples.iter().cloned().fold(f64::MIN, f64::max);
        assert!(hi - lo > 0.2, "tile noise is nearly flat ({lo}..{hi})");
    }
}
