//! ImageHasher contract and the DCT perceptual hasher.
//!
//! The DCT hash keeps only the lowest spatial frequencies of a small
//! downscaled copy of the image, so resizing, recompression and uniform
//! brightness shifts barely move it while structural changes do.

use crate::error::VisionError;
use crate::frame::ImageFrame;
use image::imageops::{self, FilterType};
use visitproof_core::PerceptualHash;

/// Produces a perceptual fingerprint for a decoded image.
///
/// Implementations may be CPU heavy; the engine calls them from a
/// blocking worker, never while holding a mission lock.
pub trait ImageHasher: Send + Sync {
    /// Stable identifier of the algorithm (ex: "phash.dct.v1")
    fn id(&self) -> &'static str;

    fn fingerprint(&self, image: &ImageFrame) -> Result<PerceptualHash, VisionError>;
}

/// Comparator side of the contract, kept free of any hashing backend.
pub fn distance(a: &PerceptualHash, b: &PerceptualHash) -> u32 {
    a.distance(b)
}

pub fn is_similar(a: &PerceptualHash, b: &PerceptualHash, max_distance: u32) -> bool {
    a.is_similar(b, max_distance)
}

const SAMPLE_SIZE: usize = 32;
const LOW_FREQ: usize = 8;

/// pHash: 32×32 triangle-filtered downscale, 2-D DCT-II, 8×8 low-frequency block
/// thresholded at its median.
#[derive(Debug, Clone)]
pub struct DctHasher {
    cosines: Vec<f64>,
}

impl DctHasher {
    pub fn new() -> Self {
        // cosines[k * N + n] = cos(pi / N * (n + 0.5) * k), only k < LOW_FREQ is needed
        let n = SAMPLE_SIZE as f64;
        let mut cosines = Vec::with_capacity(LOW_FREQ * SAMPLE_SIZE);
        for k in 0..LOW_FREQ {
            for i in 0..SAMPLE_SIZE {
                cosines.push((std::f64::consts::PI / n * (i as f64 + 0.5) * k as f64).cos());
            }
        }
        Self { cosines }
    }

    fn low_frequency_block(&self, samples: &[f64]) -> Vec<f64> {
        // rows first: rows[y][k] for k < LOW_FREQ
        let mut rows = vec![0.0; SAMPLE_SIZE * LOW_FREQ];
        for y in 0..SAMPLE_SIZE {
            let row = &samples[y * SAMPLE_SIZE..(y + 1) * SAMPLE_SIZE];
            for k in 0..LOW_FREQ {
                let basis = &self.cosines[k * SAMPLE_SIZE..(k + 1) * SAMPLE_SIZE];
                rows[y * LOW_FREQ + k] = row.iter().zip(basis).map(|(v, c)| v * c).sum();
            }
        }

        let mut block = vec![0.0; LOW_FREQ * LOW_FREQ];
        for ky in 0..LOW_FREQ {
            let basis = &self.cosines[ky * SAMPLE_SIZE..(ky + 1) * SAMPLE_SIZE];
            for kx in 0..LOW_FREQ {
                block[ky * LOW_FREQ + kx] = (0..SAMPLE_SIZE)
                    .map(|y| rows[y * LOW_FREQ + kx] * basis[y])
                    .sum();
            }
        }
        block
    }
}

impl Default for DctHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageHasher for DctHasher {
    fn id(&self) -> &'static str {
        "phash.dct.v1"
    }

    fn fingerprint(&self, image: &ImageFrame) -> Result<PerceptualHash, VisionError> {
        let small = imageops::resize(
            image.as_gray(),
            SAMPLE_SIZE as u32,
            SAMPLE_SIZE as u32,
            FilterType::Triangle,
        );
        let samples: Vec<f64> = small.as_raw().iter().map(|&p| p as f64).collect();
        let block = self.low_frequency_block(&samples);

        let mut sorted = block.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

        let bits = block
            .iter()
            .enumerate()
            .filter(|(_, coefficient)| **coefficient > median)
            .fold(0u64, |acc, (i, _)| acc | (1u64 << i));

        tracing::trace!(hasher = self.id(), hash = %PerceptualHash::from_bits(bits), "fingerprinted image");
        Ok(PerceptualHash::from_bits(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNS: u64 = 0xa5a5_a5a5_a5a5_a5a5;

    /// Renders the 8x8 low-frequency cosine basis at `size`×`size`, each
    /// component weighted +1 or -1 by the matching bit of `SIGNS`.
    fn scene(size: u32, offset: u8) -> ImageFrame {
        let scale = SAMPLE_SIZE as f64 / size as f64;
        let basis = |k: usize, p: u32| {
            (std::f64::consts::PI / SAMPLE_SIZE as f64 * (p as f64 + 0.5) * scale * k as f64).cos()
        };
        let pixels = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .map(|(x, y)| {
                let value: f64 = (1..LOW_FREQ * LOW_FREQ)
                    .map(|i| {
                        let sign = if SIGNS & (1 << i) != 0 { 1.0 } else { -1.0 };
                        sign * basis(i % LOW_FREQ, x) * basis(i / LOW_FREQ, y)
                    })
                    .sum();
                (128.0 + value).round() as u8 + offset
            })
            .collect();
        ImageFrame::from_luma(size, size, pixels).unwrap()
    }

    #[test]
    fn test_bits_follow_low_frequency_signs() {
        let hash = DctHasher::new().fingerprint(&scene(32, 0)).unwrap();
        assert_eq!(hash, PerceptualHash::from_bits(SIGNS));
    }

    #[test]
    fn test_deterministic() {
        let hasher = DctHasher::new();
        let image = scene(64, 0);
        let a = hasher.fingerprint(&image).unwrap();
        let b = hasher.fingerprint(&image).unwrap();
        assert_eq!(a, b);
        assert_eq!(distance(&a, &b), 0);
    }

    #[test]
    fn test_tolerates_brightness_shift() {
        let hasher = DctHasher::new();
        let base = hasher.fingerprint(&scene(64, 0)).unwrap();
        let brighter = hasher.fingerprint(&scene(64, 40)).unwrap();
        assert!(is_similar(&base, &brighter, 2), "distance {}", distance(&base, &brighter));
    }

    #[test]
    fn test_tolerates_resize() {
        let hasher = DctHasher::new();
        let base = hasher.fingerprint(&scene(32, 0)).unwrap();
        for size in [48, 64, 128] {
            let resized = hasher.fingerprint(&scene(size, 0)).unwrap();
            assert!(is_similar(&base, &resized, 2), "{}px: distance {}", size, distance(&base, &resized));
        }
    }

    #[test]
    fn test_detects_structural_change() {
        let hasher = DctHasher::new();
        let image = scene(64, 0);
        let inverted = ImageFrame::from_luma(
            64,
            64,
            image.pixels().iter().map(|p| 255 - p).collect(),
        )
        .unwrap();

        let a = hasher.fingerprint(&image).unwrap();
        let b = hasher.fingerprint(&inverted).unwrap();
        assert!(distance(&a, &b) >= 40, "distance {}", distance(&a, &b));
    }
}
