//! 64-bit perceptual fingerprint and Hamming-distance comparison.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Perceptual fingerprint of an image. Compared by distance, never by equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub const BITS: u32 = u64::BITS;

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Hamming distance: number of differing bits.
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    pub fn is_similar(&self, other: &PerceptualHash, max_distance: u32) -> bool {
        self.distance(other) <= max_distance
    }

    /// Distance expressed as a percentage of matching bits (100 = identical).
    pub fn similarity_percent(&self, other: &PerceptualHash) -> f64 {
        let raw = 100.0 - (self.distance(other) as f64 / Self::BITS as f64 * 100.0);
        (raw * 100.0).round() / 100.0
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for PerceptualHash {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16).map(Self)
    }
}
