//! Engine configuration
//!
//! Every option has a default, so an empty YAML document is a valid
//! configuration.

use crate::fusion::GeneralPlacePolicy;
use crate::reattempt::ReattemptPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use visitproof_core::{MissionKind, PerceptualHash, VerifyError, VerifyResult, DEFAULT_RADIUS_METERS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Radius for missions created without an explicit one
    pub default_radius_meters: f64,

    /// Tolerance added to every mission radius to absorb GPS error
    pub gps_noise_meters: f64,

    // === Similarity ===

    /// Maximum Hamming distance for two fingerprints to count as similar
    pub hash_max_distance: u32,

    /// Per-kind replacement for `hash_max_distance`
    pub hash_max_distance_overrides: BTreeMap<MissionKind, u32>,

    // === Detection ===

    /// Minimum confidence for a detection to count as present
    pub detection_confidence_threshold: f32,

    // === Lifecycle ===

    pub reattempt_policy: ReattemptPolicy,

    pub image_policy_for_general_place: GeneralPlacePolicy,

    /// Bounded wait for a mission lock before giving up
    pub lock_timeout_ms: u64,

    /// Entries kept by the attempt audit log
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: DEFAULT_RADIUS_METERS,
            gps_noise_meters: 0.0,
            hash_max_distance: 10,
            hash_max_distance_overrides: BTreeMap::new(),
            detection_confidence_threshold: 0.5,
            reattempt_policy: ReattemptPolicy::SingleAttempt,
            image_policy_for_general_place: GeneralPlacePolicy::SimilarityAndDetection,
            lock_timeout_ms: 2_000,
            audit_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> VerifyResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(yaml).map_err(|e| VerifyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VerifyResult<()> {
        if !self.default_radius_meters.is_finite() || self.default_radius_meters <= 0.0 {
            return Err(VerifyError::InvalidConfig(format!(
                "default_radius_meters must be positive, got {}",
                self.default_radius_meters
            )));
        }
        if !self.gps_noise_meters.is_finite() || self.gps_noise_meters < 0.0 {
            return Err(VerifyError::InvalidConfig(format!(
                "gps_noise_meters must be >= 0, got {}",
                self.gps_noise_meters
            )));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence_threshold) {
            return Err(VerifyError::InvalidConfig(format!(
                "detection_confidence_threshold must be within [0, 1], got {}",
                self.detection_confidence_threshold
            )));
        }
        let thresholds = std::iter::once(self.hash_max_distance)
            .chain(self.hash_max_distance_overrides.values().copied());
        for threshold in thresholds {
            if threshold > PerceptualHash::BITS {
                return Err(VerifyError::InvalidConfig(format!(
                    "hash distance threshold {} exceeds the {}-bit fingerprint",
                    threshold,
                    PerceptualHash::BITS
                )));
            }
        }
        if self.audit_capacity == 0 {
            return Err(VerifyError::InvalidConfig("audit_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn hash_max_distance_for(&self, kind: MissionKind) -> u32 {
        self.hash_max_distance_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.hash_max_distance)
    }

    /// Radius the geo gate actually compares against.
    pub fn effective_radius(&self, mission_radius: f64) -> f64 {
        mission_radius + self.gps_noise_meters
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn with_reattempt_policy(mut self, policy: ReattemptPolicy) -> Self {
        self.reattempt_policy = policy;
        self
    }

    pub fn with_hash_max_distance(mut self, max_distance: u32) -> Self {
        self.hash_max_distance = max_distance;
        self
    }

    pub fn with_detection_threshold(mut self, threshold: f32) -> Self {
        self.detection_confidence_threshold = threshold;
        self
    }

    pub fn with_general_place_policy(mut self, policy: GeneralPlacePolicy) -> Self {
        self.image_policy_for_general_place = policy;
        self
    }

    pub fn with_gps_noise(mut self, meters: f64) -> Self {
        self.gps_noise_meters = meters;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_radius_meters, 50.0);
        assert_eq!(config.hash_max_distance, 10);
        assert_eq!(config.detection_confidence_threshold, 0.5);
        assert_eq!(config.reattempt_policy, ReattemptPolicy::SingleAttempt);
        assert_eq!(
            config.image_policy_for_general_place,
            GeneralPlacePolicy::SimilarityAndDetection
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
default_radius_meters: 75.0
gps_noise_meters: 10.0
hash_max_distance: 8
hash_max_distance_overrides:
  food: 14
detection_confidence_threshold: 0.6
reattempt_policy: bounded_retries:2
image_policy_for_general_place: similarity_only
lock_timeout_ms: 500
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.default_radius_meters, 75.0);
        assert_eq!(config.effective_radius(50.0), 60.0);
        assert_eq!(config.hash_max_distance_for(MissionKind::Food), 14);
        assert_eq!(config.hash_max_distance_for(MissionKind::Landmark), 8);
        assert_eq!(config.reattempt_policy, ReattemptPolicy::BoundedRetries(2));
        assert_eq!(config.image_policy_for_general_place, GeneralPlacePolicy::SimilarityOnly);
        assert_eq!(config.lock_timeout(), Duration::from_millis(500));
        // untouched fields keep their defaults
        assert_eq!(config.audit_capacity, 10_000);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(EngineConfig::from_yaml("detection_confidence_threshold: 1.5").is_err());
        assert!(EngineConfig::from_yaml("hash_max_distance: 65").is_err());
        assert!(EngineConfig::from_yaml("default_radius_meters: 0").is_err());
        assert!(EngineConfig::from_yaml("reattempt_policy: forever").is_err());
        assert!(EngineConfig::from_yaml("gps_noise_meters: -1").is_err());
    }
}
