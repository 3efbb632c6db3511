//! Fusion rules: which image checks a mission needs and how they combine.
//!
//! Geo is always a mandatory gate in front of these rules; a plan only
//! describes the image-based part of a verdict.

use serde::{Deserialize, Serialize};
use visitproof_core::{ImageFusion, MissionKind, MissionRecord};

/// How `GENERAL_PLACE` missions with target objects are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneralPlacePolicy {
    SimilarityOnly,
    #[default]
    SimilarityAndDetection,
}

/// Image checks selected for one mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPlan {
    pub similarity: bool,
    pub detection: bool,
    pub fusion: ImageFusion,
}

impl CheckPlan {
    pub fn similarity_only() -> Self {
        Self {
            similarity: true,
            detection: false,
            fusion: ImageFusion::All,
        }
    }

    pub fn detection_only() -> Self {
        Self {
            similarity: false,
            detection: true,
            fusion: ImageFusion::All,
        }
    }

    pub fn both(fusion: ImageFusion) -> Self {
        Self {
            similarity: true,
            detection: true,
            fusion,
        }
    }

    /// Detection is the expensive check; skip it once similarity already decided.
    pub fn should_run_detection(&self, hash_pass: Option<bool>) -> bool {
        if !self.detection {
            return false;
        }
        if !self.similarity {
            return true;
        }
        match self.fusion {
            ImageFusion::All => hash_pass == Some(true),
            ImageFusion::Any => hash_pass != Some(true),
        }
    }

    /// Image verdict from the sub-check results; a check that did not run counts as not passed.
    pub fn fuse(&self, hash_pass: Option<bool>, detection_pass: Option<bool>) -> bool {
        let hash_ok = hash_pass == Some(true);
        let detection_ok = detection_pass == Some(true);
        match (self.similarity, self.detection) {
            (false, false) => true,
            (true, false) => hash_ok,
            (false, true) => detection_ok,
            (true, true) => match self.fusion {
                ImageFusion::All => hash_ok && detection_ok,
                ImageFusion::Any => hash_ok || detection_ok,
            },
        }
    }
}

/// Selects the check plan for a mission. Swappable so the combination rule
/// can change without touching the engine's control flow.
pub trait FusionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn plan(&self, mission: &MissionRecord) -> CheckPlan;
}

/// Default per-kind table.
///
/// | kind          | no target objects | with target objects                   |
/// |---------------|-------------------|---------------------------------------|
/// | landmark      | similarity        | similarity + detection                |
/// | food          | similarity        | detection                             |
/// | general_place | similarity        | similarity + detection (configurable) |
#[derive(Debug, Clone, Copy, Default)]
pub struct KindTablePolicy {
    pub general_place: GeneralPlacePolicy,
}

impl KindTablePolicy {
    pub fn new(general_place: GeneralPlacePolicy) -> Self {
        Self { general_place }
    }
}

impl FusionPolicy for KindTablePolicy {
    fn name(&self) -> &'static str {
        "kind_table.v1"
    }

    fn plan(&self, mission: &MissionRecord) -> CheckPlan {
        let has_targets = !mission.target_objects.is_empty();
        let fusion = mission.image_fusion;
        match mission.kind {
            MissionKind::Landmark if has_targets => CheckPlan::both(fusion),
            MissionKind::Landmark => CheckPlan::similarity_only(),
            MissionKind::Food if has_targets => CheckPlan::detection_only(),
            MissionKind::Food => CheckPlan::similarity_only(),
            MissionKind::GeneralPlace => match (has_targets, self.general_place) {
                (true, GeneralPlacePolicy::SimilarityAndDetection) => CheckPlan::both(fusion),
                _ => CheckPlan::similarity_only(),
            },
        }
    }
}
