//! Data Model: MissionRecord, VerificationEvidence, VerificationOutcome
use crate::error::{VerifyError, VerifyResult};
use crate::fingerprint::PerceptualHash;
use crate::geo::Coordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Radius applied when a mission does not override it.
pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

/// Opaque mission identifier, generated once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(String);

impl MissionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MissionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of verification target; selects the image-based checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Food,
    Landmark,
    #[serde(alias = "location")]
    GeneralPlace,
}

impl fmt::Display for MissionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MissionKind::Food => write!(f, "food"),
            MissionKind::Landmark => write!(f, "landmark"),
            MissionKind::GeneralPlace => write!(f, "general_place"),
        }
    }
}

impl std::str::FromStr for MissionKind {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "food" => Ok(MissionKind::Food),
            "landmark" => Ok(MissionKind::Landmark),
            "general_place" | "location" => Ok(MissionKind::GeneralPlace),
            other => Err(VerifyError::InvalidMission(format!("unknown mission kind '{}'", other))),
        }
    }
}

/// Lifecycle of a mission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionState {
    Created,
    Verified,
    Failed,
}

impl MissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionState::Verified | MissionState::Failed)
    }

    pub fn from_verdict(verdict: bool) -> Self {
        if verdict {
            MissionState::Verified
        } else {
            MissionState::Failed
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MissionState::Created => write!(f, "CREATED"),
            MissionState::Verified => write!(f, "VERIFIED"),
            MissionState::Failed => write!(f, "FAILED"),
        }
    }
}

/// How the image sub-checks of one mission combine. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFusion {
    /// Every selected image check must pass.
    #[default]
    All,
    /// Any selected image check passing is enough.
    Any,
}

/// Canonical form used when comparing object labels.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Mission radii must be finite and strictly positive.
pub fn validate_radius(radius_meters: f64) -> VerifyResult<()> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(VerifyError::InvalidMission(format!(
            "radius must be a positive number of meters, got {}",
            radius_meters
        )));
    }
    Ok(())
}

/// A stored mission. Identity and target attributes never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRecord {
    pub id: MissionId,
    pub kind: MissionKind,
    pub target: Coordinate,
    pub radius_meters: f64,
    pub reference_fingerprint: PerceptualHash,
    pub target_objects: BTreeSet<String>,
    #[serde(default)]
    pub image_fusion: ImageFusion,
    pub state: MissionState,
    /// Number of committed verification attempts
    #[serde(default)]
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_verification: Option<VerificationEvidence>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MissionRecord {
    /// Create a fresh record in `CREATED`.
    pub fn new(
        kind: MissionKind,
        target: Coordinate,
        radius_meters: f64,
        reference_fingerprint: PerceptualHash,
        target_objects: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> VerifyResult<Self> {
        validate_radius(radius_meters)?;

        let target_objects = target_objects
            .into_iter()
            .map(|label| normalize_label(label.as_ref()))
            .filter(|label| !label.is_empty())
            .collect();

        let now = Utc::now();
        Ok(Self {
            id: MissionId::generate(),
            kind,
            target,
            radius_meters,
            reference_fingerprint,
            target_objects,
            image_fusion: ImageFusion::default(),
            state: MissionState::Created,
            attempts: 0,
            last_verification: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_fusion(mut self, fusion: ImageFusion) -> Self {
        self.image_fusion = fusion;
        self
    }

    /// Apply a completed attempt. Callers hold the mission's lock.
    pub fn apply(&mut self, evidence: VerificationEvidence) {
        self.state = MissionState::from_verdict(evidence.final_verdict);
        self.attempts += 1;
        self.updated_at = evidence.timestamp;
        self.last_verification = Some(evidence);
    }
}

/// Measurements and verdict of one verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationEvidence {
    pub distance_meters: f64,
    /// Effective radius the distance was compared against
    pub radius_meters: f64,
    pub geo_pass: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_pass: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_labels: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_objects: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_pass: Option<bool>,

    pub final_verdict: bool,
    /// `blake3:<hex>` of the submitted pixels
    pub submission_digest: String,
    pub timestamp: DateTime<Utc>,
}

impl VerificationEvidence {
    /// Evidence with only the geo fields populated.
    pub fn geo(distance_meters: f64, radius_meters: f64, geo_pass: bool, submission_digest: String) -> Self {
        Self {
            distance_meters,
            radius_meters,
            geo_pass,
            hash_distance: None,
            similarity_percent: None,
            hash_pass: None,
            detected_labels: None,
            missing_objects: None,
            detection_pass: None,
            final_verdict: false,
            submission_digest,
            timestamp: Utc::now(),
        }
    }

    /// First failing check, in evaluation order. `None` for a passing verdict.
    pub fn rejection_reason(&self) -> Option<RejectionReason> {
        if self.final_verdict {
            return None;
        }
        if !self.geo_pass {
            return Some(RejectionReason::OutOfRange);
        }
        if self.hash_pass == Some(false) {
            return Some(RejectionReason::NotSimilar);
        }
        if self.detection_pass == Some(false) {
            return Some(RejectionReason::ObjectsMissing);
        }
        None
    }
}

/// Why a verdict came out `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    OutOfRange,
    NotSimilar,
    ObjectsMissing,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RejectionReason::OutOfRange => write!(f, "submission is outside the mission radius"),
            RejectionReason::NotSimilar => write!(f, "photo does not match the reference"),
            RejectionReason::ObjectsMissing => write!(f, "required objects were not found in the photo"),
        }
    }
}

/// What `verify` hands back: the committed state plus every measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub mission_id: MissionId,
    pub kind: MissionKind,
    pub state: MissionState,
    /// 1-based number of this attempt
    pub attempt: u32,
    pub evidence: VerificationEvidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionReason>,
    pub trace_id: String,
}

impl VerificationOutcome {
    pub fn final_verdict(&self) -> bool {
        self.evidence.final_verdict
    }
}
