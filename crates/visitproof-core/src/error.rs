//! Unified Error Model
use crate::data_model::{MissionId, MissionState};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerifyError {
    #[error("GEO/invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("MISSION/not found: {0}")]
    MissionNotFound(MissionId),

    #[error("MISSION/already resolved: {id} is {state}")]
    MissionAlreadyResolved { id: MissionId, state: MissionState },

    #[error("MISSION/invalid: {0}")]
    InvalidMission(String),

    /// The submitted or reference photo cannot be processed as given.
    #[error("IMAGE/invalid: {0}")]
    InvalidImage(String),

    #[error("HASHER/unavailable: {0}")]
    HasherUnavailable(String),

    #[error("DETECTOR/unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("LOCK/concurrent modification: {0}")]
    ConcurrentModification(MissionId),

    #[error("CONFIG/{0}")]
    InvalidConfig(String),
}

impl VerifyError {
    /// Transient faults the caller may retry; verdicts and rejections are not among them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HasherUnavailable(_) | Self::DetectorUnavailable(_) | Self::ConcurrentModification(_)
        )
    }

    /// Stable machine-readable code, the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCoordinate { .. } => "GEO/INVALID_COORDINATE",
            Self::MissionNotFound(_) => "MISSION/NOT_FOUND",
            Self::MissionAlreadyResolved { .. } => "MISSION/ALREADY_RESOLVED",
            Self::InvalidMission(_) => "MISSION/INVALID",
            Self::InvalidImage(_) => "IMAGE/INVALID",
            Self::HasherUnavailable(_) => "HASHER/UNAVAILABLE",
            Self::DetectorUnavailable(_) => "DETECTOR/UNAVAILABLE",
            Self::ConcurrentModification(_) => "LOCK/CONCURRENT_MODIFICATION",
            Self::InvalidConfig(_) => "CONFIG/INVALID",
        }
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
