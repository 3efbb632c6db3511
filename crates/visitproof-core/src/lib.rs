//! Visitproof Core: mission data model, geodesic gate and error model
//!
//! Leaf crate shared by the vision collaborators, the fusion policy, the
//! mission registry and the verification engine.

pub mod context;
pub mod data_model;
pub mod error;
pub mod fingerprint;
pub mod geo;
pub mod telemetry;

pub use context::SubmissionContext;
pub use data_model::{
    normalize_label, validate_radius, ImageFusion, MissionId, MissionKind, MissionRecord, MissionState,
    RejectionReason, VerificationEvidence, VerificationOutcome, DEFAULT_RADIUS_METERS,
};
pub use error::{VerifyError, VerifyResult};
pub use fingerprint::PerceptualHash;
pub use geo::{Coordinate, Ellipsoid, GeoCheck, GeoValidator};

/// Engine version stamped into logs
pub const VISITPROOF_VERSION: &str = "1.0.0";
