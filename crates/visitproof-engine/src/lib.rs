//! Visitproof Engine: mission verification decision engine
//!
//! # Pipeline Flow
//!
//! ```text
//! verify(id, coordinate, image)
//!   → registry snapshot ─→ re-attempt check ──────────────→ MissionAlreadyResolved
//!   → geo gate (Vincenty) ── fail ──────────────────────┐
//!   → FusionPolicy plan                                 │
//!       → similarity (ImageHasher, blocking pool)       │
//!       → detection  (ObjectDetector, blocking pool)    │
//!       → fuse                                          ↓
//!   → registry.commit (per-mission lock, all-or-nothing) → VerificationOutcome
//!   → attempt audit log
//! ```
//!
//! Measurements are taken outside any lock; only the final eligibility
//! check and state write run inside the mission's critical section. If the
//! caller drops the future before `commit`, nothing is written.

pub mod audit;
pub mod engine;

pub use audit::{AttemptEntry, AttemptEvent, AttemptLog, AttemptStats};
pub use engine::{NewMission, VerificationEngine};

pub use visitproof_core::{
    Coordinate, ImageFusion, MissionId, MissionKind, MissionRecord, MissionState, RejectionReason,
    SubmissionContext, VerificationEvidence, VerificationOutcome, VerifyError, VerifyResult,
};
pub use visitproof_policy::{EngineConfig, GeneralPlacePolicy, ReattemptPolicy};
pub use visitproof_registry::{InMemoryMissionRegistry, MissionRegistry};
pub use visitproof_vision::{
    DctHasher, Detection, DetectionResult, ImageFrame, ImageHasher, ObjectDetector, VisionError,
};
