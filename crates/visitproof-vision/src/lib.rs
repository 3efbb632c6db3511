//! Visitproof Vision: image-based collaborators of the verification engine
//!
//! Two capability interfaces, each with a single operation, keep model
//! lifecycle out of the engine:
//!
//! ```text
//! ImageFrame ─→ ImageHasher::fingerprint ─→ PerceptualHash ─→ distance / is_similar
//!            └→ ObjectDetector::detect   ─→ DetectionResult ─→ check_presence
//! ```
//!
//! `DctHasher` is the bundled hasher. No detector model ships here; the
//! host process plugs one in.

pub mod detector;
pub mod error;
pub mod frame;
pub mod hasher;

pub use detector::{
    BoundingBox, Detection, DetectionResult, ObjectDetector, PresenceCheck,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use error::VisionError;
pub use frame::ImageFrame;
pub use hasher::{distance, is_similar, DctHasher, ImageHasher};
