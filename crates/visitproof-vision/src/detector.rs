//! ObjectDetector contract and the presence rule applied to its output.
use crate::error::VisionError;
use crate::frame::ImageFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use visitproof_core::normalize_label;

/// Confidence a detection needs for its label to count as present.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Runs inference over one image.
///
/// Model loading and weights live outside this crate; implementations
/// must be safe for concurrent read-only inference.
pub trait ObjectDetector: Send + Sync {
    /// Model identifier (ex: "yolov8n")
    fn id(&self) -> &str;

    fn detect(&self, image: &ImageFrame) -> Result<DetectionResult, VisionError>;
}

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Model confidence in [0, 1]
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: BoundingBox::default(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }
}

/// Detections for a single image, in model order. Never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

/// Outcome of applying the presence rule to a required label set.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceCheck {
    /// Every label the model reported, regardless of confidence
    pub detected_labels: BTreeSet<String>,
    /// Required labels with no detection at or above the threshold
    pub missing: BTreeSet<String>,
    pub pass: bool,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn labels(&self) -> BTreeSet<String> {
        self.detections.iter().map(|d| normalize_label(&d.label)).collect()
    }

    /// Labels with at least one detection at `confidence >= threshold`.
    pub fn present_labels(&self, threshold: f32) -> BTreeSet<String> {
        self.detections
            .iter()
            .filter(|d| d.confidence >= threshold)
            .map(|d| normalize_label(&d.label))
            .collect()
    }

    /// Pass iff every required label is present; an empty requirement passes.
    pub fn check_presence(&self, required: &BTreeSet<String>, threshold: f32) -> PresenceCheck {
        let present = self.present_labels(threshold);
        let missing: BTreeSet<String> = required
            .iter()
            .map(|label| normalize_label(label))
            .filter(|label| !present.contains(label))
            .collect();

        PresenceCheck {
            detected_labels: self.labels(),
            pass: missing.is_empty(),
            missing,
        }
    }
}
