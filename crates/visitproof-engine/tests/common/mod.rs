//! Deterministic collaborators and fixtures shared by the engine tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use visitproof_core::{Coordinate, PerceptualHash};
use visitproof_engine::{
    Detection, DetectionResult, EngineConfig, ImageFrame, ImageHasher, InMemoryMissionRegistry,
    MissionId, MissionRecord, MissionRegistry, ObjectDetector, ReattemptPolicy,
    VerificationEngine, VerificationEvidence, VerifyError, VerifyResult, VisionError,
};

pub const SEOUL: (f64, f64) = (37.5665, 126.9780);

/// Meters per degree of latitude near Seoul on WGS-84.
const METERS_PER_DEGREE_LAT: f64 = 110_988.0;

pub fn seoul() -> Coordinate {
    Coordinate::new(SEOUL.0, SEOUL.1).unwrap()
}

pub fn north_of_seoul(meters: f64) -> Coordinate {
    Coordinate::new(SEOUL.0 + meters / METERS_PER_DEGREE_LAT, SEOUL.1).unwrap()
}

/// 8x8 frame whose first eight pixels spell `bits` (little endian).
pub fn frame_with_bits(bits: u64) -> ImageFrame {
    let mut pixels = bits.to_le_bytes().to_vec();
    pixels.resize(64, 0);
    ImageFrame::from_luma(8, 8, pixels).unwrap()
}

/// Smooth scene whose 64 low-frequency DCT terms all carry weight,
/// rendered at `size`×`size`; what the real perceptual hasher expects.
pub fn cosine_scene(size: u32, offset: u8) -> ImageFrame {
    const SIGNS: u64 = 0xa5a5_a5a5_a5a5_a5a5;
    let scale = 32.0 / size as f64;
    let basis = |k: u64, p: u32| (std::f64::consts::PI / 32.0 * (p as f64 + 0.5) * scale * k as f64).cos();
    let pixels = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .map(|(x, y)| {
            let value: f64 = (1..64u64)
                .map(|i| {
                    let sign = if SIGNS & (1 << i) != 0 { 1.0 } else { -1.0 };
                    sign * basis(i % 8, x) * basis(i / 8, y)
                })
                .sum();
            (128.0 + value).round() as u8 + offset
        })
        .collect();
    ImageFrame::from_luma(size, size, pixels).unwrap()
}

/// Hash = first eight pixels, so tests choose Hamming distances directly.
#[derive(Default)]
pub struct PixelHasher {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl PixelHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ImageHasher for PixelHasher {
    fn id(&self) -> &'static str {
        "test.pixels"
    }

    fn fingerprint(&self, image: &ImageFrame) -> Result<PerceptualHash, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(VisionError::Backend("hasher offline".into()));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&image.pixels()[..8]);
        Ok(PerceptualHash::from_bits(u64::from_le_bytes(bytes)))
    }
}

/// Returns a scripted detection list; can be slowed down or made to fail.
#[derive(Default)]
pub struct ScriptedDetector {
    detections: Mutex<Vec<Detection>>,
    calls: AtomicUsize,
    error: Mutex<Option<VisionError>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedDetector {
    pub fn returning(detections: Vec<Detection>) -> Self {
        let detector = Self::default();
        detector.set_detections(detections);
        detector
    }

    pub fn set_detections(&self, detections: Vec<Detection>) {
        *self.detections.lock().unwrap() = detections;
    }

    pub fn set_failing(&self, failing: bool) {
        let error = failing.then(|| VisionError::Backend("model not loaded".into()));
        self.set_error(error);
    }

    pub fn set_error(&self, error: Option<VisionError>) {
        *self.error.lock().unwrap() = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for ScriptedDetector {
    fn id(&self) -> &str {
        "test.scripted"
    }

    fn detect(&self, _image: &ImageFrame) -> Result<DetectionResult, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(DetectionResult::new(self.detections.lock().unwrap().clone()))
    }
}

pub struct Harness {
    pub engine: Arc<VerificationEngine>,
    pub hasher: Arc<PixelHasher>,
    pub detector: Arc<ScriptedDetector>,
}

pub fn harness(config: EngineConfig) -> Harness {
    visitproof_core::telemetry::try_init();
    let hasher = Arc::new(PixelHasher::default());
    let detector = Arc::new(ScriptedDetector::default());
    let engine = VerificationEngine::new(config, hasher.clone(), detector.clone()).unwrap();
    Harness {
        engine: Arc::new(engine),
        hasher,
        detector,
    }
}

/// In-memory registry whose commits wait on a gate the test can hold,
/// giving up after `timeout` like a contended mission lock.
pub struct GatedRegistry {
    inner: InMemoryMissionRegistry,
    pub gate: tokio::sync::Mutex<()>,
    timeout: Duration,
}

impl GatedRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: InMemoryMissionRegistry::new(ReattemptPolicy::SingleAttempt, timeout),
            gate: tokio::sync::Mutex::new(()),
            timeout,
        }
    }
}

#[async_trait]
impl MissionRegistry for GatedRegistry {
    async fn insert(&self, record: MissionRecord) -> VerifyResult<MissionId> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: &MissionId) -> VerifyResult<MissionRecord> {
        self.inner.get(id).await
    }

    async fn commit(
        &self,
        id: &MissionId,
        expected_attempts: u32,
        evidence: VerificationEvidence,
    ) -> VerifyResult<MissionRecord> {
        let _gate = tokio::time::timeout(self.timeout, self.gate.lock())
            .await
            .map_err(|_| VerifyError::ConcurrentModification(id.clone()))?;
        self.inner.commit(id, expected_attempts, evidence).await
    }

    fn reattempt_policy(&self) -> ReattemptPolicy {
        self.inner.reattempt_policy()
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}
