//! Verification Engine: geo gate, image checks, fusion, commit
use crate::audit::{AttemptEntry, AttemptLog, AttemptStats};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use visitproof_core::{
    validate_radius, Coordinate, GeoValidator, ImageFusion, MissionId, MissionKind, MissionRecord,
    PerceptualHash, SubmissionContext, VerificationEvidence, VerificationOutcome, VerifyError,
    VerifyResult,
};
use visitproof_policy::{EngineConfig, FusionPolicy, KindTablePolicy};
use visitproof_registry::{InMemoryMissionRegistry, MissionRegistry};
use visitproof_vision::{DetectionResult, ImageFrame, ImageHasher, ObjectDetector, VisionError};

/// Input of `create_mission`.
#[derive(Debug, Clone)]
pub struct NewMission {
    pub kind: MissionKind,
    pub target: Coordinate,
    /// Falls back to `EngineConfig::default_radius_meters`
    pub radius_meters: Option<f64>,
    pub reference_image: ImageFrame,
    pub target_objects: Vec<String>,
    pub image_fusion: ImageFusion,
}

impl NewMission {
    pub fn new(kind: MissionKind, target: Coordinate, reference_image: ImageFrame) -> Self {
        Self {
            kind,
            target,
            radius_meters: None,
            reference_image,
            target_objects: Vec::new(),
            image_fusion: ImageFusion::All,
        }
    }

    pub fn with_radius(mut self, meters: f64) -> Self {
        self.radius_meters = Some(meters);
        self
    }

    pub fn with_target_objects<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_objects = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fusion(mut self, fusion: ImageFusion) -> Self {
        self.image_fusion = fusion;
        self
    }
}

pub struct VerificationEngine<R: MissionRegistry = InMemoryMissionRegistry> {
    registry: Arc<R>,
    hasher: Arc<dyn ImageHasher>,
    detector: Arc<dyn ObjectDetector>,
    fusion: Arc<dyn FusionPolicy>,
    geo: GeoValidator,
    config: EngineConfig,
    audit: Mutex<AttemptLog>,
}

impl VerificationEngine<InMemoryMissionRegistry> {
    /// Engine with an isolated in-memory registry built from `config`.
    pub fn new(
        config: EngineConfig,
        hasher: Arc<dyn ImageHasher>,
        detector: Arc<dyn ObjectDetector>,
    ) -> VerifyResult<Self> {
        config.validate()?;
        let registry = Arc::new(InMemoryMissionRegistry::from_config(&config));
        Self::with_registry(config, registry, hasher, detector)
    }
}

impl<R: MissionRegistry> VerificationEngine<R> {
    pub fn with_registry(
        config: EngineConfig,
        registry: Arc<R>,
        hasher: Arc<dyn ImageHasher>,
        detector: Arc<dyn ObjectDetector>,
    ) -> VerifyResult<Self> {
        config.validate()?;
        let fusion = Arc::new(KindTablePolicy::new(config.image_policy_for_general_place));
        let audit = Mutex::new(AttemptLog::with_max_entries(config.audit_capacity));
        Ok(Self {
            registry,
            hasher,
            detector,
            fusion,
            geo: GeoValidator::default(),
            config,
            audit,
        })
    }

    /// Replace the per-kind check table.
    pub fn with_fusion_policy(mut self, policy: Arc<dyn FusionPolicy>) -> Self {
        self.fusion = policy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Register a mission. The reference image is fingerprinted once, here.
    #[tracing::instrument(name = "create_mission", skip(self, request), fields(kind = %request.kind))]
    pub async fn create_mission(&self, request: NewMission) -> VerifyResult<MissionId> {
        let radius = request.radius_meters.unwrap_or(self.config.default_radius_meters);
        validate_radius(radius)?;
        let reference = self.fingerprint(Arc::new(request.reference_image)).await?;

        let record = MissionRecord::new(request.kind, request.target, radius, reference, request.target_objects)?
            .with_fusion(request.image_fusion);
        let id = self.registry.insert(record).await?;

        tracing::info!(mission_id = %id, radius_meters = radius, reference = %reference, "mission created");
        Ok(id)
    }

    /// Current record, including the last attempt's evidence.
    pub async fn mission(&self, id: &MissionId) -> VerifyResult<MissionRecord> {
        self.registry.get(id).await
    }

    pub async fn verify_mission(
        &self,
        id: &MissionId,
        coordinate: Coordinate,
        image: ImageFrame,
    ) -> VerifyResult<VerificationOutcome> {
        self.verify_mission_with(&SubmissionContext::new(), id, coordinate, image)
            .await
    }

    #[tracing::instrument(
        name = "verify_mission",
        skip(self, ctx, coordinate, image),
        fields(mission_id = %id, trace_id = %ctx.trace_id)
    )]
    pub async fn verify_mission_with(
        &self,
        ctx: &SubmissionContext,
        id: &MissionId,
        coordinate: Coordinate,
        image: ImageFrame,
    ) -> VerifyResult<VerificationOutcome> {
        let result = self.run_attempt(ctx, id, coordinate, image).await;

        let entry = match &result {
            Ok(outcome) => {
                tracing::info!(
                    state = %outcome.state,
                    attempt = outcome.attempt,
                    distance_meters = outcome.evidence.distance_meters,
                    hash_distance = ?outcome.evidence.hash_distance,
                    rejection = ?outcome.rejection,
                    "verification committed"
                );
                AttemptEntry::from_outcome(outcome)
            }
            Err(error) if error.is_retryable() => {
                tracing::warn!(error = %error, "verification aborted without commit");
                AttemptEntry::from_error(id, &ctx.trace_id, error)
            }
            Err(error) => {
                tracing::info!(error = %error, "verification rejected");
                AttemptEntry::from_error(id, &ctx.trace_id, error)
            }
        };
        self.audit_log().log(entry.with_submitter(ctx.submitter.clone()));

        result
    }

    async fn run_attempt(
        &self,
        ctx: &SubmissionContext,
        id: &MissionId,
        coordinate: Coordinate,
        image: ImageFrame,
    ) -> VerifyResult<VerificationOutcome> {
        let mission = self.registry.get(id).await?;

        // Resolved missions are refused before any check runs.
        if !self.registry.reattempt_policy().permits(mission.state, mission.attempts) {
            return Err(VerifyError::MissionAlreadyResolved {
                id: id.clone(),
                state: mission.state,
            });
        }

        let digest = format!("blake3:{}", blake3::hash(image.pixels()));
        let radius = self.config.effective_radius(mission.radius_meters);
        let geo = self.geo.check(mission.target, coordinate, radius);
        let mut evidence = VerificationEvidence::geo(geo.distance_meters, radius, geo.pass, digest);

        if geo.pass {
            self.run_image_checks(&mission, Arc::new(image), &mut evidence).await?;
        } else {
            tracing::debug!(distance_meters = geo.distance_meters, radius_meters = radius, "geo gate failed");
        }
        evidence.timestamp = Utc::now();

        let committed = self.registry.commit(id, mission.attempts, evidence.clone()).await?;
        Ok(VerificationOutcome {
            mission_id: committed.id,
            kind: committed.kind,
            state: committed.state,
            attempt: committed.attempts,
            rejection: evidence.rejection_reason(),
            evidence,
            trace_id: ctx.trace_id.clone(),
        })
    }

    async fn run_image_checks(
        &self,
        mission: &MissionRecord,
        image: Arc<ImageFrame>,
        evidence: &mut VerificationEvidence,
    ) -> VerifyResult<()> {
        let plan = self.fusion.plan(mission);
        tracing::debug!(policy = self.fusion.name(), ?plan, "image check plan");

        if plan.similarity {
            let submitted = self.fingerprint(Arc::clone(&image)).await?;
            let distance = submitted.distance(&mission.reference_fingerprint);
            let max_distance = self.config.hash_max_distance_for(mission.kind);
            evidence.hash_distance = Some(distance);
            evidence.similarity_percent = Some(submitted.similarity_percent(&mission.reference_fingerprint));
            evidence.hash_pass = Some(distance <= max_distance);
        }

        if plan.should_run_detection(evidence.hash_pass) {
            let result = self.detect(image).await?;
            let presence = result.check_presence(
                &mission.target_objects,
                self.config.detection_confidence_threshold,
            );
            evidence.detected_labels = Some(presence.detected_labels);
            evidence.missing_objects = Some(presence.missing);
            evidence.detection_pass = Some(presence.pass);
        }

        evidence.final_verdict = plan.fuse(evidence.hash_pass, evidence.detection_pass);
        Ok(())
    }

    async fn fingerprint(&self, image: Arc<ImageFrame>) -> VerifyResult<PerceptualHash> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.fingerprint(&image))
            .await
            .map_err(|e| VerifyError::HasherUnavailable(format!("hasher task failed: {}", e)))?
            .map_err(|e| match e {
                VisionError::InvalidImage(reason) => VerifyError::InvalidImage(reason),
                VisionError::Backend(_) => VerifyError::HasherUnavailable(format!("{}: {}", self.hasher.id(), e)),
            })
    }

    async fn detect(&self, image: Arc<ImageFrame>) -> VerifyResult<DetectionResult> {
        let detector = Arc::clone(&self.detector);
        tokio::task::spawn_blocking(move || detector.detect(&image))
            .await
            .map_err(|e| VerifyError::DetectorUnavailable(format!("detector task failed: {}", e)))?
            .map_err(|e| match e {
                VisionError::InvalidImage(reason) => VerifyError::InvalidImage(reason),
                VisionError::Backend(_) => VerifyError::DetectorUnavailable(format!("{}: {}", self.detector.id(), e)),
            })
    }

    fn audit_log(&self) -> MutexGuard<'_, AttemptLog> {
        self.audit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn audit_stats(&self) -> AttemptStats {
        self.audit_log().stats()
    }

    pub fn audit_entries(&self, id: &MissionId) -> Vec<AttemptEntry> {
        self.audit_log()
            .entries_for_mission(id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn export_audit(&self) -> Result<String, serde_json::Error> {
        self.audit_log().export_json()
    }
}
