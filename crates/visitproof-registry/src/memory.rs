//! Process-local registry: one mutex per mission behind a shared map.
//!
//! The map lock is held only to look up or insert a slot, never across a
//! mission lock, so missions are verified and committed independently.

use crate::MissionRegistry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use visitproof_core::{MissionId, MissionRecord, VerificationEvidence, VerifyError, VerifyResult};
use visitproof_policy::{EngineConfig, ReattemptPolicy};

type Slot = Arc<Mutex<MissionRecord>>;

pub struct InMemoryMissionRegistry {
    missions: RwLock<HashMap<MissionId, Slot>>,
    policy: ReattemptPolicy,
    lock_timeout: Duration,
}

impl InMemoryMissionRegistry {
    pub fn new(policy: ReattemptPolicy, lock_timeout: Duration) -> Self {
        Self {
            missions: RwLock::new(HashMap::new()),
            policy,
            lock_timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.reattempt_policy, config.lock_timeout())
    }

    async fn slot(&self, id: &MissionId) -> VerifyResult<Slot> {
        let missions = self.missions.read().await;
        missions
            .get(id)
            .cloned()
            .ok_or_else(|| VerifyError::MissionNotFound(id.clone()))
    }

    async fn lock<'a>(&self, id: &MissionId, slot: &'a Mutex<MissionRecord>) -> VerifyResult<MutexGuard<'a, MissionRecord>> {
        tokio::time::timeout(self.lock_timeout, slot.lock())
            .await
            .map_err(|_| {
                tracing::warn!(mission_id = %id, timeout_ms = self.lock_timeout.as_millis() as u64, "mission lock wait exceeded");
                VerifyError::ConcurrentModification(id.clone())
            })
    }
}

impl Default for InMemoryMissionRegistry {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait]
impl MissionRegistry for InMemoryMissionRegistry {
    async fn insert(&self, record: MissionRecord) -> VerifyResult<MissionId> {
        let id = record.id.clone();
        let mut missions = self.missions.write().await;
        if missions.contains_key(&id) {
            return Err(VerifyError::InvalidMission(format!("mission {} already exists", id)));
        }
        missions.insert(id.clone(), Arc::new(Mutex::new(record)));
        Ok(id)
    }

    async fn get(&self, id: &MissionId) -> VerifyResult<MissionRecord> {
        let slot = self.slot(id).await?;
        let record = self.lock(id, &slot).await?;
        Ok(record.clone())
    }

    async fn commit(
        &self,
        id: &MissionId,
        expected_attempts: u32,
        evidence: VerificationEvidence,
    ) -> VerifyResult<MissionRecord> {
        let slot = self.slot(id).await?;
        let mut record = self.lock(id, &slot).await?;

        if record.attempts != expected_attempts {
            tracing::debug!(
                mission_id = %id,
                expected_attempts,
                attempts = record.attempts,
                "stale attempt discarded"
            );
            return Err(VerifyError::MissionAlreadyResolved {
                id: id.clone(),
                state: record.state,
            });
        }
        if !self.policy.permits(record.state, record.attempts) {
            return Err(VerifyError::MissionAlreadyResolved {
                id: id.clone(),
                state: record.state,
            });
        }

        record.apply(evidence);
        tracing::debug!(
            mission_id = %id,
            state = %record.state,
            attempts = record.attempts,
            "committed verification"
        );
        Ok(record.clone())
    }

    fn reattempt_policy(&self) -> ReattemptPolicy {
        self.policy
    }

    async fn len(&self) -> usize {
        self.missions.read().await.len()
    }
}
