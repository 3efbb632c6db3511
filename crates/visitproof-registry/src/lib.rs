//! Visitproof Registry: ownership of mission records
//!
//! The registry is the only shared mutable state of the verification
//! engine. It serializes the read-check-write step per mission identifier;
//! everything expensive happens before `commit` is called.

pub mod memory;

pub use memory::InMemoryMissionRegistry;

use async_trait::async_trait;
use visitproof_core::{MissionId, MissionRecord, VerificationEvidence, VerifyResult};
use visitproof_policy::ReattemptPolicy;

/// Storage contract for mission records.
///
/// A persistent store can replace the in-memory one as long as `commit`
/// stays all-or-nothing and serialized per mission.
#[async_trait]
pub trait MissionRegistry: Send + Sync {
    /// Store a new record. Fails if the identifier is already taken.
    async fn insert(&self, record: MissionRecord) -> VerifyResult<MissionId>;

    /// Snapshot of the current record.
    async fn get(&self, id: &MissionId) -> VerifyResult<MissionRecord>;

    /// Atomically check eligibility under the re-attempt policy and apply
    /// the attempt's evidence. Returns the record as committed.
    ///
    /// `expected_attempts` is the attempt count of the snapshot the evidence
    /// was computed against; if another attempt committed since, this one is
    /// stale and nothing is written.
    ///
    /// Errors: `MissionNotFound`, `MissionAlreadyResolved` when the current
    /// state no longer permits an attempt or the snapshot is stale,
    /// `ConcurrentModification` when the mission lock could not be acquired
    /// in time.
    async fn commit(
        &self,
        id: &MissionId,
        expected_attempts: u32,
        evidence: VerificationEvidence,
    ) -> VerifyResult<MissionRecord>;

    fn reattempt_policy(&self) -> ReattemptPolicy;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
