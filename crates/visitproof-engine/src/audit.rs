//! Attempt audit trail
//!
//! One entry per `verify` call, including rejections and collaborator
//! faults that never reached the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use visitproof_core::{MissionId, MissionState, RejectionReason, VerificationOutcome, VerifyError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub mission_id: MissionId,
    pub trace_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter: Option<String>,

    pub event: AttemptEvent,

    /// State committed by this attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<MissionState>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionReason>,

    /// Error code when the attempt did not commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl AttemptEntry {
    fn base(mission_id: &MissionId, trace_id: &str, event: AttemptEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            mission_id: mission_id.clone(),
            trace_id: trace_id.to_string(),
            submitter: None,
            event,
            state: None,
            distance_meters: None,
            rejection: None,
            error_code: None,
        }
    }

    pub fn from_outcome(outcome: &VerificationOutcome) -> Self {
        let event = if outcome.final_verdict() {
            AttemptEvent::Verified
        } else {
            AttemptEvent::Failed
        };
        let mut entry = Self::base(&outcome.mission_id, &outcome.trace_id, event);
        entry.state = Some(outcome.state);
        entry.distance_meters = Some(outcome.evidence.distance_meters);
        entry.rejection = outcome.rejection;
        entry
    }

    pub fn from_error(mission_id: &MissionId, trace_id: &str, error: &VerifyError) -> Self {
        let event = if error.is_retryable() {
            AttemptEvent::Fault
        } else {
            AttemptEvent::Rejected
        };
        let mut entry = Self::base(mission_id, trace_id, event);
        entry.error_code = Some(error.code().to_string());
        entry
    }

    pub fn with_submitter(mut self, submitter: Option<String>) -> Self {
        self.submitter = submitter;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptEvent {
    /// Committed with a passing verdict
    Verified,
    /// Committed with a failing verdict
    Failed,
    /// Refused without mutation (unknown or resolved mission)
    Rejected,
    /// Checking subsystem or lock failed; nothing committed
    Fault,
}

/// Bounded in-memory attempt log.
pub struct AttemptLog {
    entries: Vec<AttemptEntry>,
    max_entries: usize,
}

impl AttemptLog {
    pub fn new() -> Self {
        Self::with_max_entries(10_000)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max.max(1),
        }
    }

    pub fn log(&mut self, entry: AttemptEntry) {
        self.entries.push(entry);

        if self.entries.len() > self.max_entries {
            let drain_count = self.entries.len() - self.max_entries;
            self.entries.drain(0..drain_count);
        }
    }

    pub fn entries(&self) -> &[AttemptEntry] {
        &self.entries
    }

    pub fn entries_for_mission(&self, mission_id: &MissionId) -> Vec<&AttemptEntry> {
        self.entries
            .iter()
            .filter(|e| &e.mission_id == mission_id)
            .collect()
    }

    pub fn stats(&self) -> AttemptStats {
        let count = |event: AttemptEvent| self.entries.iter().filter(|e| e.event == event).count();
        let verified = count(AttemptEvent::Verified);
        let failed = count(AttemptEvent::Failed);
        let committed = verified + failed;

        AttemptStats {
            total: self.entries.len(),
            verified,
            failed,
            rejected: count(AttemptEvent::Rejected),
            faults: count(AttemptEvent::Fault),
            pass_rate: if committed > 0 {
                verified as f64 / committed as f64
            } else {
                0.0
            },
        }
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }
}

impl Default for AttemptLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptStats {
    pub total: usize,
    pub verified: usize,
    pub failed: usize,
    pub rejected: usize,
    pub faults: usize,
    /// Verified share of committed attempts
    pub pass_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use visitproof_core::{MissionKind, VerificationEvidence};

    fn outcome(id: &str, verdict: bool) -> VerificationOutcome {
        let mut evidence = VerificationEvidence::geo(5.0, 50.0, true, String::new());
        evidence.hash_pass = Some(verdict);
        evidence.final_verdict = verdict;
        VerificationOutcome {
            mission_id: MissionId::from(id),
            kind: MissionKind::Landmark,
            state: MissionState::from_verdict(verdict),
            attempt: 1,
            rejection: evidence.rejection_reason(),
            evidence,
            trace_id: "t".into(),
        }
    }

    #[test]
    fn test_stats() {
        let mut log = AttemptLog::new();
        log.log(AttemptEntry::from_outcome(&outcome("a", true)));
        log.log(AttemptEntry::from_outcome(&outcome("b", false)));
        log.log(AttemptEntry::from_error(
            &MissionId::from("a"),
            "t",
            &VerifyError::MissionAlreadyResolved {
                id: MissionId::from("a"),
                state: MissionState::Verified,
            },
        ));
        log.log(AttemptEntry::from_error(
            &MissionId::from("c"),
            "t",
            &VerifyError::DetectorUnavailable("down".into()),
        ));

        let stats = log.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.faults, 1);
        assert_eq!(stats.pass_rate, 0.5);
        assert_eq!(log.entries_for_mission(&MissionId::from("a")).len(), 2);
    }

    #[test]
    fn test_trims_to_capacity() {
        let mut log = AttemptLog::with_max_entries(2);
        for id in ["a", "b", "c"] {
            log.log(AttemptEntry::from_outcome(&outcome(id, true)));
        }
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[0].mission_id, MissionId::from("b"));
    }

    #[test]
    fn test_export() {
        let mut log = AttemptLog::new();
        log.log(AttemptEntry::from_outcome(&outcome("a", false)));
        let json = log.export_json().unwrap();
        assert!(json.contains("\"event\": \"failed\""));
        assert!(json.contains("not_similar"));
    }
}
