//! Re-attempt policy: which mission states may be verified again.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use visitproof_core::{MissionState, VerifyError};

/// Written as `single_attempt` or `bounded_retries:N` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReattemptPolicy {
    /// `CREATED` is the only verifiable state.
    #[default]
    SingleAttempt,
    /// A `FAILED` mission may be verified up to N more times.
    BoundedRetries(u32),
}

impl ReattemptPolicy {
    /// Whether a mission in `state` with `attempts` committed attempts may run another.
    pub fn permits(&self, state: MissionState, attempts: u32) -> bool {
        match (state, self) {
            (MissionState::Created, _) => true,
            (MissionState::Verified, _) => false,
            (MissionState::Failed, ReattemptPolicy::SingleAttempt) => false,
            (MissionState::Failed, ReattemptPolicy::BoundedRetries(retries)) => attempts <= *retries,
        }
    }

    /// Total attempts a mission can ever commit.
    pub fn max_attempts(&self) -> u32 {
        match self {
            ReattemptPolicy::SingleAttempt => 1,
            ReattemptPolicy::BoundedRetries(retries) => retries.saturating_add(1),
        }
    }
}

impl fmt::Display for ReattemptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReattemptPolicy::SingleAttempt => write!(f, "single_attempt"),
            ReattemptPolicy::BoundedRetries(n) => write!(f, "bounded_retries:{}", n),
        }
    }
}

impl FromStr for ReattemptPolicy {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value == "single_attempt" {
            return Ok(ReattemptPolicy::SingleAttempt);
        }
        if let Some(count) = value.strip_prefix("bounded_retries:") {
            return count
                .trim()
                .parse::<u32>()
                .map(ReattemptPolicy::BoundedRetries)
                .map_err(|e| VerifyError::InvalidConfig(format!("bounded_retries count '{}': {}", count, e)));
        }
        Err(VerifyError::InvalidConfig(format!(
            "unknown reattempt policy '{}', expected single_attempt or bounded_retries:N",
            value
        )))
    }
}

impl TryFrom<String> for ReattemptPolicy {
    type Error = VerifyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReattemptPolicy> for String {
    fn from(policy: ReattemptPolicy) -> Self {
        policy.to_string()
    }
}
