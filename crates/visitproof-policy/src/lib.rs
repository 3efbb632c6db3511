//! Visitproof Policy: configuration and decision rules for verification
//!
//! # Architecture
//!
//! ```text
//! MissionRecord ─→ FusionPolicy::plan ─→ CheckPlan { similarity, detection, fusion }
//!                                             ↓
//!         hash_pass / detection_pass ─→ CheckPlan::fuse ─→ image verdict
//!
//! MissionState + attempts ─→ ReattemptPolicy::permits ─→ may verify?
//! ```
//!
//! # Example
//!
//! ```
//! use visitproof_policy::{EngineConfig, ReattemptPolicy};
//!
//! let config = EngineConfig::from_yaml("reattempt_policy: bounded_retries:2").unwrap();
//! assert_eq!(config.reattempt_policy, ReattemptPolicy::BoundedRetries(2));
//! assert_eq!(config.hash_max_distance, 10);
//! ```

pub mod config;
pub mod fusion;
pub mod reattempt;

pub use config::EngineConfig;
pub use fusion::{CheckPlan, FusionPolicy, GeneralPlacePolicy, KindTablePolicy};
pub use reattempt::ReattemptPolicy;
