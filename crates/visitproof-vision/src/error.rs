//! Errors raised by vision collaborators
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisionError {
    #[error("IMAGE/{0}")]
    InvalidImage(String),

    /// The model or hashing backend failed; the photo itself was not judged.
    #[error("BACKEND/{0}")]
    Backend(String),
}
