//! Submission Context: per-request state carried through one verification
use std::collections::HashMap;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub trace_id: String,
    /// Device or account label, for logs only
    pub submitter: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl SubmissionContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            submitter: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_submitter(mut self, submitter: impl Into<String>) -> Self {
        self.submitter = Some(submitter.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl Default for SubmissionContext {
    fn default() -> Self {
        Self::new()
    }
}
