//! Error body returned by the orchestrator

use serde::{Deserialize, Serialize};

/// JSON body of every non-2xx orchestrator response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Error category, e.g. `validation`, `build`, `stage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Offending recipe field, for validation and build errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Failing stage, for stage errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_index: Option<usize>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
            field: None,
            stage_index: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_stage(mut self, stage_index: usize) -> Self {
        self.stage_index = Some(stage_index);
        self
    }
}
