//! Record type flowing between pipeline stages

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single unit of data passed from one stage to the next
///
/// Sources produce records, model instances turn records into predictions
/// (also records), and destinations commit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(JsonValue);

impl Record {
    pub fn new(data: JsonValue) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

impl From<JsonValue> for Record {
    fn from(data: JsonValue) -> Self {
        Self(data)
    }
}
