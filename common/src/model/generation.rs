use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sidecar result of the last generation run, stored against the event.
///
/// `generated_at` is set on both success and failure; a run succeeded when
/// `error` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub path: Option<String>,
    pub filename: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl GenerationRecord {
    pub fn succeeded_at(&self) -> Option<DateTime<Utc>> {
        match self.error {
            None => self.generated_at,
            Some(_) => None,
        }
    }
}
