use serde::{Deserialize, Serialize};

/// Kind of write that was committed for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Created,
    Updated,
}

#[derive(Deserialize, Serialize)]
/// Post-commit notification payload for `POST /api/events/{id}/saved`.
pub struct EventSavedRequest {
    pub action: SaveAction,
}
