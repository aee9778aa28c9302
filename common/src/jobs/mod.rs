use crate::model::event::EventId;
use crate::model::generation::GenerationRecord;
use serde::Serialize;

/// Live state of a background regeneration for one event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RegenerationStatus {
    Pending,
    Running,
    /// Generated and stored; carries the public path of the document.
    Completed(String),
    /// A successful generation is still inside the debounce window.
    Skipped,
    Failed(String),
}

/// Body of `GET /api/events/{id}/pdf-status`.
#[derive(Clone, Debug, Serialize)]
pub struct EventPdfStatus {
    pub event_id: EventId,
    /// Result of the last finished run, as stored against the event.
    pub generation: GenerationRecord,
    /// Background run requested since startup, if any.
    pub regeneration: Option<RegenerationStatus>,
}
