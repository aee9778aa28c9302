//! # Event Document Service
//!
//! HTTP surface of the document pipeline under `/api/events`.
//!
//! ## Sub-modules:
//! - `pdf`: generates an event's document on demand and serves it inline.
//! - `status`: reports the stored result of the last run and any live
//!   background regeneration.
//! - `saved`: post-commit notification from the event editor; queues a
//!   debounced regeneration.
//! - `song_names`: maintenance endpoint refreshing cached song titles.

mod pdf;
mod saved;
mod song_names;
mod status;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/events";

/// Configures and returns the Actix `Scope` for event document routes.
///
/// # Registered Routes:
///
/// *   **`GET /{event_id}/pdf`**: the assembled PDF, `404` for unknown events.
/// *   **`GET /{event_id}/pdf-status`**: `EventPdfStatus` as JSON.
/// *   **`POST /{event_id}/saved`**: body `{"action": "created" | "updated"}`,
///     answers `202 Accepted`.
/// *   **`POST /update-song-names`**: `{"updated_events": n}`.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/update-song-names", post().to(song_names::process))
        .route("/{event_id}/pdf", get().to(pdf::process))
        .route("/{event_id}/pdf-status", get().to(status::process))
        .route("/{event_id}/saved", post().to(saved::process))
}
