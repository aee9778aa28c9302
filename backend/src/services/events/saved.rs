use crate::regeneration::state::RegenerationState;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::RegenerationStatus;
use common::model::event::EventId;
use common::requests::EventSavedRequest;

/// Post-commit hook: queues a regeneration and answers immediately.
pub(crate) async fn process(
    event_id: web::Path<EventId>,
    state: web::Data<RegenerationState>,
    payload: web::Json<EventSavedRequest>,
) -> impl Responder {
    let event_id = event_id.into_inner();
    match state.notify(event_id, payload.action).await {
        Ok(()) => HttpResponse::Accepted().json(serde_json::json!({
            "event_id": event_id,
            "status": RegenerationStatus::Pending,
        })),
        Err(err) => HttpResponse::InternalServerError().body(err),
    }
}
