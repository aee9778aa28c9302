use crate::regeneration::state::RegenerationState;
use crate::store::GenerationLog;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::EventPdfStatus;
use common::model::event::EventId;
use log::error;

pub(crate) async fn process(
    event_id: web::Path<EventId>,
    log: web::Data<dyn GenerationLog>,
    state: web::Data<RegenerationState>,
) -> impl Responder {
    let event_id = event_id.into_inner();
    let log = log.into_inner();

    match web::block(move || log.last_generation(event_id)).await {
        Ok(Ok(Some(generation))) => HttpResponse::Ok().json(EventPdfStatus {
            event_id,
            generation,
            regeneration: state.status(event_id).await,
        }),
        Ok(Ok(None)) => HttpResponse::NotFound().body("Event not found"),
        Ok(Err(e)) => {
            error!("Event {}: could not read generation record: {}", event_id, e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
