use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use common::model::event::EventId;
use log::error;

/// Generates the document on the blocking pool and serves it inline.
pub(crate) async fn process(
    event_id: web::Path<EventId>,
    pipeline: web::Data<Pipeline>,
) -> impl Responder {
    let event_id = event_id.into_inner();
    let pipeline = pipeline.into_inner();

    match web::block(move || pipeline.generate(event_id)).await {
        Ok(Ok(document)) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Inline,
                parameters: vec![DispositionParam::Filename(document.filename)],
            })
            .body(document.bytes),
        Ok(Err(PipelineError::NotFound(_))) => HttpResponse::NotFound().body("Event not found"),
        Ok(Err(e)) => {
            error!("Event {}: PDF generation failed: {}", event_id, e);
            HttpResponse::InternalServerError().body(format!("Error generating PDF: {}", e))
        }
        Err(e) => {
            error!("Event {}: PDF task failed: {}", event_id, e);
            HttpResponse::InternalServerError().body("Error generating PDF")
        }
    }
}
