use crate::store::SqliteEventStore;
use actix_web::{web, HttpResponse, Responder};
use log::error;

/// Refreshes the cached song title of every piece from the song catalog.
pub(crate) async fn process(store: web::Data<SqliteEventStore>) -> impl Responder {
    let store = store.into_inner();
    match web::block(move || store.sync_cached_titles()).await {
        Ok(Ok(updated_events)) => {
            HttpResponse::Ok().json(serde_json::json!({ "updated_events": updated_events }))
        }
        Ok(Err(e)) => {
            error!("Could not sync cached song titles: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
