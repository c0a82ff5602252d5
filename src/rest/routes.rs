use super::AppState;
use actix_web::{web, HttpResponse};
use log::error;

#[actix_web::get("/transfers/{transaction_id}")]
pub async fn get_transfer(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let transaction_id = path.into_inner();
    let record = state
        .repository
        .get_by_transaction_id(&transaction_id)
        .await
        .map_err(|e| {
            error!("[{}] - Failed to load transfer: {}", transaction_id, e);
            actix_web::error::ErrorInternalServerError(e)
        })?;

    match record {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => Ok(HttpResponse::NotFound().body("Transfer not found")),
    }
}

#[actix_web::get("/metrics")]
pub async fn metrics() -> HttpResponse {
    crate::metrics::metrics().await
}
