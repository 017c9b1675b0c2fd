use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::ApiError;
use crate::payload::UnsubscribeRequest;
use crate::state::AppState;

pub fn configure_unsubscribe_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/unsubscribe", web::post().to(unsubscribe));
}

async fn unsubscribe(state: web::Data<AppState>, body: web::Json<UnsubscribeRequest>) -> Result<HttpResponse, ApiError> {
    let endpoint = body.resolve().filter(|e| !e.is_empty()).ok_or(ApiError::MissingEndpoint)?;
    state.service.unsubscribe(&endpoint).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "inactive" })))
}
