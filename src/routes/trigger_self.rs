use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::ApiError;
use crate::payload::TriggerSelfRequest;
use crate::state::AppState;

pub fn configure_trigger_self_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/trigger-self", web::post().to(trigger_self));
}

async fn trigger_self(state: web::Data<AppState>, body: web::Json<TriggerSelfRequest>) -> Result<HttpResponse, ApiError> {
    if !state.service.validate_ui_code(&body.ui_code) {
        return Err(ApiError::InvalidAccessCode);
    }
    let targets = state.service.trigger_self(&body.endpoint).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "queued", "targets": targets })))
}
