use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::ApiError;
use crate::payload::{DryRunQuery, PushPayload, TriggerRequest};
use crate::state::AppState;

pub fn configure_trigger_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/trigger", web::post().to(trigger));
}

async fn trigger(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DryRunQuery>,
    body: web::Json<TriggerRequest>,
) -> Result<HttpResponse, ApiError> {
    let secret = req
        .headers()
        .get("X-Hub-Secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !state.service.validate_hub_secret(secret) {
        return Err(ApiError::Unauthorized);
    }

    if body.title.is_empty() || body.body.is_empty() {
        return Err(ApiError::InvalidPayload);
    }

    let payload = PushPayload { title: body.title.clone(), body: body.body.clone(), url: body.url.clone() };
    let dry_run = query.is_dry_run();
    let (topic, targets) = state.service.trigger_topic(body.topic.as_deref(), &payload, dry_run).await?;

    if dry_run {
        Ok(HttpResponse::Ok().json(json!({ "dry_run": true, "topic": topic, "targets": targets })))
    } else {
        Ok(HttpResponse::Ok().json(json!({ "status": "queued", "topic": topic, "targets": targets })))
    }
}
