use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::ApiError;
use crate::payload::MeQuery;
use crate::state::AppState;

pub fn configure_subscriptions_me_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/subscriptions/me", web::get().to(subscriptions_me));
}

async fn subscriptions_me(state: web::Data<AppState>, query: web::Query<MeQuery>) -> Result<HttpResponse, ApiError> {
    let (status, topics) = state.service.subscriptions_me(&query.endpoint).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": status, "topics": topics })))
}
