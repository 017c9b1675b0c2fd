use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::errors::ApiError;
use crate::payload::SubscribeRequest;
use crate::state::AppState;

use super::client_ip;

pub fn configure_subscribe_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/subscribe", web::post().to(subscribe));
}

async fn subscribe(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ApiError> {
    if !state.service.allow_subscribe(&client_ip(&req)) {
        return Err(ApiError::RateLimited);
    }
    if !state.service.validate_ui_code(&body.ui_code) {
        return Err(ApiError::InvalidAccessCode);
    }

    let (endpoint, p256dh, auth) = body.resolve().ok_or(ApiError::InvalidSubscription)?;
    if endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
        return Err(ApiError::InvalidSubscription);
    }

    let (created, topics) = state.service.subscribe(&endpoint, &p256dh, &auth, body.topic.clone()).await?;

    let status = if created { actix_web::http::StatusCode::CREATED } else { actix_web::http::StatusCode::OK };
    Ok(HttpResponse::build(status).json(json!({ "status": "active", "topics": topics })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, DispatcherConfig, RateLimitConfig, WebPushConfig};
    use crate::dispatcher::PushDispatcher;
    use crate::errors::StoreError;
    use crate::service::AppService;
    use crate::store::{Subscription, SubscriptionStore};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<std::collections::HashMap<String, Subscription>>,
    }

    #[async_trait]
    impl SubscriptionStore for FakeStore {
        async fn upsert(&self, endpoint: &str, p256dh: &str, auth: &str, topics: &[String]) -> Result<bool, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let created = !rows.contains_key(endpoint);
            let now = Utc::now();
            rows.insert(
                endpoint.to_string(),
                Subscription {
                    endpoint: endpoint.to_string(),
                    p256dh: p256dh.to_string(),
                    auth: auth.to_string(),
                    topics: topics.to_vec(),
                    created_at: now,
                    updated_at: now,
                },
            );
            Ok(created)
        }
        async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), StoreError> {
            self.rows.lock().unwrap().remove(endpoint);
            Ok(())
        }
        async fn get_topics(&self, endpoint: &str) -> Result<Option<Vec<String>>, StoreError> {
            Ok(self.rows.lock().unwrap().get(endpoint).map(|s| s.topics.clone()))
        }
        async fn get_subscription(&self, endpoint: &str) -> Result<Option<Subscription>, StoreError> {
            Ok(self.rows.lock().unwrap().get(endpoint).cloned())
        }
        async fn list_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.topics.iter().any(|t| t == topic))
                .cloned()
                .collect())
        }
    }

    fn test_state(ui_code: &str) -> AppState {
        let config = Arc::new(AppConfig {
            port: 4000,
            database_url: "postgres://unused".to_string(),
            hub_ui_code: ui_code.to_string(),
            hub_secret: "secret".to_string(),
            web_push: WebPushConfig {
                vapid_public_key: String::new(),
                vapid_private_key: String::new(),
                subject: String::new(),
                ttl_seconds: 60,
            },
            dispatcher: DispatcherConfig { worker_count: 1, queue_size: 16, max_retries: 0, base_backoff_ms: 1 },
            rate_limit: RateLimitConfig { max_attempts: 5, window_seconds: 60 },
            allowed_origins: vec!["http://localhost:3000".to_string()],
        });
        let store: Arc<dyn SubscriptionStore> = Arc::new(FakeStore::default());
        let dispatcher = Arc::new(PushDispatcher::new(config.dispatcher.clone(), config.web_push.clone(), store.clone()));
        let service = Arc::new(AppService::new(config.clone(), store, dispatcher.clone()));
        AppState { config, service, dispatcher }
    }

    #[actix_web::test]
    async fn happy_path_returns_201_then_200_on_repeat() {
        let state = test_state("abc");
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure_subscribe_routes),
        )
        .await;

        let body = json!({
            "subscription": { "endpoint": "https://p/1", "keys": { "p256dh": "K", "auth": "A" } },
            "topic": "default",
            "ui_code": "abc"
        });
        let req = test::TestRequest::post().uri("/api/subscribe").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/api/subscribe").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    #[actix_web::test]
    async fn wrong_ui_code_is_unauthorized() {
        let state = test_state("abc");
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure_subscribe_routes),
        )
        .await;

        let body = json!({
            "subscription": { "endpoint": "https://p/1", "keys": { "p256dh": "K", "auth": "A" } },
            "ui_code": "wrong"
        });
        let req = test::TestRequest::post().uri("/api/subscribe").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn missing_keys_is_unprocessable() {
        let state = test_state("abc");
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(configure_subscribe_routes),
        )
        .await;

        let body = json!({ "endpoint": "https://p/1", "ui_code": "abc" });
        let req = test::TestRequest::post().uri("/api/subscribe").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
