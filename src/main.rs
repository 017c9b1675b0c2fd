mod config;
mod dispatcher;
mod errors;
mod payload;
mod rate_limiter;
mod routes;
mod service;
mod state;
mod store;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web::Data, App, HttpServer};

use config::AppConfig;
use dispatcher::PushDispatcher;
use routes::{
    configure_health_routes, configure_subscribe_routes, configure_subscriptions_me_routes,
    configure_trigger_routes, configure_trigger_self_routes, configure_unsubscribe_routes,
};
use service::AppService;
use state::AppState;
use store::{PgSubscriptionStore, SubscriptionStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("invalid configuration");
    let config = Arc::new(config);

    if !config.web_push.is_complete() {
        log::warn!("VAPID keys are not configured; push transmission will be dropped until they are set");
    }

    let store = PgSubscriptionStore::connect(&config.database_url)
        .await
        .expect("failed to connect to the subscription store");
    let store: Arc<dyn SubscriptionStore> = Arc::new(store);

    let dispatcher = Arc::new(PushDispatcher::new(config.dispatcher.clone(), config.web_push.clone(), store.clone()));
    dispatcher.start().await;

    let service = Arc::new(AppService::new(config.clone(), store, dispatcher.clone()));

    let app_state = AppState { config: config.clone(), service, dispatcher: dispatcher.clone() };
    let app_data = Data::new(app_state);
    let port = config.port;

    log::info!("lectures-push-hub starting on http://0.0.0.0:{port}");

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static("x-hub-secret"),
            ])
            .max_age(3600);
        for origin in &app_data.config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .app_data(app_data.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_health_routes)
            .configure(configure_subscribe_routes)
            .configure(configure_unsubscribe_routes)
            .configure(configure_subscriptions_me_routes)
            .configure(configure_trigger_routes)
            .configure(configure_trigger_self_routes)
    })
    .bind(("0.0.0.0", port))?
    .run();

    let result = server.await;
    dispatcher.stop().await;
    result
}
