use std::sync::Arc;

use crate::config::AppConfig;
use crate::dispatcher::PushDispatcher;
use crate::service::AppService;

/// Shared application state handed to every handler via `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppService>,
    pub dispatcher: Arc<PushDispatcher>,
}
