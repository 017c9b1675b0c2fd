mod health;
mod me;
mod subscribe;
mod trigger;
mod trigger_self;
mod unsubscribe;

use actix_web::HttpRequest;

pub use health::configure_health_routes;
pub use me::configure_subscriptions_me_routes;
pub use subscribe::configure_subscribe_routes;
pub use trigger::configure_trigger_routes;
pub use trigger_self::configure_trigger_self_routes;
pub use unsubscribe::configure_unsubscribe_routes;

/// Derives the client IP for rate limiting: first `X-Forwarded-For` entry,
/// else `X-Real-IP`, else the transport-layer peer address.
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    if let Some(value) = req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()) {
        if let Some(first) = value.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    if let Some(value) = req.headers().get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        if !value.trim().is_empty() {
            return value.trim().to_string();
        }
    }

    req.peer_addr().map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
}
