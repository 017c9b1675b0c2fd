use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::dispatcher::PushDispatcher;
use crate::errors::ApiError;
use crate::payload::PushPayload;
use crate::rate_limiter::RateLimiter;
use crate::store::models::{normalize_topic, normalize_topics};
use crate::store::SubscriptionStore;

const SELF_TEST_TITLE: &str = "Test notification";
const SELF_TEST_BODY: &str = "This is a test push from the hub.";

/// Orchestrates authentication, input normalization, store lookups and
/// dispatcher hand-off. Route handlers talk only to this.
pub struct AppService {
    config: Arc<AppConfig>,
    store: Arc<dyn SubscriptionStore>,
    dispatcher: Arc<PushDispatcher>,
    rate_limiter: RateLimiter,
}

impl AppService {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SubscriptionStore>, dispatcher: Arc<PushDispatcher>) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit);
        Self { config, store, dispatcher, rate_limiter }
    }

    pub fn allow_subscribe(&self, ip: &str) -> bool {
        self.rate_limiter.allow(ip)
    }

    pub fn validate_ui_code(&self, code: &str) -> bool {
        constant_time_eq(&self.config.hub_ui_code, code)
    }

    pub fn validate_hub_secret(&self, secret: &str) -> bool {
        constant_time_eq(&self.config.hub_secret, secret)
    }

    pub async fn subscribe(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        topic: Option<String>,
    ) -> Result<(bool, Vec<String>), ApiError> {
        let requested = topic.map(|t| vec![t]);
        let topics = normalize_topics(requested).ok_or(ApiError::InvalidSubscription)?;
        let created = self.store.upsert(endpoint, p256dh, auth, &topics).await?;
        Ok((created, topics))
    }

    pub async fn unsubscribe(&self, endpoint: &str) -> Result<(), ApiError> {
        self.store.delete_by_endpoint(endpoint).await?;
        Ok(())
    }

    pub async fn subscriptions_me(&self, endpoint: &str) -> Result<(&'static str, Vec<String>), ApiError> {
        match self.store.get_topics(endpoint).await? {
            Some(topics) => Ok(("active", topics)),
            None => Ok(("inactive", Vec::new())),
        }
    }

    /// Resolves targets for the normalized topic and, unless `dry_run`,
    /// hands them to the dispatcher on a background task so this call
    /// returns as soon as the lookup completes.
    pub async fn trigger_topic(
        &self,
        topic: Option<&str>,
        payload: &PushPayload,
        dry_run: bool,
    ) -> Result<(String, usize), ApiError> {
        let topic = normalize_topic(topic);
        let targets = self.store.list_for_topic(&topic).await?;
        let count = targets.len();

        if !dry_run && count > 0 {
            let bytes = encode_payload(payload)?;
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.enqueue_many(targets, bytes).await;
            });
        }

        Ok((topic, count))
    }

    pub async fn trigger_self(&self, endpoint: &str) -> Result<usize, ApiError> {
        let Some(sub) = self.store.get_subscription(endpoint).await? else {
            return Ok(0);
        };
        let payload = PushPayload {
            title: SELF_TEST_TITLE.to_string(),
            body: SELF_TEST_BODY.to_string(),
            url: "/".to_string(),
        };
        let bytes = encode_payload(&payload)?;
        self.dispatcher.enqueue(sub, bytes).await;
        Ok(1)
    }
}

fn encode_payload(payload: &PushPayload) -> Result<Arc<[u8]>, ApiError> {
    let bytes = serde_json::to_vec(payload).map_err(|err| ApiError::Internal(anyhow::anyhow!(err)))?;
    Ok(Arc::from(bytes.into_boxed_slice()))
}

/// Constant-time comparison that fails closed when no value is configured.
fn constant_time_eq(configured: &str, supplied: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    configured.as_bytes().ct_eq(supplied.as_bytes()).into()
}
