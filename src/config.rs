use std::env;

/// Top-level application configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub hub_ui_code: String,
    pub hub_secret: String,
    pub web_push: WebPushConfig,
    pub dispatcher: DispatcherConfig,
    pub rate_limit: RateLimitConfig,
    pub allowed_origins: Vec<String>,
}

/// VAPID key pair and Web Push transmission defaults.
#[derive(Debug, Clone)]
pub struct WebPushConfig {
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub subject: String,
    pub ttl_seconds: u32,
}

impl WebPushConfig {
    /// True once both halves of the VAPID key pair are present.
    pub fn is_complete(&self) -> bool {
        !self.vapid_public_key.is_empty() && !self.vapid_private_key.is_empty()
    }
}

/// Dispatcher worker pool sizing and retry policy.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub worker_count: usize,
    pub queue_size: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

/// Sliding-window rate limiter parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_seconds: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// `HUB_UI_CODE` and `HUB_SECRET` are deliberately NOT required here: an
    /// empty value is accepted at startup and instead fails closed at the
    /// point of use (`Service::validate_ui_code` / `validate_hub_secret`).
    pub fn from_env() -> Result<Self, String> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set".to_string())?;

        let hub_ui_code = env::var("HUB_UI_CODE").unwrap_or_default();
        let hub_secret = env::var("HUB_SECRET").unwrap_or_default();

        let web_push = WebPushConfig::from_env()?;
        let dispatcher = DispatcherConfig::from_env()?;
        let rate_limit = RateLimitConfig::from_env()?;

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            port,
            database_url,
            hub_ui_code,
            hub_secret,
            web_push,
            dispatcher,
            rate_limit,
            allowed_origins,
        })
    }
}

impl WebPushConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            vapid_public_key: env::var("VAPID_PUBLIC_KEY")
                .map_err(|_| "VAPID_PUBLIC_KEY environment variable not set".to_string())?,
            vapid_private_key: env::var("VAPID_PRIVATE_KEY")
                .map_err(|_| "VAPID_PRIVATE_KEY environment variable not set".to_string())?,
            subject: env::var("VAPID_SUBJECT")
                .or_else(|_| env::var("HUB_PUBLIC_ORIGIN"))
                .unwrap_or_default(),
            ttl_seconds: env::var("PUSH_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1_209_600),
        })
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            worker_count: env::var("WORKER_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            queue_size: env::var("QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            base_backoff_ms: env::var("RETRY_BASE_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(400),
        })
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            max_attempts: env::var("SUBSCRIBE_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            window_seconds: env::var("SUBSCRIBE_RATE_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        })
    }
}
