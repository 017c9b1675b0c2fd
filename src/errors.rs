use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

/// The hub's single user-visible error type.
///
/// Every route handler returns `Result<_, ApiError>` and propagates with
/// `?`; `ResponseError` picks the status code and JSON body so handlers
/// never hand-roll either.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid_subscription")]
    InvalidSubscription,
    #[error("missing_endpoint")]
    MissingEndpoint,
    #[error("invalid_payload")]
    InvalidPayload,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid_access_code")]
    InvalidAccessCode,
    #[error("rate_limited")]
    RateLimited,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidSubscription => "invalid_subscription",
            ApiError::MissingEndpoint => "missing_endpoint",
            ApiError::InvalidPayload => "invalid_payload",
            ApiError::Unauthorized => "unauthorized",
            ApiError::InvalidAccessCode => "invalid_access_code",
            ApiError::RateLimited => "rate_limited",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidSubscription | ApiError::MissingEndpoint | ApiError::InvalidPayload => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Unauthorized | ApiError::InvalidAccessCode => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(err) = self {
            log::error!("internal error: {err:#}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.kind() }))
    }
}

/// Store-layer failures, kept distinct from `ApiError` so the store crate
/// boundary doesn't leak HTTP concerns; routes convert with `?` via the
/// `From<StoreError> for ApiError` impl below.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(anyhow::anyhow!(err))
    }
}
