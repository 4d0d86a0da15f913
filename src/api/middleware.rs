/// Request helpers shared by extractors and handlers
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::HeaderMap,
    Json,
};

/// Header carrying the messaging bot's shared secret
pub const BOT_SECRET_HEADER: &str = "x-bot-secret";

/// Header carrying a client-chosen idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Longest accepted idempotency key
const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Extract the bot shared secret
pub fn extract_bot_secret(headers: &HeaderMap) -> Option<String> {
    headers
        .get(BOT_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Extract an `Idempotency-Key`, ignoring empty or oversized values
pub fn extract_idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty() && key.len() <= MAX_IDEMPOTENCY_KEY_LEN)
        .map(str::to_string)
}

/// JSON body whose rejections render as the usual `{error, message}` body
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}
