/// Messaging bot integration: `/daftar` self-registration
use super::middleware::ApiJson;
use crate::{
    account::{RegisterRequest, UserAccount},
    auth::BotAuth,
    context::AppContext,
    error::AppResult,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/bot/register", post(register))
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    success: bool,
    message: String,
    account: UserAccount,
}

/// Record a pending host registration forwarded by the bot
async fn register(
    State(ctx): State<AppContext>,
    _bot: BotAuth,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let account = ctx.account_manager.register_pending(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Pendaftaran diterima, menunggu persetujuan manager".to_string(),
            account,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    fn registration() -> serde_json::Value {
        json!({
            "telegram_user_id": "456789012",
            "full_name": "Dewi Lestari",
            "username": "@dewi_lestari",
            "email": "dewi@example.com"
        })
    }

    #[tokio::test]
    async fn test_register_with_secret() {
        let app = TestApp::new().await;

        let (status, body) = app
            .send_with_headers(
                "POST",
                "/api/bot/register",
                None,
                &[("x-bot-secret", "bot-secret-for-tests")],
                Some(registration()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["account"]["is_approved"], false);
        assert_eq!(body["account"]["role"], "HOST");

        let (status, body) = app
            .send_with_headers(
                "POST",
                "/api/bot/register",
                None,
                &[("x-bot-secret", "bot-secret-for-tests")],
                Some(registration()),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_secret() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send("POST", "/api/bot/register", None, Some(registration()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send_with_headers(
                "POST",
                "/api/bot/register",
                None,
                &[("x-bot-secret", "guess")],
                Some(registration()),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
