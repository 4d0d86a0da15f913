/// Login, logout and current-session endpoints
use super::middleware::ApiJson;
use crate::{
    account::{LoginRequest, LoginResponse, UserAccount},
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(get_session))
}

/// Email + password login
///
/// Form-level failures carry `success: false` and the message shown on the
/// login screen.
async fn login(State(ctx): State<AppContext>, ApiJson(req): ApiJson<LoginRequest>) -> Response {
    match ctx.account_manager.login(&req.email, &req.password).await {
        Ok((account, session)) => Json(LoginResponse {
            success: true,
            session_id: session.id,
            access_token: session.access_token,
            expires_at: session.expires_at,
            account,
        })
        .into_response(),
        Err(e) => {
            let message = match &e {
                AppError::Validation(msg) | AppError::Authentication(msg) => Some(msg.clone()),
                _ => None,
            };
            let Some(message) = message else {
                return e.into_response();
            };
            crate::metrics::record_error(e.code());
            (
                e.status(),
                Json(json!({
                    "success": false,
                    "error": e.code(),
                    "message": message
                })),
            )
                .into_response()
        }
    }
}

/// Revoke the caller's session
async fn logout(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<serde_json::Value>> {
    ctx.account_manager.logout(&auth.session.session_id).await?;

    tracing::info!(user_id = auth.user_id, "User logged out");

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    account: UserAccount,
}

/// Current account
async fn get_session(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<SessionResponse>> {
    let account = ctx.account_manager.get_account(auth.user_id).await?;
    Ok(Json(SessionResponse { account }))
}
