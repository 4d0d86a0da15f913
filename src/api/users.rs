/// Pending registration approval endpoints
use super::middleware::extract_idempotency_key;
use crate::{
    admin::PendingUser,
    auth::ManagerAuthContext,
    context::AppContext,
    error::{AppError, AppResult},
    idempotency::fingerprint,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/users/pending", get(list_pending))
        .route("/api/users/:id/approve", post(approve_user))
        .route("/api/users/:id/reject", post(reject_user))
}

#[derive(Debug, Serialize)]
struct PendingUsersResponse {
    users: Vec<PendingUser>,
    total: usize,
}

/// Registrations awaiting a decision
async fn list_pending(
    State(ctx): State<AppContext>,
    _auth: ManagerAuthContext,
) -> AppResult<Json<PendingUsersResponse>> {
    let users = ctx.approval_manager.list_pending().await?;
    Ok(Json(PendingUsersResponse {
        total: users.len(),
        users,
    }))
}

/// Explicit confirmation of an irreversible decision
#[derive(Debug, Default, Deserialize)]
struct ConfirmRequest {
    #[serde(default)]
    confirm: bool,
}

/// Approve a pending registration
async fn approve_user(
    State(ctx): State<AppContext>,
    auth: ManagerAuthContext,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    body: Option<Json<ConfirmRequest>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let confirm = body.map(|Json(req)| req.confirm).unwrap_or(false);
    let key = extract_idempotency_key(&headers);
    let fp = fingerprint(
        "user.approve",
        &user_id.to_string(),
        &json!({ "confirm": confirm }),
    );

    ctx.idempotency
        .execute(key.as_deref(), auth.user_id, &fp, || async {
            let account = ctx
                .approval_manager
                .approve(user_id, auth.user_id, confirm)
                .await?;
            Ok::<_, AppError>(json!({ "success": true, "account": account }))
        })
        .await
}

/// Reject a pending registration, deleting the account
async fn reject_user(
    State(ctx): State<AppContext>,
    auth: ManagerAuthContext,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    body: Option<Json<ConfirmRequest>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let confirm = body.map(|Json(req)| req.confirm).unwrap_or(false);
    let key = extract_idempotency_key(&headers);
    let fp = fingerprint(
        "user.reject",
        &user_id.to_string(),
        &json!({ "confirm": confirm }),
    );

    ctx.idempotency
        .execute(key.as_deref(), auth.user_id, &fp, || async {
            let user = ctx
                .approval_manager
                .reject(user_id, auth.user_id, confirm)
                .await?;
            Ok::<_, AppError>(json!({ "success": true, "user": user }))
        })
        .await
}
