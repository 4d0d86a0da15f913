/// Audit log endpoint
use crate::{
    admin::AuditLogEntry, auth::ManagerAuthContext, context::AppContext, error::AppResult,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/audit", get(list_audit))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
    action: Option<String>,
}

#[derive(Debug, Serialize)]
struct AuditResponse {
    entries: Vec<AuditLogEntry>,
}

/// Recent audit entries, newest first
async fn list_audit(
    State(ctx): State<AppContext>,
    _auth: ManagerAuthContext,
    Query(params): Query<AuditQuery>,
) -> AppResult<Json<AuditResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let entries = ctx
        .audit_log
        .list(limit, params.action.as_deref())
        .await?;

    Ok(Json(AuditResponse { entries }))
}
