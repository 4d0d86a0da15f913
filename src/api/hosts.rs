/// Host management endpoints
use super::middleware::ApiJson;
use crate::{
    account::{
        ActiveFilter, ApprovalFilter, HostQuery, HostStats, HostSummary, UpdateHostRequest,
        UserAccount,
    },
    auth::ManagerAuthContext,
    context::AppContext,
    error::AppResult,
    format::{format_currency, format_hours},
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/hosts", get(list_hosts))
        .route("/api/hosts/stats", get(host_stats))
        .route("/api/hosts/:id", put(update_host))
}

#[derive(Debug, Deserialize)]
struct ListHostsQuery {
    approval: Option<String>,
    active: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Serialize)]
struct HostCard {
    #[serde(flatten)]
    summary: HostSummary,
    total_gmv_display: String,
    total_hours_display: String,
}

#[derive(Debug, Serialize)]
struct ListHostsResponse {
    hosts: Vec<HostCard>,
    total: usize,
}

/// List hosts with verified-report aggregates
async fn list_hosts(
    State(ctx): State<AppContext>,
    _auth: ManagerAuthContext,
    Query(params): Query<ListHostsQuery>,
) -> AppResult<Json<ListHostsResponse>> {
    let query = HostQuery {
        approval: match params.approval.as_deref() {
            Some(value) => ApprovalFilter::from_str(value)?,
            None => ApprovalFilter::default(),
        },
        active: match params.active.as_deref() {
            Some(value) => ActiveFilter::from_str(value)?,
            None => ActiveFilter::default(),
        },
        search: params.search.filter(|s| !s.trim().is_empty()),
    };

    let hosts: Vec<HostCard> = ctx
        .account_manager
        .list_hosts(&query)
        .await?
        .into_iter()
        .map(|summary| HostCard {
            total_gmv_display: format_currency(summary.total_gmv),
            total_hours_display: format_hours(summary.total_hours),
            summary,
        })
        .collect();

    Ok(Json(ListHostsResponse {
        total: hosts.len(),
        hosts,
    }))
}

/// Total, active and inactive approved hosts
async fn host_stats(
    State(ctx): State<AppContext>,
    _auth: ManagerAuthContext,
) -> AppResult<Json<HostStats>> {
    Ok(Json(ctx.account_manager.host_stats().await?))
}

/// Edit a host profile
async fn update_host(
    State(ctx): State<AppContext>,
    auth: ManagerAuthContext,
    Path(host_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateHostRequest>,
) -> AppResult<Json<UserAccount>> {
    let account = ctx
        .account_manager
        .update_host_profile(host_id, req, auth.user_id)
        .await?;

    Ok(Json(account))
}
