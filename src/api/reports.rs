/// Session report endpoints
use super::{
    middleware::{extract_idempotency_key, ApiJson},
    parse_period,
};
use crate::{
    auth::{AuthContext, HostAuthContext, ManagerAuthContext},
    context::AppContext,
    error::{AppError, AppResult},
    format::{format_currency, format_date, format_hours},
    idempotency::fingerprint,
    reports::{ReportQuery, SessionReport, StatusFilter, SubmitReportRequest},
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/reports", get(list_reports).post(submit_report))
        .route("/api/reports/:id", get(get_report))
        .route("/api/reports/:id/verify", post(verify_report))
        .route("/api/reports/:id/reject", post(reject_report))
}

/// Report with its dashboard display strings
#[derive(Debug, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: SessionReport,
    pub display: ReportDisplay,
}

#[derive(Debug, Serialize)]
pub struct ReportDisplay {
    pub gmv: String,
    pub session_date: String,
    pub live_hours: String,
}

impl From<SessionReport> for ReportView {
    fn from(report: SessionReport) -> Self {
        let display = ReportDisplay {
            gmv: format_currency(report.gmv_amount),
            session_date: format_date(report.session_date),
            live_hours: format_hours(report.live_hours),
        };
        Self { report, display }
    }
}

#[derive(Debug, Deserialize)]
struct ListReportsQuery {
    status: Option<String>,
    month: Option<String>,
    search: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ListReportsResponse {
    reports: Vec<ReportView>,
    total: usize,
}

/// List reports; hosts only ever see their own
async fn list_reports(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(params): Query<ListReportsQuery>,
) -> AppResult<Json<ListReportsResponse>> {
    let status = match params.status.as_deref() {
        Some(status) => StatusFilter::from_str(status)?,
        None => StatusFilter::All,
    };

    let query = ReportQuery {
        status,
        period: parse_period(params.month.as_deref())?,
        host_id: if auth.is_manager() {
            None
        } else {
            Some(auth.user_id)
        },
        search: params.search.filter(|s| !s.trim().is_empty()),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    let reports: Vec<ReportView> = ctx
        .report_manager
        .list_reports(&query)
        .await?
        .into_iter()
        .map(ReportView::from)
        .collect();

    Ok(Json(ListReportsResponse {
        total: reports.len(),
        reports,
    }))
}

/// File a report for the calling host
async fn submit_report(
    State(ctx): State<AppContext>,
    auth: HostAuthContext,
    ApiJson(req): ApiJson<SubmitReportRequest>,
) -> AppResult<(StatusCode, Json<ReportView>)> {
    let report = ctx.report_manager.submit_report(auth.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

/// Report detail
async fn get_report(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(report_id): Path<i64>,
) -> AppResult<Json<ReportView>> {
    let report = ctx.report_manager.get_report(report_id).await?;

    if !auth.is_manager() && report.host_id != auth.user_id {
        return Err(AppError::NotFound(format!("Report {} not found", report_id)));
    }

    Ok(Json(report.into()))
}

/// Verify a pending report
async fn verify_report(
    State(ctx): State<AppContext>,
    auth: ManagerAuthContext,
    headers: HeaderMap,
    Path(report_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let key = extract_idempotency_key(&headers);
    let fp = fingerprint("report.verify", &report_id.to_string(), &Value::Null);

    ctx.idempotency
        .execute(key.as_deref(), auth.user_id, &fp, || async {
            let report = ctx.report_manager.verify(report_id, auth.user_id).await?;
            Ok::<_, AppError>(ReportView::from(report))
        })
        .await
}

#[derive(Debug, Default, Deserialize)]
struct RejectReportRequest {
    #[serde(default)]
    reason: String,
}

/// Reject a pending report with a reason
async fn reject_report(
    State(ctx): State<AppContext>,
    auth: ManagerAuthContext,
    headers: HeaderMap,
    Path(report_id): Path<i64>,
    body: Option<ApiJson<RejectReportRequest>>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    let key = extract_idempotency_key(&headers);
    let fp = fingerprint(
        "report.reject",
        &report_id.to_string(),
        &json!({ "reason": req.reason.trim() }),
    );

    ctx.idempotency
        .execute(key.as_deref(), auth.user_id, &fp, || async {
            let report = ctx
                .report_manager
                .reject(report_id, auth.user_id, &req.reason)
                .await?;
            Ok::<_, AppError>(ReportView::from(report))
        })
        .await
}
