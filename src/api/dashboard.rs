/// Manager and host dashboard endpoints
use super::parse_period;
use crate::{
    auth::{HostAuthContext, ManagerAuthContext},
    context::AppContext,
    error::AppResult,
    format::{format_currency, format_hours},
    reports::{HostPerformance, ReportPeriod, ReportStats},
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

const DEFAULT_TOP_HOSTS: i64 = 5;
const MAX_TOP_HOSTS: i64 = 50;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/dashboard/manager", get(manager_dashboard))
        .route("/api/dashboard/host", get(host_dashboard))
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    month: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct StatsDisplay {
    total_gmv: String,
    avg_gmv: String,
    total_hours: String,
}

impl From<&ReportStats> for StatsDisplay {
    fn from(stats: &ReportStats) -> Self {
        Self {
            total_gmv: format_currency(stats.total_gmv),
            avg_gmv: format_currency(stats.avg_gmv),
            total_hours: format_hours(stats.total_hours),
        }
    }
}

#[derive(Debug, Serialize)]
struct TopHost {
    #[serde(flatten)]
    performance: HostPerformance,
    total_gmv_display: String,
}

#[derive(Debug, Serialize)]
struct ManagerDashboard {
    period: String,
    stats: ReportStats,
    total_active_hosts: i64,
    display: StatsDisplay,
    top_hosts: Vec<TopHost>,
}

#[derive(Debug, Serialize)]
struct HostDashboard {
    period: String,
    stats: ReportStats,
    display: StatsDisplay,
}

fn period_label(period: ReportPeriod) -> String {
    match period {
        ReportPeriod::CurrentMonth => "current".to_string(),
        ReportPeriod::All => "all".to_string(),
        ReportPeriod::Month { year, month } => format!("{:04}-{:02}", year, month),
    }
}

/// Team-wide counters and the top host ranking
async fn manager_dashboard(
    State(ctx): State<AppContext>,
    _auth: ManagerAuthContext,
    Query(params): Query<DashboardQuery>,
) -> AppResult<Json<ManagerDashboard>> {
    let period = parse_period(params.month.as_deref())?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TOP_HOSTS)
        .clamp(1, MAX_TOP_HOSTS);

    let stats = ctx.report_manager.stats(period, None).await?;
    let total_active_hosts = ctx.account_manager.count_active_hosts().await?;
    let top_hosts = ctx
        .report_manager
        .top_hosts(period, limit)
        .await?
        .into_iter()
        .map(|performance| TopHost {
            total_gmv_display: format_currency(performance.total_gmv),
            performance,
        })
        .collect();

    Ok(Json(ManagerDashboard {
        period: period_label(period),
        display: StatsDisplay::from(&stats),
        stats,
        total_active_hosts,
        top_hosts,
    }))
}

/// The calling host's own counters
async fn host_dashboard(
    State(ctx): State<AppContext>,
    auth: HostAuthContext,
    Query(params): Query<DashboardQuery>,
) -> AppResult<Json<HostDashboard>> {
    let period = parse_period(params.month.as_deref())?;
    let stats = ctx.report_manager.stats(period, Some(auth.user_id)).await?;

    Ok(Json(HostDashboard {
        period: period_label(period),
        display: StatsDisplay::from(&stats),
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    async fn submit(app: &TestApp, token: &str, date: &str, gmv: i64) -> i64 {
        let (_, body) = app
            .send(
                "POST",
                "/api/reports",
                Some(token),
                Some(json!({
                    "session_date": date,
                    "live_start_time": "19:00",
                    "live_end_time": "21:00",
                    "gmv_amount": gmv,
                    "product_count": 10
                })),
            )
            .await;
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_manager_dashboard() {
        let app = TestApp::new().await;
        let (_, manager) = app.manager().await;
        let (_, sarah) = app.host("Sarah Wijaya", "@sarah_wijaya").await;
        let (_, budi) = app.host("Budi Santoso", "@budi_santoso").await;

        let a = submit(&app, &sarah, "2024-01-15", 5_500_000).await;
        let b = submit(&app, &budi, "2024-01-16", 8_200_000).await;
        submit(&app, &budi, "2024-01-17", 1_300_000).await;
        for id in [a, b] {
            app.send("POST", &format!("/api/reports/{}/verify", id), Some(&manager), None)
                .await;
        }

        let (status, body) = app
            .send("GET", "/api/dashboard/manager?month=2024-01", Some(&manager), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["period"], "2024-01");
        assert_eq!(body["stats"]["total_reports"], 3);
        assert_eq!(body["stats"]["pending"], 1);
        assert_eq!(body["stats"]["verified"], 2);
        assert_eq!(body["stats"]["total_gmv"], 15_000_000);
        assert_eq!(body["stats"]["avg_gmv"], 5_000_000);
        assert_eq!(body["display"]["total_gmv"], "Rp 15.0M");
        assert_eq!(body["total_active_hosts"], 2);
        assert_eq!(body["top_hosts"][0]["full_name"], "Budi Santoso");
        assert_eq!(body["top_hosts"][0]["total_gmv_display"], "Rp 8.2M");
        assert_eq!(body["top_hosts"].as_array().unwrap().len(), 2);

        let (status, _) = app
            .send("GET", "/api/dashboard/manager", Some(&sarah), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_host_dashboard_is_scoped() {
        let app = TestApp::new().await;
        let (_, sarah) = app.host("Sarah Wijaya", "@sarah_wijaya").await;
        let (_, budi) = app.host("Budi Santoso", "@budi_santoso").await;
        submit(&app, &sarah, "2024-01-15", 5_500_000).await;
        submit(&app, &budi, "2024-01-16", 8_200_000).await;

        let (status, body) = app
            .send("GET", "/api/dashboard/host?month=all", Some(&sarah), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["total_reports"], 1);
        assert_eq!(body["stats"]["total_gmv"], 5_500_000);
        assert_eq!(body["display"]["total_hours"], "0");
    }
}
