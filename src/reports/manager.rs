/// Report storage and the verify/reject workflow
use super::{
    HostPerformance, ReportDecision, ReportPeriod, ReportQuery, ReportStats, ReportStatus,
    SessionReport, StatusFilter, SubmitReportRequest,
};
use crate::{
    account::matches_search,
    admin::audit,
    db::{parse_optional_timestamp, parse_timestamp, timestamp},
    error::{AppError, AppResult},
    validation::{live_minutes, parse_clock_time, validation_errors_to_string},
};
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use validator::Validate;

const REPORT_SELECT: &str = "SELECT r.id, r.host_id, a.full_name AS host_name, r.session_date, \
     r.live_start_time, r.live_end_time, r.live_minutes, r.gmv_amount, r.product_count, \
     r.status, r.reject_reason, r.decided_by, r.decided_at, r.created_at \
     FROM session_report r JOIN user_account a ON a.id = r.host_id";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Report manager
pub struct ReportManager {
    db: SqlitePool,
}

impl ReportManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// File a new PENDING report for a host
    pub async fn submit_report(
        &self,
        host_id: i64,
        req: SubmitReportRequest,
    ) -> AppResult<SessionReport> {
        req.validate()
            .map_err(|e| AppError::Validation(validation_errors_to_string(&e)))?;

        let start = parse_clock_time(&req.live_start_time)?;
        let end = parse_clock_time(&req.live_end_time)?;
        let minutes = live_minutes(start, end)?;

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "INSERT INTO session_report (host_id, session_date, live_start_time, live_end_time, live_minutes, gmv_amount, product_count, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', ?8)",
        )
        .bind(host_id)
        .bind(req.session_date.format(DATE_FORMAT).to_string())
        .bind(start.format("%H:%M").to_string())
        .bind(end.format("%H:%M").to_string())
        .bind(minutes)
        .bind(req.gmv_amount)
        .bind(req.product_count)
        .bind(timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();

        audit::insert_entry(
            &mut *tx,
            Some(host_id),
            "report.submit",
            "report",
            &id.to_string(),
            Some(&format!("gmv_amount={}", req.gmv_amount)),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            report_id = id,
            host_id,
            live_minutes = minutes,
            gmv_amount = req.gmv_amount,
            "Session report submitted"
        );
        crate::metrics::record_report_submitted();

        self.get_report(id).await
    }

    /// Get report by ID
    pub async fn get_report(&self, report_id: i64) -> AppResult<SessionReport> {
        let row = sqlx::query(&format!("{} WHERE r.id = ?1", REPORT_SELECT))
            .bind(report_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        parse_report(&row)
    }

    /// List reports, newest session first
    pub async fn list_reports(&self, query: &ReportQuery) -> AppResult<Vec<SessionReport>> {
        let mut builder = QueryBuilder::<Sqlite>::new(REPORT_SELECT);
        builder.push(" WHERE 1 = 1");

        if let StatusFilter::Only(status) = query.status {
            builder.push(" AND r.status = ").push_bind(status.as_str());
        }
        push_scope(&mut builder, query.period, query.host_id);
        builder.push(" ORDER BY r.session_date DESC, r.id DESC");
        // Host-name search runs on decoded rows, so only an unfiltered listing can cap in SQL
        if query.search.is_none() {
            builder.push(" LIMIT ").push_bind(query.limit.max(0));
        }

        let rows = builder.build().fetch_all(&self.db).await?;

        let limit = query.limit.max(0) as usize;
        let mut reports = Vec::new();
        for row in rows {
            if reports.len() >= limit {
                break;
            }
            let report = parse_report(&row)?;
            if let Some(term) = query.search.as_deref() {
                if !matches_search(&report.host_name, "", term) {
                    continue;
                }
            }
            reports.push(report);
        }

        Ok(reports)
    }

    /// Verify a pending report
    pub async fn verify(&self, report_id: i64, actor_id: i64) -> AppResult<SessionReport> {
        self.decide(report_id, actor_id, ReportDecision::Verify)
            .await
    }

    /// Reject a pending report with a reason
    pub async fn reject(
        &self,
        report_id: i64,
        actor_id: i64,
        reason: &str,
    ) -> AppResult<SessionReport> {
        let decision = ReportDecision::reject(reason)?;
        self.decide(report_id, actor_id, decision).await
    }

    async fn decide(
        &self,
        report_id: i64,
        actor_id: i64,
        decision: ReportDecision,
    ) -> AppResult<SessionReport> {
        let mut tx = self.db.begin().await?;

        let status: String =
            sqlx::query_scalar("SELECT status FROM session_report WHERE id = ?1")
                .bind(report_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

        let target = decision.apply(ReportStatus::from_str(&status)?)?;

        // Guarded so a concurrent decision cannot also succeed
        let result = sqlx::query(
            "UPDATE session_report
             SET status = ?1, reject_reason = ?2, decided_by = ?3, decided_at = ?4
             WHERE id = ?5 AND status = 'PENDING'",
        )
        .bind(target.as_str())
        .bind(decision.reason())
        .bind(actor_id)
        .bind(timestamp(Utc::now()))
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(format!(
                "Report {} is no longer pending",
                report_id
            )));
        }

        audit::insert_entry(
            &mut *tx,
            Some(actor_id),
            decision.action(),
            "report",
            &report_id.to_string(),
            decision.reason(),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            report_id,
            actor_id,
            status = target.as_str(),
            "Report decided"
        );
        crate::metrics::record_report_decision(target.as_str());

        self.get_report(report_id).await
    }

    /// Aggregate counters for a period, optionally for one host
    pub async fn stats(&self, period: ReportPeriod, host_id: Option<i64>) -> AppResult<ReportStats> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total_reports,
                    COALESCE(SUM(CASE WHEN r.status = 'PENDING' THEN 1 ELSE 0 END), 0) AS pending,
                    COALESCE(SUM(CASE WHEN r.status = 'VERIFIED' THEN 1 ELSE 0 END), 0) AS verified,
                    COALESCE(SUM(CASE WHEN r.status = 'REJECTED' THEN 1 ELSE 0 END), 0) AS rejected,
                    COALESCE(SUM(r.gmv_amount), 0) AS total_gmv,
                    COALESCE(SUM(CASE WHEN r.status = 'VERIFIED' THEN r.live_minutes ELSE 0 END), 0) AS verified_minutes
             FROM session_report r
             WHERE 1 = 1",
        );
        push_scope(&mut builder, period, host_id);

        let row = builder.build().fetch_one(&self.db).await?;

        let total_reports: i64 = row.get("total_reports");
        let total_gmv: i64 = row.get("total_gmv");
        let verified_minutes: i64 = row.get("verified_minutes");

        Ok(ReportStats {
            total_reports,
            pending: row.get("pending"),
            verified: row.get("verified"),
            rejected: row.get("rejected"),
            total_gmv,
            avg_gmv: if total_reports > 0 {
                total_gmv / total_reports
            } else {
                0
            },
            total_hours: verified_minutes as f64 / 60.0,
        })
    }

    /// Hosts ranked by verified GMV in a period
    pub async fn top_hosts(&self, period: ReportPeriod, limit: i64) -> AppResult<Vec<HostPerformance>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT a.id AS host_id, a.full_name, a.username,
                    SUM(r.gmv_amount) AS total_gmv,
                    SUM(r.live_minutes) AS total_minutes,
                    COUNT(*) AS sessions
             FROM session_report r JOIN user_account a ON a.id = r.host_id
             WHERE r.status = 'VERIFIED'",
        );
        push_scope(&mut builder, period, None);
        builder
            .push(" GROUP BY a.id, a.full_name, a.username ORDER BY total_gmv DESC, a.id LIMIT ")
            .push_bind(limit.max(0));

        let rows = builder.build().fetch_all(&self.db).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let total_minutes: i64 = row.get("total_minutes");
                HostPerformance {
                    host_id: row.get("host_id"),
                    full_name: row.get("full_name"),
                    username: row.get("username"),
                    total_gmv: row.get("total_gmv"),
                    total_hours: total_minutes as f64 / 60.0,
                    sessions: row.get("sessions"),
                }
            })
            .collect())
    }
}

/// Append period and host conditions on the `r` alias
fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, period: ReportPeriod, host_id: Option<i64>) {
    if let Some(host_id) = host_id {
        builder.push(" AND r.host_id = ").push_bind(host_id);
    }
    if let Some((start, end)) = period.bounds(Utc::now().date_naive()) {
        builder
            .push(" AND r.session_date >= ")
            .push_bind(start.format(DATE_FORMAT).to_string())
            .push(" AND r.session_date < ")
            .push_bind(end.format(DATE_FORMAT).to_string());
    }
}

fn parse_report(row: &SqliteRow) -> AppResult<SessionReport> {
    let session_date: String = row.get("session_date");
    let session_date = NaiveDate::parse_from_str(&session_date, DATE_FORMAT)
        .map_err(|e| AppError::Internal(format!("Invalid session date {}: {}", session_date, e)))?;
    let live_minutes: i64 = row.get("live_minutes");

    Ok(SessionReport {
        id: row.get("id"),
        host_id: row.get("host_id"),
        host_name: row.get("host_name"),
        session_date,
        live_start_time: row.get("live_start_time"),
        live_end_time: row.get("live_end_time"),
        live_minutes,
        live_hours: live_minutes as f64 / 60.0,
        gmv_amount: row.get("gmv_amount"),
        product_count: row.get("product_count"),
        status: ReportStatus::from_str(&row.get::<String, _>("status"))?,
        reject_reason: row.get("reject_reason"),
        decided_by: row.get("decided_by"),
        decided_at: parse_optional_timestamp(row.get("decided_at"))?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_account, memory_pool};

    fn request(date: &str, start: &str, end: &str, gmv: i64) -> SubmitReportRequest {
        SubmitReportRequest {
            session_date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            live_start_time: start.to_string(),
            live_end_time: end.to_string(),
            gmv_amount: gmv,
            product_count: 10,
        }
    }

    async fn setup() -> (ReportManager, i64, i64) {
        let db = memory_pool().await;
        let manager_id = insert_account(&db, "Manager Demo", "@manager", "MANAGER", true).await;
        let host_id = insert_account(&db, "Sarah Wijaya", "@sarah_wijaya", "HOST", true).await;
        (ReportManager::new(db), manager_id, host_id)
    }

    #[tokio::test]
    async fn test_submit_report() {
        let (reports, _, host_id) = setup().await;

        let report = reports
            .submit_report(host_id, request("2024-01-15", "19:00", "21:30", 5_500_000))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.host_name, "Sarah Wijaya");
        assert_eq!(report.live_minutes, 150);
        assert_eq!(report.live_hours, 2.5);
        assert!(report.reject_reason.is_none());
        assert!(report.decided_by.is_none());
    }

    #[tokio::test]
    async fn test_submit_past_midnight() {
        let (reports, _, host_id) = setup().await;

        let report = reports
            .submit_report(host_id, request("2024-01-15", "23:00", "01:30", 1_000))
            .await
            .unwrap();
        assert_eq!(report.live_minutes, 150);

        assert!(matches!(
            reports
                .submit_report(host_id, request("2024-01-15", "20:00", "20:00", 1_000))
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            reports
                .submit_report(host_id, request("2024-01-15", "20:00", "22:00", -5))
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_then_reject_fails() {
        let (reports, manager_id, host_id) = setup().await;
        let report = reports
            .submit_report(host_id, request("2024-01-15", "19:00", "21:00", 5_500_000))
            .await
            .unwrap();

        let verified = reports.verify(report.id, manager_id).await.unwrap();
        assert_eq!(verified.status, ReportStatus::Verified);
        assert_eq!(verified.decided_by, Some(manager_id));
        assert!(verified.decided_at.is_some());
        assert!(verified.reject_reason.is_none());

        assert!(matches!(
            reports.reject(report.id, manager_id, "Salah input").await,
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            reports.verify(report.id, manager_id).await,
            Err(AppError::InvalidStateTransition(_))
        ));
        assert_eq!(
            reports.get_report(report.id).await.unwrap().status,
            ReportStatus::Verified
        );
    }

    #[tokio::test]
    async fn test_reject_stores_reason() {
        let (reports, manager_id, host_id) = setup().await;
        let report = reports
            .submit_report(host_id, request("2024-01-15", "19:00", "21:00", 5_500_000))
            .await
            .unwrap();

        assert!(matches!(
            reports.reject(report.id, manager_id, "  ").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(
            reports.get_report(report.id).await.unwrap().status,
            ReportStatus::Pending
        );

        let rejected = reports
            .reject(report.id, manager_id, " Data GMV tidak sesuai ")
            .await
            .unwrap();
        assert_eq!(rejected.status, ReportStatus::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some("Data GMV tidak sesuai"));

        assert!(matches!(
            reports.verify(report.id, manager_id).await,
            Err(AppError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_decide_unknown_report() {
        let (reports, manager_id, _) = setup().await;
        assert!(matches!(
            reports.verify(404, manager_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (reports, manager_id, sarah) = setup().await;
        let budi = insert_account(&reports.db, "Budi Santoso", "@budi_santoso", "HOST", true).await;

        let first = reports
            .submit_report(sarah, request("2024-01-15", "19:00", "21:00", 5_500_000))
            .await
            .unwrap();
        reports
            .submit_report(budi, request("2024-01-20", "19:00", "21:00", 8_200_000))
            .await
            .unwrap();
        reports
            .submit_report(budi, request("2024-02-02", "19:00", "21:00", 1_000_000))
            .await
            .unwrap();
        reports.verify(first.id, manager_id).await.unwrap();

        let january = ReportQuery {
            period: ReportPeriod::Month { year: 2024, month: 1 },
            ..Default::default()
        };
        let listed = reports.list_reports(&january).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].session_date.to_string(), "2024-01-20");

        let verified = reports
            .list_reports(&ReportQuery {
                status: StatusFilter::Only(ReportStatus::Verified),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].id, first.id);

        let search = reports
            .list_reports(&ReportQuery {
                search: Some("BUDI".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 2);

        let own = reports
            .list_reports(&ReportQuery {
                host_id: Some(sarah),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(own.len(), 1);

        let limited = reports
            .list_reports(&ReportQuery {
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].session_date.to_string(), "2024-02-02");

        let none = reports
            .list_reports(&ReportQuery {
                limit: 0,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());

        let limited_search = reports
            .list_reports(&ReportQuery {
                search: Some("budi".to_string()),
                limit: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited_search.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_and_top_hosts() {
        let (reports, manager_id, sarah) = setup().await;
        let budi = insert_account(&reports.db, "Budi Santoso", "@budi_santoso", "HOST", true).await;

        let a = reports
            .submit_report(sarah, request("2024-01-15", "19:00", "21:30", 5_500_000))
            .await
            .unwrap();
        let b = reports
            .submit_report(budi, request("2024-01-16", "19:00", "22:00", 8_200_000))
            .await
            .unwrap();
        let c = reports
            .submit_report(budi, request("2024-01-17", "19:00", "20:00", 1_300_000))
            .await
            .unwrap();
        reports
            .submit_report(sarah, request("2024-01-18", "19:00", "20:00", 1_000_000))
            .await
            .unwrap();

        reports.verify(a.id, manager_id).await.unwrap();
        reports.verify(b.id, manager_id).await.unwrap();
        reports.reject(c.id, manager_id, "Bukti kurang").await.unwrap();

        let stats = reports.stats(ReportPeriod::All, None).await.unwrap();
        assert_eq!(stats.total_reports, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.verified, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.total_gmv, 16_000_000);
        assert_eq!(stats.avg_gmv, 4_000_000);
        assert_eq!(stats.total_hours, 5.5);

        let own = reports.stats(ReportPeriod::All, Some(sarah)).await.unwrap();
        assert_eq!(own.total_reports, 2);
        assert_eq!(own.verified, 1);

        let empty = reports
            .stats(ReportPeriod::Month { year: 2023, month: 6 }, None)
            .await
            .unwrap();
        assert_eq!(empty.total_reports, 0);
        assert_eq!(empty.avg_gmv, 0);

        let top = reports.top_hosts(ReportPeriod::All, 5).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].host_id, budi);
        assert_eq!(top[0].total_gmv, 8_200_000);
        assert_eq!(top[0].sessions, 1);
        assert_eq!(top[1].full_name, "Sarah Wijaya");
        assert_eq!(top[1].total_hours, 2.5);

        assert_eq!(reports.top_hosts(ReportPeriod::All, 1).await.unwrap().len(), 1);
    }
}
