/// Session report workflow
///
/// Hosts file one report per live session; managers move each report out of
/// PENDING exactly once, either to VERIFIED or to REJECTED with a reason.

mod manager;
mod period;

pub use manager::ReportManager;
pub use period::ReportPeriod;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Report status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pending,
    Verified,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::Verified => "VERIFIED",
            ReportStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(ReportStatus::Pending),
            "VERIFIED" => Ok(ReportStatus::Verified),
            "REJECTED" => Ok(ReportStatus::Rejected),
            _ => Err(AppError::Validation(format!("Invalid report status: {}", s))),
        }
    }
}

/// A manager's decision on a pending report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDecision {
    Verify,
    Reject { reason: String },
}

impl ReportDecision {
    /// Build a rejection, trimming the reason
    pub fn reject(reason: &str) -> AppResult<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "Reject reason is required".to_string(),
            ));
        }
        Ok(ReportDecision::Reject {
            reason: reason.to_string(),
        })
    }

    /// Status the report moves to
    pub fn target(&self) -> ReportStatus {
        match self {
            ReportDecision::Verify => ReportStatus::Verified,
            ReportDecision::Reject { .. } => ReportStatus::Rejected,
        }
    }

    /// Apply the decision to a report in `current` status
    pub fn apply(&self, current: ReportStatus) -> AppResult<ReportStatus> {
        match current {
            ReportStatus::Pending => Ok(self.target()),
            decided => Err(AppError::InvalidStateTransition(format!(
                "Report is already {}",
                decided.as_str()
            ))),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ReportDecision::Verify => None,
            ReportDecision::Reject { reason } => Some(reason),
        }
    }

    fn action(&self) -> &'static str {
        match self {
            ReportDecision::Verify => "report.verify",
            ReportDecision::Reject { .. } => "report.reject",
        }
    }
}

/// Session report record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: i64,
    pub host_id: i64,
    pub host_name: String,
    pub session_date: NaiveDate,
    pub live_start_time: String,
    pub live_end_time: String,
    pub live_minutes: i64,
    pub live_hours: f64,
    pub gmv_amount: i64,
    pub product_count: i64,
    pub status: ReportStatus,
    pub reject_reason: Option<String>,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Report submission from a host
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitReportRequest {
    pub session_date: NaiveDate,
    pub live_start_time: String,
    pub live_end_time: String,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub gmv_amount: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub product_count: i64,
}

/// Status filter for report listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ReportStatus),
}

impl StatusFilter {
    pub fn from_str(s: &str) -> AppResult<Self> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        ReportStatus::from_str(s).map(StatusFilter::Only)
    }
}

/// Report listing query
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub status: StatusFilter,
    pub period: ReportPeriod,
    /// Restrict to one host's reports
    pub host_id: Option<i64>,
    /// Case-insensitive host name search
    pub search: Option<String>,
    pub limit: i64,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            period: ReportPeriod::All,
            host_id: None,
            search: None,
            limit: 100,
        }
    }
}

/// Report counters for a period
///
/// `total_gmv` and `avg_gmv` cover every report in the period; `total_hours`
/// counts verified sessions only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_reports: i64,
    pub pending: i64,
    pub verified: i64,
    pub rejected: i64,
    pub total_gmv: i64,
    pub avg_gmv: i64,
    pub total_hours: f64,
}

/// One row of the top-host ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPerformance {
    pub host_id: i64,
    pub full_name: String,
    pub username: String,
    pub total_gmv: i64,
    pub total_hours: f64,
    pub sessions: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_only_leave_pending() {
        assert_eq!(
            ReportDecision::Verify.apply(ReportStatus::Pending).unwrap(),
            ReportStatus::Verified
        );

        let reject = ReportDecision::reject("  Data GMV tidak sesuai  ").unwrap();
        assert_eq!(reject.reason(), Some("Data GMV tidak sesuai"));
        assert_eq!(reject.apply(ReportStatus::Pending).unwrap(), ReportStatus::Rejected);

        for decided in [ReportStatus::Verified, ReportStatus::Rejected] {
            assert!(matches!(
                ReportDecision::Verify.apply(decided),
                Err(AppError::InvalidStateTransition(_))
            ));
            assert!(matches!(
                reject.apply(decided),
                Err(AppError::InvalidStateTransition(_))
            ));
        }
    }

    #[test]
    fn test_blank_reject_reason() {
        assert!(matches!(
            ReportDecision::reject("   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(StatusFilter::from_str("ALL").unwrap(), StatusFilter::All);
        assert_eq!(
            StatusFilter::from_str("verified").unwrap(),
            StatusFilter::Only(ReportStatus::Verified)
        );
        assert!(StatusFilter::from_str("archived").is_err());
    }
}
