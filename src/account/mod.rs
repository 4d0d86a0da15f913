/// Account management system
///
/// Handles manager and host accounts, login sessions, bot self-registration
/// and the host profile editor.

mod manager;

pub use manager::AccountManager;
pub(crate) use manager::{parse_account, ACCOUNT_COLUMNS};
#[cfg(test)]
pub(crate) use manager::hash_password;

use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Verifies reports and approves new accounts
    Manager,
    /// Streams live sessions and files reports
    Host,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "MANAGER",
            Role::Host => "HOST",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_uppercase().as_str() {
            "MANAGER" => Ok(Role::Manager),
            "HOST" => Ok(Role::Host),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub telegram_user_id: Option<String>,
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_approved: bool,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Validated session from bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user_id: i64,
    pub session_id: String,
    pub role: Role,
}

/// Issued login session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session_id: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: UserAccount,
}

/// `/daftar` self-registration forwarded by the messaging bot
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    pub telegram_user_id: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub full_name: String,
    #[validate(length(min = 2, max = 64, message = "must be 2-64 characters"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
}

/// Manager edit of a host profile
///
/// An empty password leaves the current password unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateHostRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub full_name: String,
    #[validate(length(min = 2, max = 64, message = "must be 2-64 characters"))]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    pub is_active: bool,
}

/// Approval filter for the host listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalFilter {
    #[default]
    Approved,
    Pending,
    All,
}

impl ApprovalFilter {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Ok(ApprovalFilter::Approved),
            "pending" => Ok(ApprovalFilter::Pending),
            "all" => Ok(ApprovalFilter::All),
            _ => Err(AppError::Validation(format!("Invalid approval filter: {}", s))),
        }
    }
}

/// Active-flag filter for the host listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl ActiveFilter {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ActiveFilter::All),
            "true" => Ok(ActiveFilter::Active),
            "false" => Ok(ActiveFilter::Inactive),
            _ => Err(AppError::Validation(format!("Invalid active filter: {}", s))),
        }
    }
}

/// Host listing query
#[derive(Debug, Clone, Default)]
pub struct HostQuery {
    pub approval: ApprovalFilter,
    pub active: ActiveFilter,
    pub search: Option<String>,
}

/// Host card with aggregates derived from verified reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSummary {
    #[serde(flatten)]
    pub account: UserAccount,
    pub total_gmv: i64,
    pub total_hours: f64,
}

/// Host counters for the host management page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Case-insensitive substring match on full name or username
pub fn matches_search(full_name: &str, username: &str, term: &str) -> bool {
    let term = term.to_lowercase();
    full_name.to_lowercase().contains(&term) || username.to_lowercase().contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("manager").unwrap(), Role::Manager);
        assert_eq!(Role::from_str("HOST").unwrap(), Role::Host);
        assert!(Role::from_str("admin").is_err());
    }

    #[test]
    fn test_filters_parse() {
        assert_eq!(ApprovalFilter::from_str("Pending").unwrap(), ApprovalFilter::Pending);
        assert_eq!(ActiveFilter::from_str("false").unwrap(), ActiveFilter::Inactive);
        assert!(ActiveFilter::from_str("maybe").is_err());
        assert_eq!(HostQuery::default().approval, ApprovalFilter::Approved);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        assert!(matches_search("Sarah Wijaya", "@sarah_wijaya", "SARAH"));
        assert!(matches_search("Budi Santoso", "@budi_santoso", "santoso"));
        assert!(matches_search("Maya Putri", "@maya_putri", "@MAYA"));
        assert!(!matches_search("Maya Putri", "@maya_putri", "budi"));
        assert!(matches_search("Maya Putri", "@maya_putri", ""));
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            telegram_user_id: "456789012".to_string(),
            full_name: "Dewi Lestari".to_string(),
            username: "@dewi_lestari".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
