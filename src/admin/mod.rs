/// Manager-only administration
///
/// Handles approval of self-registered hosts and the audit trail of every
/// workflow decision.

pub mod approvals;
pub mod audit;

pub use approvals::{ApprovalManager, PendingUser, RejectedUser};
pub use audit::AuditLog;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor_id: Option<i64>,
    pub action: String,
    pub subject_type: String,
    pub subject_id: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}
