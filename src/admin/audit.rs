/// Audit trail of workflow decisions
use super::AuditLogEntry;
use crate::{
    db::{parse_timestamp, timestamp},
    error::AppResult,
};
use chrono::Utc;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

/// Append an audit entry on any executor
///
/// Accepts a transaction so the entry commits together with the change it
/// describes.
pub async fn insert_entry<'e, E>(
    executor: E,
    actor_id: Option<i64>,
    action: &str,
    subject_type: &str,
    subject_id: &str,
    details: Option<&str>,
) -> AppResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO audit_log (actor_id, action, subject_type, subject_id, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(actor_id)
    .bind(action)
    .bind(subject_type)
    .bind(subject_id)
    .bind(details)
    .bind(timestamp(Utc::now()))
    .execute(executor)
    .await?;

    Ok(())
}

/// Audit log reader
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Most recent entries first
    pub async fn list(&self, limit: i64, action: Option<&str>) -> AppResult<Vec<AuditLogEntry>> {
        let rows = match action {
            Some(action) => {
                sqlx::query(
                    "SELECT id, actor_id, action, subject_type, subject_id, details, timestamp
                     FROM audit_log WHERE action = ?1
                     ORDER BY id DESC LIMIT ?2",
                )
                .bind(action)
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, actor_id, action, subject_type, subject_id, details, timestamp
                     FROM audit_log
                     ORDER BY id DESC LIMIT ?1",
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(AuditLogEntry {
                id: row.get("id"),
                actor_id: row.get("actor_id"),
                action: row.get("action"),
                subject_type: row.get("subject_type"),
                subject_id: row.get("subject_id"),
                details: row.get("details"),
                timestamp: parse_timestamp(&row.get::<String, _>("timestamp"))?,
            });
        }

        Ok(entries)
    }
}
