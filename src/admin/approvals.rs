/// Approval of self-registered host accounts
use super::audit;
use crate::{
    account::{parse_account, UserAccount, ACCOUNT_COLUMNS},
    db::timestamp,
    error::{AppError, AppResult},
    format::format_time_ago,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Pending registration card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUser {
    pub id: i64,
    pub telegram_user_id: Option<String>,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub time_ago: String,
    pub approve_prompt: String,
    pub reject_prompt: String,
}

/// What remains of a rejected registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedUser {
    pub id: i64,
    pub full_name: String,
    pub username: String,
    pub telegram_user_id: Option<String>,
}

pub fn approve_prompt(full_name: &str) -> String {
    format!("Setujui user \"{}\"?", full_name)
}

pub fn reject_prompt(full_name: &str) -> String {
    format!(
        "Tolak dan hapus user \"{}\"? Tindakan ini tidak dapat dibatalkan.",
        full_name
    )
}

/// Approval manager
pub struct ApprovalManager {
    db: SqlitePool,
}

impl ApprovalManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Registrations waiting for a decision, newest first
    pub async fn list_pending(&self) -> AppResult<Vec<PendingUser>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM user_account
             WHERE role = 'HOST' AND is_approved = 0
             ORDER BY created_at DESC, id DESC",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let now = Utc::now();
        let mut pending = Vec::with_capacity(rows.len());
        for row in rows {
            let account = parse_account(&row)?;
            pending.push(PendingUser {
                time_ago: format_time_ago(account.created_at, now),
                approve_prompt: approve_prompt(&account.full_name),
                reject_prompt: reject_prompt(&account.full_name),
                id: account.id,
                telegram_user_id: account.telegram_user_id,
                full_name: account.full_name,
                username: account.username,
                email: account.email,
                created_at: account.created_at,
            });
        }

        Ok(pending)
    }

    /// Approve a pending account, making it approved and active
    pub async fn approve(
        &self,
        user_id: i64,
        actor_id: i64,
        confirm: bool,
    ) -> AppResult<UserAccount> {
        let account = self.get_pending(user_id).await?;
        if !confirm {
            return Err(AppError::Validation(format!(
                "Confirmation required: {}",
                approve_prompt(&account.full_name)
            )));
        }

        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "UPDATE user_account
             SET is_approved = 1, is_active = 1, approved_by = ?1, approved_at = ?2
             WHERE id = ?3 AND is_approved = 0",
        )
        .bind(actor_id)
        .bind(timestamp(Utc::now()))
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(format!(
                "User {} is no longer pending",
                user_id
            )));
        }

        audit::insert_entry(
            &mut *tx,
            Some(actor_id),
            "user.approve",
            "user",
            &user_id.to_string(),
            Some(&account.full_name),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id, actor_id, "Approved host account");
        crate::metrics::record_approval_decision("approved");

        let row = sqlx::query(&format!(
            "SELECT {} FROM user_account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        parse_account(&row)
    }

    /// Reject a pending account by deleting it
    pub async fn reject(
        &self,
        user_id: i64,
        actor_id: i64,
        confirm: bool,
    ) -> AppResult<RejectedUser> {
        let account = self.get_pending(user_id).await?;
        if !confirm {
            return Err(AppError::Validation(format!(
                "Confirmation required: {}",
                reject_prompt(&account.full_name)
            )));
        }

        let snapshot = RejectedUser {
            id: account.id,
            full_name: account.full_name,
            username: account.username,
            telegram_user_id: account.telegram_user_id,
        };
        let details = serde_json::to_string(&snapshot)
            .map_err(|e| AppError::Internal(format!("Failed to encode audit details: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let result = sqlx::query("DELETE FROM user_account WHERE id = ?1 AND is_approved = 0")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InvalidStateTransition(format!(
                "User {} is no longer pending",
                user_id
            )));
        }

        audit::insert_entry(
            &mut *tx,
            Some(actor_id),
            "user.reject",
            "user",
            &user_id.to_string(),
            Some(&details),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(user_id, actor_id, "Rejected and deleted host registration");
        crate::metrics::record_approval_decision("rejected");

        Ok(snapshot)
    }

    async fn get_pending(&self, user_id: i64) -> AppResult<UserAccount> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_account WHERE id = ?1 AND role = 'HOST'",
            ACCOUNT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let account = parse_account(&row)?;
        if account.is_approved {
            return Err(AppError::InvalidStateTransition(format!(
                "User {} is already approved",
                user_id
            )));
        }

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AuditLog;
    use crate::db::{insert_account, memory_pool};

    async fn setup() -> (ApprovalManager, i64, i64, i64) {
        let db = memory_pool().await;
        let manager_id = insert_account(&db, "Manager Demo", "@manager", "MANAGER", true).await;
        let dewi = insert_account(&db, "Dewi Lestari", "@dewi_lestari", "HOST", false).await;
        let rizky = insert_account(&db, "Rizky Pratama", "@rizky_pratama", "HOST", false).await;
        (ApprovalManager::new(db), manager_id, dewi, rizky)
    }

    fn pending_ids(pending: &[PendingUser]) -> Vec<i64> {
        let mut ids: Vec<i64> = pending.iter().map(|p| p.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_prompts() {
        assert_eq!(approve_prompt("Dewi Lestari"), "Setujui user \"Dewi Lestari\"?");
        assert_eq!(
            reject_prompt("Dewi Lestari"),
            "Tolak dan hapus user \"Dewi Lestari\"? Tindakan ini tidak dapat dibatalkan."
        );
    }

    #[tokio::test]
    async fn test_list_pending() {
        let (approvals, _, dewi, rizky) = setup().await;

        let pending = approvals.list_pending().await.unwrap();
        assert_eq!(pending_ids(&pending), vec![dewi, rizky]);
        assert!(pending.iter().all(|p| p.time_ago == "Baru saja"));

        let card = pending.iter().find(|p| p.id == dewi).unwrap();
        assert_eq!(card.approve_prompt, "Setujui user \"Dewi Lestari\"?");
    }

    #[tokio::test]
    async fn test_approve_removes_only_that_user() {
        let (approvals, manager_id, dewi, rizky) = setup().await;

        let approved = approvals.approve(dewi, manager_id, true).await.unwrap();
        assert!(approved.is_approved);
        assert!(approved.is_active);
        assert_eq!(approved.approved_by, Some(manager_id));

        let pending = approvals.list_pending().await.unwrap();
        assert_eq!(pending_ids(&pending), vec![rizky]);

        assert!(matches!(
            approvals.approve(dewi, manager_id, true).await,
            Err(AppError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            approvals.reject(dewi, manager_id, true).await,
            Err(AppError::InvalidStateTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_reject_deletes_account() {
        let (approvals, manager_id, dewi, rizky) = setup().await;

        let snapshot = approvals.reject(rizky, manager_id, true).await.unwrap();
        assert_eq!(snapshot.full_name, "Rizky Pratama");

        let pending = approvals.list_pending().await.unwrap();
        assert_eq!(pending_ids(&pending), vec![dewi]);

        assert!(matches!(
            approvals.reject(rizky, manager_id, true).await,
            Err(AppError::NotFound(_))
        ));

        let entries = AuditLog::new(approvals.db.clone())
            .list(10, Some("user.reject"))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].details.as_deref().unwrap().contains("Rizky Pratama"));
    }

    #[tokio::test]
    async fn test_confirmation_required() {
        let (approvals, manager_id, dewi, _) = setup().await;

        match approvals.approve(dewi, manager_id, false).await {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Setujui user \"Dewi Lestari\"?")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
        match approvals.reject(dewi, manager_id, false).await {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Tindakan ini tidak dapat dibatalkan.")),
            other => panic!("Expected Validation error, got {:?}", other),
        }

        assert_eq!(approvals.list_pending().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (approvals, manager_id, _, _) = setup().await;
        assert!(matches!(
            approvals.approve(999, manager_id, true).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            approvals.approve(manager_id, manager_id, true).await,
            Err(AppError::NotFound(_))
        ));
    }
}
