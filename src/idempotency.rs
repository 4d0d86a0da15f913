/// Replay protection for workflow actions
///
/// A client may attach an `Idempotency-Key` header to verify/reject/approve
/// requests. The first successful response is stored per (key, actor) and
/// replayed for retries carrying the same request; reusing a key for a
/// different request is a conflict. Keys expire after 24 hours.
use crate::{
    db::{parse_timestamp, timestamp},
    error::{AppError, AppResult},
};
use axum::{http::StatusCode, Json};
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::future::Future;

/// How long a stored response stays replayable
pub const KEY_TTL_HOURS: i64 = 24;

/// Stored first response
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status_code: u16,
    pub body: Value,
}

/// Fingerprint of an action, its target and its request body
pub fn fingerprint(action: &str, target: &str, body: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(action.as_bytes());
    hasher.update([0u8]);
    hasher.update(target.as_bytes());
    hasher.update([0u8]);
    hasher.update(body.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Idempotency key store
pub struct IdempotencyStore {
    db: SqlitePool,
}

impl IdempotencyStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Find a live stored response for a key
    pub async fn lookup(
        &self,
        key: &str,
        actor_id: i64,
        fingerprint: &str,
    ) -> AppResult<Option<StoredResponse>> {
        let row = sqlx::query(
            "SELECT fingerprint, status_code, response, created_at
             FROM idempotency_key WHERE key = ?1 AND actor_id = ?2",
        )
        .bind(key)
        .bind(actor_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at = parse_timestamp(&row.get::<String, _>("created_at"))?;
        if Utc::now() - created_at > Duration::hours(KEY_TTL_HOURS) {
            return Ok(None);
        }

        let stored_fingerprint: String = row.get("fingerprint");
        if stored_fingerprint != fingerprint {
            return Err(AppError::Conflict(
                "Idempotency-Key was already used for a different request".to_string(),
            ));
        }

        let status_code: i64 = row.get("status_code");
        let response: String = row.get("response");
        let body = serde_json::from_str(&response)
            .map_err(|e| AppError::Internal(format!("Stored response is invalid: {}", e)))?;

        Ok(Some(StoredResponse {
            status_code: status_code as u16,
            body,
        }))
    }

    /// Remember the first response for a key
    pub async fn store(
        &self,
        key: &str,
        actor_id: i64,
        fingerprint: &str,
        response: &StoredResponse,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO idempotency_key (key, actor_id, fingerprint, status_code, response, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(key)
        .bind(actor_id)
        .bind(fingerprint)
        .bind(response.status_code as i64)
        .bind(response.body.to_string())
        .bind(timestamp(Utc::now()))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Run `op` once per key, replaying its stored response on retries
    ///
    /// Without a key the operation simply runs. Failures are not stored.
    pub async fn execute<T, F, Fut>(
        &self,
        key: Option<&str>,
        actor_id: i64,
        fingerprint: &str,
        op: F,
    ) -> AppResult<(StatusCode, Json<Value>)>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(key) = key {
            if let Some(stored) = self.lookup(key, actor_id, fingerprint).await? {
                tracing::debug!(key, actor_id, "Replaying stored response");
                crate::metrics::record_idempotent_replay();
                let status = StatusCode::from_u16(stored.status_code).unwrap_or(StatusCode::OK);
                return Ok((status, Json(stored.body)));
            }
        }

        let result = op().await?;
        let body = serde_json::to_value(&result)
            .map_err(|e| AppError::Internal(format!("Failed to encode response: {}", e)))?;

        if let Some(key) = key {
            let stored = StoredResponse {
                status_code: StatusCode::OK.as_u16(),
                body: body.clone(),
            };
            self.store(key, actor_id, fingerprint, &stored).await?;
        }

        Ok((StatusCode::OK, Json(body)))
    }

    /// Delete expired keys
    ///
    /// Called periodically by the job scheduler.
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::hours(KEY_TTL_HOURS);
        let result = sqlx::query("DELETE FROM idempotency_key WHERE created_at < ?1")
            .bind(timestamp(cutoff))
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fingerprint_distinguishes_requests() {
        let body = json!({"reason": "Data tidak sesuai"});
        let a = fingerprint("report.reject", "7", &body);
        assert_eq!(a, fingerprint("report.reject", "7", &body));
        assert_ne!(a, fingerprint("report.reject", "8", &body));
        assert_ne!(a, fingerprint("report.verify", "7", &body));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_execute_replays_first_response() {
        let store = IdempotencyStore::new(crate::db::memory_pool().await);
        let calls = AtomicUsize::new(0);
        let fp = fingerprint("report.verify", "1", &Value::Null);

        for _ in 0..2 {
            let (status, Json(body)) = store
                .execute(Some("key-1"), 1, &fp, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"status": "VERIFIED"}))
                })
                .await
                .unwrap();
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"status": "VERIFIED"}));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_reuse_with_different_request() {
        let store = IdempotencyStore::new(crate::db::memory_pool().await);
        let first = fingerprint("report.verify", "1", &Value::Null);
        let second = fingerprint("report.verify", "2", &Value::Null);

        store
            .execute(Some("key-1"), 1, &first, || async { Ok(json!({"id": 1})) })
            .await
            .unwrap();

        let result = store
            .execute(Some("key-1"), 1, &second, || async { Ok(json!({"id": 2})) })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // Keys are scoped per actor
        assert!(store
            .execute(Some("key-1"), 2, &second, || async { Ok(json!({"id": 2})) })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_failures_are_not_stored() {
        let store = IdempotencyStore::new(crate::db::memory_pool().await);
        let fp = fingerprint("user.approve", "3", &Value::Null);

        let failed: AppResult<(StatusCode, Json<Value>)> = store
            .execute(Some("key-1"), 1, &fp, || async {
                Err::<Value, _>(AppError::NotFound("User 3 not found".to_string()))
            })
            .await;
        assert!(failed.is_err());
        assert!(store.lookup("key-1", 1, &fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = crate::db::memory_pool().await;
        let store = IdempotencyStore::new(db.clone());
        let fp = fingerprint("report.verify", "1", &Value::Null);

        store
            .store("fresh", 1, &fp, &StoredResponse { status_code: 200, body: json!({}) })
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO idempotency_key (key, actor_id, fingerprint, status_code, response, created_at)
             VALUES ('old', 1, ?1, 200, '{}', '2020-01-01T00:00:00Z')",
        )
        .bind(&fp)
        .execute(&db)
        .await
        .unwrap();

        assert!(store.lookup("old", 1, &fp).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.lookup("fresh", 1, &fp).await.unwrap().is_some());
    }
}
