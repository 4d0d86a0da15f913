/// Background task implementations
use crate::{
    context::AppContext,
    error::{AppError, AppResult},
};
use std::time::Duration;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Cleanup expired and revoked sessions
pub async fn cleanup_expired_sessions(ctx: &AppContext) -> AppResult<u64> {
    ctx.account_manager.cleanup_expired_sessions().await
}

/// Delete idempotency keys past their replay window
pub async fn purge_idempotency_keys(ctx: &AppContext) -> AppResult<u64> {
    ctx.idempotency.purge_expired().await
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    // Check database connectivity
    tokio::time::timeout(
        HEALTH_CHECK_TIMEOUT,
        sqlx::query("SELECT 1").fetch_one(&ctx.db),
    )
    .await
    .map_err(|_| AppError::Timeout("Database health check".to_string()))??;

    crate::metrics::update_uptime();

    // All checks passed
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;

    #[tokio::test]
    async fn test_tasks_run_on_empty_database() {
        let ctx = test_context().await;

        assert_eq!(cleanup_expired_sessions(&ctx).await.unwrap(), 0);
        assert_eq!(purge_idempotency_keys(&ctx).await.unwrap(), 0);
        health_check(&ctx).await.unwrap();
    }
}
