/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::{ApprovalManager, AuditLog},
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    idempotency::IdempotencyStore,
    rate_limit::RateLimiter,
    reports::ReportManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub report_manager: Arc<ReportManager>,
    pub approval_manager: Arc<ApprovalManager>,
    pub audit_log: Arc<AuditLog>,
    pub idempotency: Arc<IdempotencyStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        let db = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let ctx = Self::with_pool(config, db);

        if let Some(manager) = ctx.account_manager.ensure_bootstrap_manager().await? {
            tracing::info!(user_id = manager.id, "Bootstrap manager ready");
        }

        Ok(ctx)
    }

    /// Wire services around an existing pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool) -> Self {
        let config = Arc::new(config);

        Self {
            account_manager: Arc::new(AccountManager::new(db.clone(), Arc::clone(&config))),
            report_manager: Arc::new(ReportManager::new(db.clone())),
            approval_manager: Arc::new(ApprovalManager::new(db.clone())),
            audit_log: Arc::new(AuditLog::new(db.clone())),
            idempotency: Arc::new(IdempotencyStore::new(db.clone())),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            config,
            db,
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}

#[cfg(test)]
pub(crate) async fn test_context() -> AppContext {
    AppContext::with_pool(ServerConfig::for_tests(), db::memory_pool().await)
}
