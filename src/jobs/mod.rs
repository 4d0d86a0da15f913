use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        // Spawn cleanup tasks
        tokio::spawn(Self::expired_session_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::idempotency_purge_job(Arc::clone(&self)));

        // Spawn monitoring tasks
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Cleanup expired sessions (runs every hour)
    async fn expired_session_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;
            info!("Running expired session cleanup");

            let started = Instant::now();
            match tasks::cleanup_expired_sessions(&scheduler.context).await {
                Ok(count) => {
                    record("session_cleanup", "success", started);
                    if count > 0 {
                        info!("Cleaned up {} expired or revoked sessions", count);
                    }
                }
                Err(e) => {
                    record("session_cleanup", "failure", started);
                    error!("Failed to cleanup expired sessions: {}", e)
                }
            }
        }
    }

    /// Purge expired idempotency keys (runs every hour)
    async fn idempotency_purge_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600)); // Every hour

        loop {
            interval.tick().await;

            let started = Instant::now();
            match tasks::purge_idempotency_keys(&scheduler.context).await {
                Ok(count) => {
                    record("idempotency_purge", "success", started);
                    if count > 0 {
                        info!("Purged {} expired idempotency keys", count);
                    }
                }
                Err(e) => {
                    record("idempotency_purge", "failure", started);
                    error!("Failed to purge idempotency keys: {}", e)
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300)); // Every 5 minutes

        loop {
            interval.tick().await;

            let started = Instant::now();
            match tasks::health_check(&scheduler.context).await {
                Ok(_) => record("health_check", "success", started),
                Err(e) => {
                    record("health_check", "failure", started);
                    error!("Health check failed: {}", e)
                }
            }
        }
    }
}

fn record(job_type: &str, status: &str, started: Instant) {
    crate::metrics::record_background_job(job_type, status, started.elapsed().as_secs_f64());
}
