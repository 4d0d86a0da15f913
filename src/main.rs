/// Live Session Reporting - backend for the host/manager reporting dashboard
///
/// Hosts file one report per live-streaming session; managers verify or
/// reject those reports and approve the hosts who register through the bot.

mod account;
mod admin;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod format;
mod idempotency;
mod jobs;
mod metrics;
mod rate_limit;
mod reports;
mod server;
mod validation;

use config::ServerConfig;
use context::AppContext;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_tracing(&config.logging.level, config.logging.json);
    metrics::init_uptime();

    // Print banner
    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| "live_session_reporting=info,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
    __    _              _____                _
   / /   (_)   _____    / ___/___  __________(_)___  ____
  / /   / / | / / _ \   \__ \/ _ \/ ___/ ___/ / __ \/ __ \
 / /___/ /| |/ /  __/  ___/ /  __(__  |__  ) / /_/ / / / /
/_____/_/ |___/\___/  /____/\___/____/____/_/\____/_/ /_/

        Live Session Reporting v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
