/// Configuration management for the reporting backend
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub bot: BotConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub access_token_ttl: i64,
    /// Manager account created on first start when no manager exists
    pub bootstrap_manager: Option<BootstrapManager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapManager {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Messaging bot integration (`/daftar` self-registration)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Shared secret the bot sends in `X-Bot-Secret`; registration is disabled when unset
    pub shared_secret: Option<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub login_attempts_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("LSR_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("LSR_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let version =
            env::var("LSR_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("LSR_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("LSR_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("reporting.sqlite"));

        let jwt_secret = env::var("LSR_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let access_token_ttl = env::var("LSR_ACCESS_TOKEN_TTL")
            .unwrap_or_else(|_| "43200".to_string())
            .parse()
            .unwrap_or(43200);

        let bootstrap_manager = match (
            env::var("LSR_BOOTSTRAP_MANAGER_EMAIL"),
            env::var("LSR_BOOTSTRAP_MANAGER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapManager {
                email,
                password,
                full_name: env::var("LSR_BOOTSTRAP_MANAGER_NAME")
                    .unwrap_or_else(|_| "Manager".to_string()),
            }),
            _ => None,
        };

        let shared_secret = env::var("LSR_BOT_SHARED_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let rate_limit_enabled = env::var("LSR_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let requests_per_second = env::var("LSR_RATE_LIMIT_REQUESTS_PER_SECOND")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let login_attempts_per_minute = env::var("LSR_RATE_LIMIT_LOGIN_PER_MINUTE")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .unwrap_or(20);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("LSR_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                access_token_ttl,
                bootstrap_manager,
            },
            bot: BotConfig { shared_secret },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_second,
                login_attempts_per_minute,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.access_token_ttl <= 0 {
            return Err(AppError::Validation(
                "Access token TTL must be positive".to_string(),
            ));
        }

        if let Some(secret) = &self.bot.shared_secret {
            if secret.len() < 16 {
                return Err(AppError::Validation(
                    "Bot shared secret must be at least 16 characters".to_string(),
                ));
            }
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(AppError::Validation(format!(
                "Invalid log filter: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Minimal configuration for unit tests
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123".to_string(),
                access_token_ttl: 3600,
                bootstrap_manager: None,
            },
            bot: BotConfig {
                shared_secret: Some("bot-secret-for-tests".to_string()),
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                requests_per_second: 50,
                login_attempts_per_minute: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}
