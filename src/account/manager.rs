/// Account manager implementation using runtime queries
/// This version uses sqlx runtime query building instead of compile-time macros
/// to avoid needing DATABASE_URL during compilation

use crate::{
    account::{
        matches_search, ActiveFilter, ApprovalFilter, HostQuery, HostStats, HostSummary,
        IssuedSession, RegisterRequest, Role, UpdateHostRequest, UserAccount, ValidatedSession,
    },
    admin::audit,
    auth::{verify_jwt_token, AccessClaims},
    config::ServerConfig,
    db::{parse_optional_timestamp, parse_timestamp, timestamp},
    error::{AppError, AppResult},
    validation::{
        is_valid_email, validate_login_input, validate_password, validation_errors_to_string,
        MSG_EMAIL_INVALID, MSG_LOGIN_FAILED,
    },
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// A concurrent writer can claim a username, email or Telegram id between
/// the uniqueness check and the write; the constraint then decides.
fn identity_conflict(e: sqlx::Error) -> AppError {
    let unique = e
        .as_database_error()
        .map_or(false, |db| db.is_unique_violation());
    if unique {
        AppError::Conflict("Username, email or Telegram account already registered".to_string())
    } else {
        AppError::Database(e)
    }
}

pub(crate) const ACCOUNT_COLUMNS: &str = "id, telegram_user_id, full_name, username, email, password_hash, \
     role, is_active, is_approved, approved_by, approved_at, created_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Record a `/daftar` registration as a pending host account
    pub async fn register_pending(&self, req: RegisterRequest) -> AppResult<UserAccount> {
        req.validate()
            .map_err(|e| AppError::Validation(validation_errors_to_string(&e)))?;

        if !is_valid_email(&req.email) {
            return Err(AppError::Validation(MSG_EMAIL_INVALID.to_string()));
        }

        let telegram_taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_account WHERE telegram_user_id = ?1")
                .bind(&req.telegram_user_id)
                .fetch_one(&self.db)
                .await?;
        if telegram_taken > 0 {
            return Err(AppError::Conflict(
                "Telegram account already registered".to_string(),
            ));
        }

        self.ensure_unique_identity(None, &req.username, &req.email)
            .await?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            "INSERT INTO user_account (telegram_user_id, full_name, username, email, role, is_active, is_approved, created_at)
             VALUES (?1, ?2, ?3, ?4, 'HOST', 0, 0, ?5)",
        )
        .bind(&req.telegram_user_id)
        .bind(&req.full_name)
        .bind(&req.username)
        .bind(&req.email)
        .bind(timestamp(now))
        .execute(&mut *tx)
        .await
        .map_err(identity_conflict)?;

        let id = result.last_insert_rowid();

        audit::insert_entry(
            &mut *tx,
            None,
            "user.register",
            "user",
            &id.to_string(),
            Some(&format!("telegram_user_id={}", req.telegram_user_id)),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = id,
            telegram_user_id = %req.telegram_user_id,
            "Registered pending host account"
        );
        crate::metrics::record_registration();

        self.get_account(id).await
    }

    /// Create the configured manager account when no manager exists yet
    pub async fn ensure_bootstrap_manager(&self) -> AppResult<Option<UserAccount>> {
        let Some(bootstrap) = self.config.authentication.bootstrap_manager.clone() else {
            return Ok(None);
        };

        let managers: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_account WHERE role = 'MANAGER'")
                .fetch_one(&self.db)
                .await?;
        if managers > 0 {
            return Ok(None);
        }

        if !is_valid_email(&bootstrap.email) {
            return Err(AppError::Validation(MSG_EMAIL_INVALID.to_string()));
        }
        validate_password(&bootstrap.password)?;

        let password_hash = hash_password(&bootstrap.password)?;
        let username = bootstrap
            .email
            .split('@')
            .next()
            .unwrap_or("manager")
            .to_string();
        let now = timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO user_account (full_name, username, email, password_hash, role, is_active, is_approved, approved_at, created_at)
             VALUES (?1, ?2, ?3, ?4, 'MANAGER', 1, 1, ?5, ?5)",
        )
        .bind(&bootstrap.full_name)
        .bind(&username)
        .bind(&bootstrap.email)
        .bind(&password_hash)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::info!(email = %bootstrap.email, "Created bootstrap manager account");

        self.get_account(result.last_insert_rowid()).await.map(Some)
    }

    /// Authenticate by email and password and open a session
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(UserAccount, IssuedSession)> {
        validate_login_input(email, password)?;

        let account = match self.get_account_by_email(email).await? {
            Some(account) => account,
            None => {
                tracing::warn!(email, "Login rejected: unknown email");
                return Err(AppError::Authentication(MSG_LOGIN_FAILED.to_string()));
            }
        };

        let Some(password_hash) = account.password_hash.as_deref() else {
            tracing::warn!(user_id = account.id, "Login rejected: no password set");
            return Err(AppError::Authentication(MSG_LOGIN_FAILED.to_string()));
        };

        if !verify_password(password, password_hash)? {
            tracing::warn!(user_id = account.id, "Login rejected: wrong password");
            return Err(AppError::Authentication(MSG_LOGIN_FAILED.to_string()));
        }

        if !account.is_approved || !account.is_active {
            tracing::warn!(
                user_id = account.id,
                is_approved = account.is_approved,
                is_active = account.is_active,
                "Login rejected: account not usable"
            );
            return Err(AppError::Authentication(MSG_LOGIN_FAILED.to_string()));
        }

        let session = self.create_session(&account).await?;

        tracing::info!(user_id = account.id, role = account.role.as_str(), "User logged in");

        Ok((account, session))
    }

    /// Create a session for an account
    pub async fn create_session(&self, account: &UserAccount) -> AppResult<IssuedSession> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.authentication.access_token_ttl);

        let access_token = self.generate_access_token(account, &session_id, now, expires_at)?;

        sqlx::query(
            "INSERT INTO session (id, user_id, created_at, expires_at, revoked)
             VALUES (?1, ?2, ?3, ?4, 0)",
        )
        .bind(&session_id)
        .bind(account.id)
        .bind(timestamp(now))
        .bind(timestamp(expires_at))
        .execute(&self.db)
        .await?;

        Ok(IssuedSession {
            id: session_id,
            access_token,
            expires_at,
        })
    }

    /// Validate access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> AppResult<ValidatedSession> {
        let claims = verify_jwt_token(token, &self.config.authentication.jwt_secret)?.claims;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::Authentication("Invalid token subject".to_string()))?;

        let row = sqlx::query(
            "SELECT s.expires_at, s.revoked, a.role, a.is_active, a.is_approved
             FROM session s JOIN user_account a ON a.id = s.user_id
             WHERE s.id = ?1 AND s.user_id = ?2",
        )
        .bind(&claims.sid)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid or expired session".to_string()))?;

        let revoked: bool = row.get("revoked");
        if revoked {
            return Err(AppError::Authentication("Session has been revoked".to_string()));
        }

        let expires_at = parse_timestamp(&row.get::<String, _>("expires_at"))?;
        if Utc::now() > expires_at {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        let is_active: bool = row.get("is_active");
        let is_approved: bool = row.get("is_approved");
        if !is_active || !is_approved {
            return Err(AppError::Authentication("Account is not active".to_string()));
        }

        let role = Role::from_str(&row.get::<String, _>("role"))?;

        Ok(ValidatedSession {
            user_id,
            session_id: claims.sid,
            role,
        })
    }

    /// Revoke a session (logout)
    pub async fn logout(&self, session_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE session SET revoked = 1 WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Get account by id
    pub async fn get_account(&self, id: i64) -> AppResult<UserAccount> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        parse_account(&row)
    }

    /// Get account by email (case-insensitive)
    async fn get_account_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(parse_account).transpose()
    }

    /// List host accounts with aggregates from verified reports
    pub async fn list_hosts(&self, query: &HostQuery) -> AppResult<Vec<HostSummary>> {
        let approval_clause = match query.approval {
            ApprovalFilter::Approved => " AND is_approved = 1",
            ApprovalFilter::Pending => " AND is_approved = 0",
            ApprovalFilter::All => "",
        };
        let active_clause = match query.active {
            ActiveFilter::All => "",
            ActiveFilter::Active => " AND is_active = 1",
            ActiveFilter::Inactive => " AND is_active = 0",
        };

        let sql = format!(
            "SELECT {},
                    COALESCE((SELECT SUM(r.gmv_amount) FROM session_report r
                              WHERE r.host_id = user_account.id AND r.status = 'VERIFIED'), 0) AS total_gmv,
                    COALESCE((SELECT SUM(r.live_minutes) FROM session_report r
                              WHERE r.host_id = user_account.id AND r.status = 'VERIFIED'), 0) AS total_minutes
             FROM user_account
             WHERE role = 'HOST'{}{}
             ORDER BY full_name COLLATE NOCASE, id",
            ACCOUNT_COLUMNS, approval_clause, active_clause
        );

        let rows = sqlx::query(&sql).fetch_all(&self.db).await?;

        let mut hosts = Vec::with_capacity(rows.len());
        for row in rows {
            let account = parse_account(&row)?;
            if let Some(term) = query.search.as_deref() {
                if !matches_search(&account.full_name, &account.username, term) {
                    continue;
                }
            }
            let total_minutes: i64 = row.get("total_minutes");
            hosts.push(HostSummary {
                account,
                total_gmv: row.get("total_gmv"),
                total_hours: total_minutes as f64 / 60.0,
            });
        }

        Ok(hosts)
    }

    /// Count approved hosts by active flag
    pub async fn host_stats(&self) -> AppResult<HostStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(is_active), 0) AS active
             FROM user_account
             WHERE role = 'HOST' AND is_approved = 1",
        )
        .fetch_one(&self.db)
        .await?;

        let total: i64 = row.get("total");
        let active: i64 = row.get("active");

        Ok(HostStats {
            total,
            active,
            inactive: total - active,
        })
    }

    /// Update a host profile from the manager's editor
    pub async fn update_host_profile(
        &self,
        host_id: i64,
        req: UpdateHostRequest,
        actor_id: i64,
    ) -> AppResult<UserAccount> {
        req.validate()
            .map_err(|e| AppError::Validation(validation_errors_to_string(&e)))?;

        if !is_valid_email(&req.email) {
            return Err(AppError::Validation(MSG_EMAIL_INVALID.to_string()));
        }

        let new_password_hash = match req.password.as_deref() {
            Some(password) if !password.is_empty() => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            _ => None,
        };

        let account = self.get_account(host_id).await?;
        if account.role != Role::Host {
            return Err(AppError::NotFound(format!("Host {} not found", host_id)));
        }
        if !account.is_approved {
            return Err(AppError::InvalidStateTransition(
                "Account must be approved before its profile can be edited".to_string(),
            ));
        }

        self.ensure_unique_identity(Some(host_id), &req.username, &req.email)
            .await?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "UPDATE user_account
             SET full_name = ?1, username = ?2, email = ?3, is_active = ?4,
                 password_hash = COALESCE(?5, password_hash)
             WHERE id = ?6",
        )
        .bind(&req.full_name)
        .bind(&req.username)
        .bind(&req.email)
        .bind(req.is_active)
        .bind(&new_password_hash)
        .bind(host_id)
        .execute(&mut *tx)
        .await
        .map_err(identity_conflict)?;

        // Deactivated hosts and password changes end existing sessions
        if !req.is_active || new_password_hash.is_some() {
            sqlx::query("UPDATE session SET revoked = 1 WHERE user_id = ?1")
                .bind(host_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut changes = Vec::new();
        if account.full_name != req.full_name {
            changes.push("full_name");
        }
        if account.username != req.username {
            changes.push("username");
        }
        if account.email != req.email {
            changes.push("email");
        }
        if account.is_active != req.is_active {
            changes.push(if req.is_active { "activated" } else { "deactivated" });
        }
        if new_password_hash.is_some() {
            changes.push("password");
        }

        audit::insert_entry(
            &mut *tx,
            Some(actor_id),
            "host.update",
            "user",
            &host_id.to_string(),
            Some(&changes.join(",")),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(host_id, actor_id, changes = ?changes, "Updated host profile");

        self.get_account(host_id).await
    }

    /// Count approved, active hosts
    pub async fn count_active_hosts(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_account WHERE role = 'HOST' AND is_approved = 1 AND is_active = 1",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Cleanup expired and revoked sessions
    ///
    /// Called periodically by the job scheduler.
    pub async fn cleanup_expired_sessions(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1 OR revoked = 1")
            .bind(timestamp(Utc::now()))
            .execute(&self.db)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");
        } else {
            tracing::debug!("Session cleanup: no expired sessions found");
        }

        Ok(deleted)
    }

    /// Reject a username or email already used by another account
    async fn ensure_unique_identity(
        &self,
        exclude_id: Option<i64>,
        username: &str,
        email: &str,
    ) -> AppResult<()> {
        let exclude = exclude_id.unwrap_or(-1);

        let username_taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_account WHERE username = ?1 AND id != ?2",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;
        if username_taken > 0 {
            return Err(AppError::Conflict(format!("Username {} already taken", username)));
        }

        let email_taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_account WHERE email = ?1 AND id != ?2")
                .bind(email)
                .bind(exclude)
                .fetch_one(&self.db)
                .await?;
        if email_taken > 0 {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        Ok(())
    }

    /// Generate access JWT token
    fn generate_access_token(
        &self,
        account: &UserAccount,
        session_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = AccessClaims {
            sub: account.id.to_string(),
            sid: session_id.to_string(),
            role: account.role.as_str().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(format!("Failed to generate token: {}", e)))
    }
}

/// Map a `user_account` row
pub(crate) fn parse_account(row: &SqliteRow) -> AppResult<UserAccount> {
    let role = Role::from_str(&row.get::<String, _>("role"))?;
    let created_at = parse_timestamp(&row.get::<String, _>("created_at"))?;
    let approved_at = parse_optional_timestamp(row.get("approved_at"))?;

    Ok(UserAccount {
        id: row.get("id"),
        telegram_user_id: row.get("telegram_user_id"),
        full_name: row.get("full_name"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        is_active: row.get("is_active"),
        is_approved: row.get("is_approved"),
        approved_by: row.get("approved_by"),
        approved_at,
        created_at,
    })
}

/// Hash a password using Argon2
pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
