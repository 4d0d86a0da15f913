/// Authentication extractors and utilities
use crate::{
    account::{Role, ValidatedSession},
    api::middleware::{extract_bearer_token, extract_bot_secret},
    context::AppContext,
    error::AppError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Account id
    pub sub: String,
    /// Session id
    pub sid: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated context - extracts and validates session from request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub session: ValidatedSession,
}

impl AuthContext {
    pub fn role(&self) -> Role {
        self.session.role
    }

    pub fn is_manager(&self) -> bool {
        self.session.role == Role::Manager
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let session = state.account_manager.validate_access_token(&token).await?;

        Ok(AuthContext {
            user_id: session.user_id,
            session,
        })
    }
}

/// Manager authentication context - requires the MANAGER role
#[derive(Debug, Clone)]
pub struct ManagerAuthContext {
    pub user_id: i64,
}

#[async_trait]
impl FromRequestParts<AppContext> for ManagerAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if auth.role() != Role::Manager {
            tracing::warn!(user_id = auth.user_id, "Manager role required");
            return Err(AppError::Authorization("Manager role required".to_string()));
        }

        Ok(ManagerAuthContext {
            user_id: auth.user_id,
        })
    }
}

/// Host authentication context - requires the HOST role
#[derive(Debug, Clone)]
pub struct HostAuthContext {
    pub user_id: i64,
}

#[async_trait]
impl FromRequestParts<AppContext> for HostAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;

        if auth.role() != Role::Host {
            return Err(AppError::Authorization("Host role required".to_string()));
        }

        Ok(HostAuthContext {
            user_id: auth.user_id,
        })
    }
}

/// Messaging bot caller, authenticated by the shared `X-Bot-Secret` header
#[derive(Debug, Clone, Copy)]
pub struct BotAuth;

#[async_trait]
impl FromRequestParts<AppContext> for BotAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.bot.shared_secret.as_deref() else {
            return Err(AppError::Authorization(
                "Bot registration is disabled".to_string(),
            ));
        };

        let provided = extract_bot_secret(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing bot secret".to_string()))?;

        if !constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
            tracing::warn!("Bot request with invalid secret");
            return Err(AppError::Authentication("Invalid bot secret".to_string()));
        }

        Ok(BotAuth)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Verify a JWT token with full validation
///
/// This performs:
/// 1. JWT signature verification
/// 2. Expiration checking
/// 3. Claims validation
pub fn verify_jwt_token(
    token: &str,
    jwt_secret: &str,
) -> Result<jsonwebtoken::TokenData<AccessClaims>, AppError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (1 minute)
    validation.leeway = 60;

    decode::<AccessClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                AppError::Authentication("Invalid token signature".to_string())
            }
            _ => AppError::Authentication(format!("Invalid token: {}", e)),
        }
    })
}
