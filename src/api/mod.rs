/// API routes and handlers
pub mod audit;
pub mod auth;
pub mod bot;
pub mod dashboard;
pub mod hosts;
pub mod middleware;
pub mod reports;
pub mod users;

use crate::{context::AppContext, error::AppError, reports::ReportPeriod};
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(bot::routes())
        .merge(reports::routes())
        .merge(dashboard::routes())
        .merge(hosts::routes())
        .merge(users::routes())
        .merge(audit::routes())
}

/// Parse the `month` query parameter, defaulting to the current month
fn parse_period(month: Option<&str>) -> Result<ReportPeriod, AppError> {
    match month {
        Some(month) if !month.trim().is_empty() => ReportPeriod::parse(month),
        _ => Ok(ReportPeriod::CurrentMonth),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        account::{hash_password, Role},
        context::{test_context, AppContext},
        server::build_router,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    pub struct TestApp {
        pub ctx: AppContext,
        pub router: Router,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let ctx = test_context().await;
            let router = build_router(ctx.clone());
            Self { ctx, router }
        }

        /// Create an approved, active account with a password
        pub async fn account(&self, full_name: &str, username: &str, role: Role) -> i64 {
            let id = crate::db::insert_account(&self.ctx.db, full_name, username, role.as_str(), true).await;
            sqlx::query("UPDATE user_account SET password_hash = ?1 WHERE id = ?2")
                .bind(hash_password("password123").unwrap())
                .bind(id)
                .execute(&self.ctx.db)
                .await
                .unwrap();
            id
        }

        /// Open a session for an account and return its bearer token
        pub async fn token_for(&self, user_id: i64) -> String {
            let account = self.ctx.account_manager.get_account(user_id).await.unwrap();
            self.ctx
                .account_manager
                .create_session(&account)
                .await
                .unwrap()
                .access_token
        }

        pub async fn manager(&self) -> (i64, String) {
            let id = self.account("Manager Demo", "@manager_demo", Role::Manager).await;
            (id, self.token_for(id).await)
        }

        pub async fn host(&self, full_name: &str, username: &str) -> (i64, String) {
            let id = self.account(full_name, username, Role::Host).await;
            (id, self.token_for(id).await)
        }

        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            self.send_with_headers(method, uri, token, &[], body).await
        }

        pub async fn send_with_headers(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            headers: &[(&str, &str)],
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, json)
        }
    }
}
