//! Request-scoped identity and authorization gates
//!
//! Handlers receive an [`AuthContext`] extractor carrying the resolved
//! session identity (if any) plus the requested path, and call
//! [`AuthContext::require`] or [`AuthContext::require_admin`] at their
//! top. The two failure modes are distinct: a missing identity
//! redirects to the login page preserving the original path, while an
//! authenticated non-administrator gets an explicit 403 denial.

use crate::db::schema::UserRow;
use crate::{pages, AppState};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower_sessions::Session;

pub const SESSION_USER_KEY: &str = "user_id";
pub const SESSION_USERNAME_KEY: &str = "username";

pub struct AuthContext {
    pub user: Option<UserRow>,
    path: String,
}

impl AuthContext {
    pub fn require(self) -> Result<UserRow, AuthError> {
        match self.user {
            Some(user) => Ok(user),
            None => Err(AuthError::NotAuthenticated { next: self.path }),
        }
    }

    pub fn require_admin(self) -> Result<UserRow, AuthError> {
        match self.user {
            None => Err(AuthError::NotAuthenticated { next: self.path }),
            Some(user) if user.is_admin => Ok(user),
            Some(_) => Err(AuthError::Forbidden),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    NotAuthenticated { next: String },
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated { next } => {
                Redirect::to(&format!("/login?next={next}")).into_response()
            }
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, Html(pages::access_denied())).into_response()
            }
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();
        let user = load_session_user(parts, state).await;
        Ok(Self { user, path })
    }
}

/// Resolve the session identity against the store. Any failure along
/// the way (no session layer, stale id, database error) reads as "not
/// authenticated" rather than a fault.
async fn load_session_user(parts: &mut Parts, state: &Arc<AppState>) -> Option<UserRow> {
    let session = Session::from_request_parts(parts, state).await.ok()?;
    let user_id: i64 = session.get(SESSION_USER_KEY).await.ok().flatten()?;
    sqlx::query_as::<_, UserRow>("SELECT * FROM user WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(is_admin: bool) -> UserRow {
        UserRow {
            id: 1,
            username: "clerk".into(),
            password_hash: "digest".into(),
            is_admin,
            force_password_change: false,
            created_at: Some(Utc::now().naive_utc()),
        }
    }

    #[test]
    fn anonymous_is_redirected_with_next() {
        let ctx = AuthContext {
            user: None,
            path: "/users".into(),
        };
        match ctx.require() {
            Err(AuthError::NotAuthenticated { next }) => assert_eq!(next, "/users"),
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn non_admin_is_forbidden_not_redirected() {
        let ctx = AuthContext {
            user: Some(user(false)),
            path: "/users".into(),
        };
        assert!(matches!(ctx.require_admin(), Err(AuthError::Forbidden)));
    }

    #[test]
    fn admin_passes_both_gates() {
        let ctx = AuthContext {
            user: Some(user(true)),
            path: "/users".into(),
        };
        assert!(ctx.require_admin().is_ok());
    }

    #[test]
    fn authenticated_non_admin_passes_plain_gate() {
        let ctx = AuthContext {
            user: Some(user(false)),
            path: "/".into(),
        };
        assert!(ctx.require().is_ok());
    }
}
