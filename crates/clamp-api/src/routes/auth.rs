//! Login, logout, and the forced-password-change flow

use crate::auth::{AuthContext, AuthError, SESSION_USERNAME_KEY, SESSION_USER_KEY};
use crate::db::schema::UserRow;
use crate::error::ApiError;
use crate::respond::{push_flash, take_flashes};
use crate::{pages, AppState};
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::warn;

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login_form(session: Session, Query(query): Query<LoginQuery>) -> Html<String> {
    let flashes = take_flashes(&session).await;
    Html(pages::login(query.next.as_deref(), &flashes))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM user WHERE username = ?1")
        .bind(&form.username)
        .fetch_optional(&state.db)
        .await
        .ok()
        .flatten();

    match user {
        Some(user) if state.passwords.verify_password(&form.password, &user.password_hash) => {
            if let Err(err) = session.insert(SESSION_USER_KEY, user.id).await {
                warn!("Could not establish session: {err}");
            }
            if let Err(err) = session.insert(SESSION_USERNAME_KEY, &user.username).await {
                warn!("Could not store username in session: {err}");
            }
            push_flash(&session, "success", "Logged in successfully").await;
            if user.force_password_change {
                return Redirect::to("/change-password").into_response();
            }
            // Only same-site paths are honoured for the post-login hop.
            let next = query
                .next
                .filter(|n| n.starts_with('/'))
                .unwrap_or_else(|| "/".to_string());
            Redirect::to(&next).into_response()
        }
        _ => {
            push_flash(&session, "error", "Invalid username or password").await;
            Redirect::to("/login").into_response()
        }
    }
}

pub async fn logout(session: Session) -> Redirect {
    if let Err(err) = session.flush().await {
        warn!("Could not clear session: {err}");
    }
    push_flash(&session, "success", "Logged out").await;
    Redirect::to("/login")
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

pub async fn change_password_form(
    ctx: AuthContext,
    session: Session,
) -> Result<Response, AuthError> {
    ctx.require()?;
    let flashes = take_flashes(&session).await;
    Ok(Html(pages::change_password(&flashes)).into_response())
}

/// Wrong current password or a mismatched new/confirm pair re-reports
/// locally and leaves the forced-change flag untouched.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    session: Session,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, AuthError> {
    let user = ctx.require()?;

    if !state
        .passwords
        .verify_password(&form.current_password, &user.password_hash)
    {
        push_flash(&session, "error", "Current password incorrect").await;
        return Ok(Redirect::to("/change-password").into_response());
    }
    if form.new_password.is_empty() || form.new_password != form.confirm_password {
        push_flash(&session, "error", "New passwords do not match").await;
        return Ok(Redirect::to("/change-password").into_response());
    }

    match update_password(&state, user.id, &form.new_password).await {
        Ok(()) => {
            push_flash(&session, "success", "Password changed successfully").await;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            push_flash(&session, "error", &format!("Error: {err}")).await;
            Ok(Redirect::to("/change-password").into_response())
        }
    }
}

async fn update_password(
    state: &AppState,
    user_id: i64,
    new_password: &str,
) -> Result<(), ApiError> {
    let digest = state.passwords.hash_password(new_password)?;
    sqlx::query("UPDATE user SET password_hash = ?1, force_password_change = 0 WHERE id = ?2")
        .bind(digest)
        .bind(user_id)
        .execute(&state.db)
        .await?;
    Ok(())
}
