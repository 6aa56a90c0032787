//! Account administration routes (admin-gated)

use crate::auth::{AuthContext, AuthError};
use crate::db::schema::UserRow;
use crate::db::BOOTSTRAP_ADMIN;
use crate::error::ApiError;
use crate::respond::{mutation_failure, mutation_success, take_flashes, ResponseFormat};
use crate::{pages, AppState};
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_sessions::Session;

pub async fn users(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    session: Session,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    let users = sqlx::query_as::<_, UserRow>("SELECT * FROM user ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await
        .unwrap_or_default();
    let flashes = take_flashes(&session).await;
    Ok(Html(pages::users(&users, &flashes)).into_response())
}

#[derive(Deserialize)]
pub struct AddUserForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<String>,
}

pub async fn add_user(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    format: ResponseFormat,
    session: Session,
    Form(form): Form<AddUserForm>,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match create_user(&state, form).await {
        Ok(id) => {
            mutation_success(
                format,
                &session,
                "User added",
                "/users",
                Some(json!({ "status": "ok", "id": id })),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/users").await,
    })
}

async fn create_user(state: &AppState, form: AddUserForm) -> Result<i64, ApiError> {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::MissingCredentials);
    }
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM user WHERE username = ?1")
        .bind(&username)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::DuplicateUsername);
    }

    let digest = state.passwords.hash_password(&password)?;
    let result = sqlx::query(
        "INSERT INTO user (username, password_hash, is_admin, force_password_change, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
    )
    .bind(&username)
    .bind(digest)
    .bind(form.is_admin.is_some())
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match remove_user(&state, id).await {
        Ok(()) => mutation_success(format, &session, "User deleted", "/users", None).await,
        Err(err) => mutation_failure(format, &session, &err, "/users").await,
    })
}

async fn remove_user(state: &AppState, id: i64) -> Result<(), ApiError> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM user WHERE id = ?1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    if user.username == BOOTSTRAP_ADMIN {
        return Err(ApiError::ProtectedAccount);
    }
    sqlx::query("DELETE FROM user WHERE id = ?1")
        .bind(id)
        .execute(&state.db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testutil::{body_json, create_user, login_cookie, request, test_app};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn admin_gate_distinguishes_anonymous_from_forbidden() {
        let app = test_app().await;

        // Anonymous caller: redirect to login preserving the path.
        let resp = app
            .router
            .clone()
            .oneshot(request("GET", "/users", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/login?next=/users");

        // Authenticated non-administrator: explicit denial, no redirect.
        create_user(&app.state, "clerk", "clerk-pw", false, false).await;
        let cookie = login_cookie(&app.router, "clerk", "clerk-pw").await;
        let resp = app
            .router
            .clone()
            .oneshot(request("GET", "/users", None, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_can_add_and_delete_users() {
        let app = test_app().await;
        let cookie = login_cookie(&app.router, "admin", "admin-pw").await;

        let mut req = request(
            "POST",
            "/users/add",
            Some((
                "application/x-www-form-urlencoded",
                b"username=warden&password=warden-pw&is_admin=1".to_vec(),
            )),
            Some(&cookie),
        );
        req.headers_mut()
            .insert("accept", "application/json".parse().unwrap());
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let id = body["id"].as_i64().unwrap();

        let mut req = request("GET", &format!("/users/delete/{id}"), None, Some(&cookie));
        req.headers_mut()
            .insert("accept", "application/json".parse().unwrap());
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user WHERE username = 'warden'")
                .fetch_one(&app.state.db)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let app = test_app().await;
        let cookie = login_cookie(&app.router, "admin", "admin-pw").await;

        let mut req = request(
            "POST",
            "/users/add",
            Some((
                "application/x-www-form-urlencoded",
                b"username=admin&password=whatever".to_vec(),
            )),
            Some(&cookie),
        );
        req.headers_mut()
            .insert("accept", "application/json".parse().unwrap());
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bootstrap_admin_cannot_be_deleted() {
        let app = test_app().await;
        let cookie = login_cookie(&app.router, "admin", "admin-pw").await;

        let admin_id: i64 = sqlx::query_scalar("SELECT id FROM user WHERE username = 'admin'")
            .fetch_one(&app.state.db)
            .await
            .unwrap();

        let mut req = request(
            "GET",
            &format!("/users/delete/{admin_id}"),
            None,
            Some(&cookie),
        );
        req.headers_mut()
            .insert("accept", "application/json".parse().unwrap());
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // The account is still there.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user WHERE username = 'admin'")
            .fetch_one(&app.state.db)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
