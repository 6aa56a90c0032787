//! Appeal lifecycle routes

use crate::auth::{AuthContext, AuthError};
use crate::db::schema::AppealRow;
use crate::error::ApiError;
use crate::respond::{mutation_failure, mutation_success, take_flashes, ResponseFormat};
use crate::{pages, AppState};
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Form;
use chrono::Utc;
use clamp_core::AppealStatus;
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

pub async fn appeals(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    session: Session,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    let appeals = sqlx::query_as::<_, AppealRow>("SELECT * FROM appeal ORDER BY id")
        .fetch_all(&state.db)
        .await
        .unwrap_or_default();
    let flashes = take_flashes(&session).await;
    Ok(Html(pages::appeals(&appeals, &flashes)).into_response())
}

#[derive(Deserialize)]
pub struct AddAppealForm {
    pub clamp_id: Option<String>,
    pub appeal_reason: Option<String>,
    pub appeal_status: Option<String>,
}

pub async fn add_appeal(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    session: Session,
    Form(form): Form<AddAppealForm>,
) -> Response {
    match create_appeal(&state, form).await {
        Ok(appeal) => {
            mutation_success(
                format,
                &session,
                "Appeal added successfully!",
                "/appeals",
                Some(appeal.to_json()),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/").await,
    }
}

/// The clamp reference must parse as an integer and resolve to a live
/// record before any row is written.
async fn create_appeal(state: &AppState, form: AddAppealForm) -> Result<AppealRow, ApiError> {
    let raw_id = form.clamp_id.unwrap_or_default();
    if raw_id.is_empty() {
        return Err(ApiError::MissingClampSelection);
    }
    let clamp_id: i64 = raw_id.parse().map_err(|_| ApiError::InvalidClampId)?;
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM clamp_data WHERE id = ?1")
        .bind(clamp_id)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_none() {
        return Err(ApiError::ClampMissing);
    }

    let reason = form.appeal_reason.unwrap_or_default().trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::MissingAppealReason);
    }
    let status = match form.appeal_status.as_deref() {
        None | Some("") => AppealStatus::default(),
        Some(value) => AppealStatus::parse(value)?,
    };

    let result = sqlx::query(
        "INSERT INTO appeal (clamp_id, appeal_date, appeal_reason, appeal_status, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
    )
    .bind(clamp_id)
    .bind(Utc::now().date_naive())
    .bind(&reason)
    .bind(status.as_str())
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await?;

    fetch_appeal(state, result.last_insert_rowid())
        .await?
        .ok_or(ApiError::NotFound("Appeal"))
}

#[derive(Deserialize)]
pub struct EditAppealForm {
    pub appeal_reason: Option<String>,
    pub appeal_status: Option<String>,
    pub notes: Option<String>,
}

pub async fn edit_appeal(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<EditAppealForm>,
) -> Response {
    match update_appeal(&state, id, form).await {
        Ok(appeal) => {
            mutation_success(
                format,
                &session,
                "Appeal updated successfully!",
                "/appeals",
                Some(appeal.to_json()),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/appeals").await,
    }
}

async fn update_appeal(
    state: &AppState,
    id: i64,
    form: EditAppealForm,
) -> Result<AppealRow, ApiError> {
    let mut appeal = fetch_appeal(state, id)
        .await?
        .ok_or(ApiError::NotFound("Appeal"))?;

    let reason = form.appeal_reason.unwrap_or_default().trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::MissingAppealReason);
    }
    let status = AppealStatus::parse(&form.appeal_status.unwrap_or_default())?;

    appeal.appeal_reason = reason;
    appeal.appeal_status = status.as_str().to_string();
    appeal.notes = Some(form.notes.unwrap_or_default());

    sqlx::query("UPDATE appeal SET appeal_reason = ?1, appeal_status = ?2, notes = ?3 WHERE id = ?4")
        .bind(&appeal.appeal_reason)
        .bind(&appeal.appeal_status)
        .bind(&appeal.notes)
        .bind(appeal.id)
        .execute(&state.db)
        .await?;

    Ok(appeal)
}

pub async fn delete_appeal(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    match remove_appeal(&state, id).await {
        Ok(()) => {
            mutation_success(
                format,
                &session,
                "Appeal deleted successfully!",
                "/appeals",
                None,
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/appeals").await,
    }
}

async fn remove_appeal(state: &AppState, id: i64) -> Result<(), ApiError> {
    let appeal = fetch_appeal(state, id)
        .await?
        .ok_or(ApiError::NotFound("Appeal"))?;
    sqlx::query("DELETE FROM appeal WHERE id = ?1")
        .bind(appeal.id)
        .execute(&state.db)
        .await?;
    Ok(())
}

async fn fetch_appeal(state: &AppState, id: i64) -> Result<Option<AppealRow>, sqlx::Error> {
    sqlx::query_as::<_, AppealRow>("SELECT * FROM appeal WHERE id = ?1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
}
