//! Clamp record lifecycle routes

use crate::auth::{AuthContext, AuthError};
use crate::db::schema::{AppealRow, ClampRow, UserRow};
use crate::error::ApiError;
use crate::respond::{mutation_failure, mutation_success, take_flashes, ResponseFormat};
use crate::{pages, AppState};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use clamp_core::upload::{best_effort_remove, unique_upload_name, UPLOAD_SUBDIR};
use clamp_core::ClampForm;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

pub async fn index(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let clamps = list_clamps(&state).await.unwrap_or_default();
    // Accounts are shown on the admin tab; a failed read degrades to an
    // empty list rather than breaking the page.
    let users = sqlx::query_as::<_, UserRow>("SELECT * FROM user ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await
        .unwrap_or_default();
    let flashes = take_flashes(&session).await;
    Html(pages::index(&clamps, &users, &flashes)).into_response()
}

pub async fn dashboard(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let clamps = list_clamps(&state).await.unwrap_or_default();
    let flashes = take_flashes(&session).await;
    Html(pages::dashboard(&clamps, &flashes)).into_response()
}

pub async fn clamp_list(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let clamps = list_clamps(&state).await.unwrap_or_default();
    let flashes = take_flashes(&session).await;
    Html(pages::clamp_list(&clamps, &flashes)).into_response()
}

pub async fn clamp_form(session: Session) -> Response {
    let flashes = take_flashes(&session).await;
    Html(pages::clamp_form(None, &flashes)).into_response()
}

pub async fn edit_clamp_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    match fetch_clamp(&state, id).await {
        Ok(Some(clamp)) => {
            let flashes = take_flashes(&session).await;
            Html(pages::clamp_form(Some(&clamp), &flashes)).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn add_clamp(
    State(state): State<Arc<AppState>>,
    format: ResponseFormat,
    session: Session,
    mut multipart: Multipart,
) -> Response {
    match create_clamp(&state, &mut multipart).await {
        Ok(clamp) => {
            mutation_success(
                format,
                &session,
                "Clamp data added successfully!",
                "/",
                Some(clamp.to_json()),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/").await,
    }
}

pub async fn edit_clamp(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match update_clamp(&state, id, &mut multipart).await {
        Ok(clamp) => {
            mutation_success(
                format,
                &session,
                "Clamp data updated successfully!",
                "/",
                Some(clamp.to_json()),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/").await,
    })
}

pub async fn delete_clamp(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match remove_clamp(&state, id).await {
        Ok(()) => {
            mutation_success(
                format,
                &session,
                "Clamp data deleted successfully!",
                "/",
                None,
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/").await,
    })
}

pub async fn delete_clamp_with_appeals(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    format: ResponseFormat,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match remove_clamp_cascade(&state, id).await {
        Ok(()) => {
            mutation_success(
                format,
                &session,
                "Deleted clamp and its appeals",
                "/",
                Some(json!({ "status": "ok", "message": "Deleted clamp and its appeals", "id": id })),
            )
            .await
        }
        Err(err) => mutation_failure(format, &session, &err, "/").await,
    })
}

pub async fn api_clamp(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match fetch_clamp(&state, id).await {
        Ok(Some(clamp)) => Json(clamp.to_json()).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Clamp not found" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Storage error" })),
        )
            .into_response(),
    }
}

pub async fn clamp_appeals(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    let clamp = match fetch_clamp(&state, id).await {
        Ok(Some(clamp)) => clamp,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Clamp not found" })),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Storage error" })),
            )
                .into_response()
        }
    };
    let appeals =
        sqlx::query_as::<_, AppealRow>("SELECT * FROM appeal WHERE clamp_id = ?1 ORDER BY id")
            .bind(clamp.id)
            .fetch_all(&state.db)
            .await
            .unwrap_or_default();
    let appeals: Vec<_> = appeals.iter().map(AppealRow::to_json).collect();
    Json(json!({ "clamp_id": clamp.id, "appeals": appeals })).into_response()
}

pub async fn invoicing(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    session: Session,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    let paid = sqlx::query_as::<_, ClampRow>(
        "SELECT * FROM clamp_data WHERE payment_status = 'Paid' ORDER BY clamp_date",
    )
    .fetch_all(&state.db)
    .await
    .unwrap_or_default();
    let total = paid.iter().map(|c| c.amount_paid.unwrap_or(0.0)).sum();
    let flashes = take_flashes(&session).await;
    Ok(Html(pages::invoicing(&paid, total, &flashes)).into_response())
}

pub async fn presentation_invoice(
    State(state): State<Arc<AppState>>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Response, AuthError> {
    ctx.require_admin()?;
    Ok(match fetch_clamp(&state, id).await {
        Ok(Some(clamp)) => Html(pages::invoice(&clamp)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    })
}

async fn list_clamps(state: &AppState) -> Result<Vec<ClampRow>, sqlx::Error> {
    sqlx::query_as::<_, ClampRow>("SELECT * FROM clamp_data ORDER BY id")
        .fetch_all(&state.db)
        .await
}

async fn fetch_clamp(state: &AppState, id: i64) -> Result<Option<ClampRow>, sqlx::Error> {
    sqlx::query_as::<_, ClampRow>("SELECT * FROM clamp_data WHERE id = ?1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
}

struct ClampSubmission {
    fields: HashMap<String, String>,
    upload: Option<(String, Vec<u8>)>,
}

async fn read_submission(multipart: &mut Multipart) -> Result<ClampSubmission, ApiError> {
    let mut fields = HashMap::new();
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            if !file_name.is_empty() && !data.is_empty() {
                upload = Some((file_name, data.to_vec()));
            }
        } else {
            fields.insert(name, field.text().await?);
        }
    }
    Ok(ClampSubmission { fields, upload })
}

/// Write the uploaded bytes under the uploads subtree and return the
/// relative path that gets persisted.
async fn store_upload(state: &AppState, original: &str, data: &[u8]) -> Result<String, ApiError> {
    let dir = state.config.upload_dir();
    tokio::fs::create_dir_all(&dir).await?;
    let name = unique_upload_name(original, Utc::now());
    tokio::fs::write(dir.join(&name), data).await?;
    Ok(format!("{UPLOAD_SUBDIR}/{name}"))
}

/// Parse, store the attachment, insert the row. Any failure aborts the
/// whole create; the attachment is written before the insert so a
/// committed row never points at a file that was not stored.
async fn create_clamp(state: &AppState, multipart: &mut Multipart) -> Result<ClampRow, ApiError> {
    let submission = read_submission(multipart).await?;
    let form = ClampForm::from_fields(&submission.fields)?;

    let image_filename = match &submission.upload {
        Some((name, data)) => Some(store_upload(state, name, data).await?),
        None => None,
    };

    let result = sqlx::query(
        "INSERT INTO clamp_data (location, registration, clamp_date, time_in, time_called,
            time_released, car_type, color, clamp_ref, image_filename, offense,
            payment_status, amount_paid, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(&form.location)
    .bind(&form.registration)
    .bind(form.clamp_date)
    .bind(form.time_in)
    .bind(form.time_called)
    .bind(form.time_released)
    .bind(&form.car_type)
    .bind(&form.color)
    .bind(&form.clamp_ref)
    .bind(&image_filename)
    .bind(&form.offense)
    .bind(form.payment_status.as_str())
    .bind(form.amount_paid.unwrap_or(0.0))
    .bind(Utc::now().naive_utc())
    .execute(&state.db)
    .await?;

    fetch_clamp(state, result.last_insert_rowid())
        .await?
        .ok_or(ApiError::NotFound("Clamp"))
}

/// Full-field replacement. A new attachment supersedes the stored one;
/// the old file is removed best-effort after the reference is swapped
/// and before the row is persisted.
async fn update_clamp(
    state: &AppState,
    id: i64,
    multipart: &mut Multipart,
) -> Result<ClampRow, ApiError> {
    let mut clamp = fetch_clamp(state, id)
        .await?
        .ok_or(ApiError::NotFound("Clamp"))?;
    let submission = read_submission(multipart).await?;
    let form = ClampForm::from_fields(&submission.fields)?;

    if let Some((name, data)) = &submission.upload {
        let stored = store_upload(state, name, data).await?;
        let previous = clamp.image_filename.replace(stored);
        if let Some(old) = previous.filter(|p| !p.is_empty()) {
            best_effort_remove(&state.config.static_root().join(&old))
                .warn_if_failed("replacing clamp attachment");
        }
    }

    clamp.location = form.location;
    clamp.registration = Some(form.registration);
    clamp.clamp_date = form.clamp_date;
    clamp.time_in = form.time_in;
    clamp.time_called = form.time_called;
    clamp.time_released = form.time_released;
    clamp.car_type = Some(form.car_type);
    clamp.color = Some(form.color);
    clamp.clamp_ref = Some(form.clamp_ref);
    clamp.offense = form.offense;
    clamp.payment_status = form.payment_status.as_str().to_string();
    if let Some(amount) = form.amount_paid {
        clamp.amount_paid = Some(amount);
    }

    sqlx::query(
        "UPDATE clamp_data SET location = ?1, registration = ?2, clamp_date = ?3,
            time_in = ?4, time_called = ?5, time_released = ?6, car_type = ?7,
            color = ?8, clamp_ref = ?9, image_filename = ?10, offense = ?11,
            payment_status = ?12, amount_paid = ?13
         WHERE id = ?14",
    )
    .bind(&clamp.location)
    .bind(&clamp.registration)
    .bind(clamp.clamp_date)
    .bind(clamp.time_in)
    .bind(clamp.time_called)
    .bind(clamp.time_released)
    .bind(&clamp.car_type)
    .bind(&clamp.color)
    .bind(&clamp.clamp_ref)
    .bind(&clamp.image_filename)
    .bind(&clamp.offense)
    .bind(&clamp.payment_status)
    .bind(clamp.amount_paid)
    .bind(clamp.id)
    .execute(&state.db)
    .await?;

    Ok(clamp)
}

/// Plain delete: refused while appeals reference the record, so the
/// store never sees a dangling foreign key. Cascade delete is the
/// explicit path around this guard.
async fn remove_clamp(state: &AppState, id: i64) -> Result<(), ApiError> {
    let clamp = fetch_clamp(state, id)
        .await?
        .ok_or(ApiError::NotFound("Clamp"))?;
    let appeal_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appeal WHERE clamp_id = ?1")
        .bind(clamp.id)
        .fetch_one(&state.db)
        .await?;
    if appeal_count > 0 {
        return Err(ApiError::AppealsLinked);
    }
    sqlx::query("DELETE FROM clamp_data WHERE id = ?1")
        .bind(clamp.id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Delete a record's appeals and then the record itself as one
/// transaction; a failure anywhere rolls everything back.
async fn remove_clamp_cascade(state: &AppState, id: i64) -> Result<(), ApiError> {
    let mut tx = state.db.begin().await?;
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM clamp_data WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_none() {
        return Err(ApiError::NotFound("Clamp"));
    }
    sqlx::query("DELETE FROM appeal WHERE clamp_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM clamp_data WHERE id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
