//! Dual-format responder
//!
//! Every mutating operation reports its outcome either as a redirect to
//! a listing page with a flashed status message, or as a structured
//! JSON payload for AJAX callers. The format is resolved once per
//! request from the declared content preference and passed into the
//! responder; handlers compute the outcome a single time and branch
//! only on presentation.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tower_sessions::Session;
use tracing::warn;

const FLASH_KEY: &str = "_flashes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Browser form flow: redirect plus flashed message.
    Redirect,
    /// AJAX flow: structured JSON payload.
    Structured,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let accepts_json = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));
        let xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "XMLHttpRequest");
        if accepts_json || xhr {
            Self::Structured
        } else {
            Self::Redirect
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ResponseFormat {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// One transient status message, shown on the next rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

/// Queue a flash message. Session write failures are logged and
/// swallowed; losing a status message never fails the operation.
pub async fn push_flash(session: &Session, level: &str, message: &str) {
    let mut flashes: Vec<Flash> = session
        .get(FLASH_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    flashes.push(Flash {
        level: level.to_string(),
        message: message.to_string(),
    });
    if let Err(err) = session.insert(FLASH_KEY, &flashes).await {
        warn!("Could not store flash message: {err}");
    }
}

/// Drain queued flash messages for rendering.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(FLASH_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Successful mutation: JSON echo of the entity for structured callers,
/// redirect-with-flash otherwise. `entity` is the row as already loaded
/// or written by the operation; no re-query happens here.
pub async fn mutation_success(
    format: ResponseFormat,
    session: &Session,
    message: &str,
    redirect_to: &str,
    entity: Option<Value>,
) -> Response {
    match format {
        ResponseFormat::Structured => {
            let body =
                entity.unwrap_or_else(|| json!({ "status": "ok", "message": message }));
            Json(body).into_response()
        }
        ResponseFormat::Redirect => {
            push_flash(session, "success", message).await;
            Redirect::to(redirect_to).into_response()
        }
    }
}

/// Failed mutation: JSON error with the mapped status for structured
/// callers, redirect-with-flash otherwise.
pub async fn mutation_failure(
    format: ResponseFormat,
    session: &Session,
    error: &ApiError,
    redirect_to: &str,
) -> Response {
    match format {
        ResponseFormat::Structured => {
            (error.status(), Json(json!({ "error": error.to_string() }))).into_response()
        }
        ResponseFormat::Redirect => {
            push_flash(session, "error", &format!("Error: {error}")).await;
            Redirect::to(redirect_to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn default_is_redirect() {
        assert_eq!(
            ResponseFormat::from_headers(&HeaderMap::new()),
            ResponseFormat::Redirect
        );
    }

    #[test]
    fn json_accept_selects_structured() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain"),
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers),
            ResponseFormat::Structured
        );
    }

    #[test]
    fn xhr_header_selects_structured() {
        let mut headers = HeaderMap::new();
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert_eq!(
            ResponseFormat::from_headers(&headers),
            ResponseFormat::Structured
        );
    }

    #[test]
    fn html_accept_stays_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );
        assert_eq!(
            ResponseFormat::from_headers(&headers),
            ResponseFormat::Redirect
        );
    }
}
