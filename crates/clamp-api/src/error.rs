//! Handler-boundary error type
//!
//! Every foreseeable failure is converted into one of these variants at
//! the operation boundary and rendered by the dual-format responder;
//! nothing propagates to the caller as a raw fault.

use axum::http::StatusCode;
use clamp_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Upload error: {0}")]
    Upload(#[from] axum::extract::multipart::MultipartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Cannot delete clamp: there are appeals linked to this record. Delete appeals first.")]
    AppealsLinked,

    #[error("Please select a clamp record for the appeal.")]
    MissingClampSelection,

    #[error("Invalid clamp id.")]
    InvalidClampId,

    #[error("Selected clamp record not found.")]
    ClampMissing,

    #[error("Appeal reason is required.")]
    MissingAppealReason,

    #[error("Username and password required")]
    MissingCredentials,

    #[error("User already exists")]
    DuplicateUsername,

    #[error("Cannot delete default admin")]
    ProtectedAccount,
}

impl ApiError {
    /// Status for the structured (JSON) response path. Missing entities
    /// are 404; everything else reported here is a caller error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
