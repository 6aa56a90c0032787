//! Clamp Incident Register domain library
//!
//! This crate provides the domain types and validation rules for the
//! clamp record keeping application: payment and appeal status
//! enumerations, strict form-field parsing, upload filename handling,
//! and the password hashing capability used by the account layer.

pub mod forms;
pub mod model;
pub mod password;
pub mod upload;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),

    #[error("Unknown payment status '{0}'")]
    InvalidPaymentStatus(String),

    #[error("Unknown appeal status '{0}'")]
    InvalidAppealStatus(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

pub use forms::ClampForm;
pub use model::{AppealStatus, PaymentStatus};
pub use password::{Argon2Scheme, PasswordScheme};
pub use upload::{best_effort_remove, sanitize_filename, unique_upload_name, CleanupOutcome};
