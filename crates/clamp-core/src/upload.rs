//! Attachment filename handling and best-effort cleanup
//!
//! Uploaded files are stored under a fixed subtree with a
//! collision-resistant name: the sanitised original name prefixed with
//! a high-resolution UTC timestamp. Only the relative path below the
//! static root is ever persisted.

use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

/// Relative subtree (below the static root) where uploads live.
pub const UPLOAD_SUBDIR: &str = "images/uploads";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%f";

/// Reduce an untrusted client filename to a safe basename.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` are replaced
/// with underscores; leading dots are stripped so the result can never
/// be hidden or traverse upward.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim_start_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Collision-resistant stored name for an uploaded file.
pub fn unique_upload_name(original: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}",
        now.format(TIMESTAMP_FORMAT),
        sanitize_filename(original)
    )
}

/// Outcome of a cleanup attempt that is allowed to fail.
///
/// Removing a superseded attachment must never block the mutation that
/// replaced it; callers log the failure and move on.
#[must_use]
#[derive(Debug)]
pub enum CleanupOutcome {
    Removed,
    Missing,
    Failed(io::Error),
}

impl CleanupOutcome {
    pub fn warn_if_failed(&self, context: &str) {
        if let CleanupOutcome::Failed(err) = self {
            tracing::warn!("{context}: cleanup failed: {err}");
        }
    }
}

/// Delete a file if it exists, reporting but never propagating failure.
pub fn best_effort_remove(path: &Path) -> CleanupOutcome {
    if !path.exists() {
        return CleanupOutcome::Missing;
    }
    match std::fs::remove_file(path) {
        Ok(()) => CleanupOutcome::Removed,
        Err(err) => CleanupOutcome::Failed(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("dir\\photo.jpg"), "photo.jpg");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("..."), "upload");
    }

    #[test]
    fn upload_names_are_distinct_per_instant() {
        let t1 = Utc.with_ymd_and_hms(2025, 11, 27, 12, 0, 0).unwrap();
        let t2 = t1 + chrono::Duration::microseconds(1);
        let a = unique_upload_name("photo.jpg", t1);
        let b = unique_upload_name("photo.jpg", t2);
        assert_ne!(a, b);
        assert!(a.ends_with("_photo.jpg"));
        assert!(b.ends_with("_photo.jpg"));
    }

    #[test]
    fn best_effort_remove_tolerates_missing() {
        let outcome = best_effort_remove(Path::new("definitely/not/here.jpg"));
        assert!(matches!(outcome, CleanupOutcome::Missing));
        outcome.warn_if_failed("test");
    }

    #[test]
    fn best_effort_remove_deletes_existing() {
        let dir = std::env::temp_dir().join("clamp-core-upload-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("victim.txt");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(best_effort_remove(&path), CleanupOutcome::Removed));
        assert!(!path.exists());
    }
}
