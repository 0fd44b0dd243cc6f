//! Input validation for identifiers and uploaded files.
//!
//! App ids, version ids and download file names all become path components
//! under the upload directory, so every one of them goes through
//! [`validate_path_segment`] before it touches the filesystem.

use crate::error::{AppError, AppResult};

/// App ids that collide with routes and cannot be created.
pub const RESERVED_APP_IDS: &[&str] = &["apps", "api", "admin", "static"];

/// Id of the built-in app that always exists and can never be deleted.
pub const DEFAULT_APP_ID: &str = "default";

/// Only packages with this extension are accepted.
pub const PACKAGE_EXTENSION: &str = ".zip";

const MAX_SEGMENT_LENGTH: usize = 255;

/// Validates a single path component such as an app id, version id or file name.
///
/// Rejects empty values, parent directory references, separators, null bytes,
/// control characters and overlong names. `what` names the value in the error
/// message.
pub fn validate_path_segment(value: &str, what: &str) -> AppResult<()> {
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{what} cannot be empty")));
    }

    if value.len() > MAX_SEGMENT_LENGTH {
        tracing::warn!(value = %value, length = value.len(), "Path segment too long");
        return Err(AppError::BadRequest(format!(
            "{what} too long: {} characters (max: {MAX_SEGMENT_LENGTH})",
            value.len()
        )));
    }

    if value.contains('\0') {
        tracing::warn!(value = %value.escape_debug(), "Null byte detected in path segment");
        return Err(AppError::BadRequest(format!("{what} contains null byte")));
    }

    if value.chars().any(|c| c.is_control()) {
        tracing::warn!(value = %value.escape_debug(), "Control character detected in path segment");
        return Err(AppError::BadRequest(format!(
            "{what} contains control characters"
        )));
    }

    if value.contains("..") {
        tracing::warn!(value = %value, "Path traversal attempt detected (..)");
        return Err(AppError::BadRequest(format!(
            "{what} contains parent directory reference (..)"
        )));
    }

    if value.contains('/') || value.contains('\\') {
        tracing::warn!(value = %value, "Path separator detected in path segment");
        return Err(AppError::BadRequest(format!(
            "{what} cannot contain path separators"
        )));
    }

    if value == "." {
        return Err(AppError::BadRequest(format!("{what} cannot be '.'")));
    }

    Ok(())
}

/// Validates an id for a new app: non-empty, not reserved, path-safe.
pub fn validate_new_app_id(id: &str) -> AppResult<()> {
    if id.is_empty() {
        return Err(AppError::BadRequest("App ID cannot be empty".to_string()));
    }

    if RESERVED_APP_IDS.contains(&id) {
        return Err(AppError::BadRequest(format!(
            "App ID '{id}' is reserved"
        )));
    }

    validate_path_segment(id, "App ID")
}

/// Validates a version id for publication.
pub fn validate_version_id(id: &str) -> AppResult<()> {
    if id.is_empty() {
        return Err(AppError::BadRequest("Version ID cannot be empty".to_string()));
    }
    validate_path_segment(id, "Version ID")
}

/// Checks that an uploaded file name carries the package extension.
///
/// Only the name is inspected; the content is not validated as an archive.
pub fn validate_package_file_name(file_name: &str) -> AppResult<()> {
    if !file_name
        .to_ascii_lowercase()
        .ends_with(PACKAGE_EXTENSION)
    {
        tracing::warn!(file_name = %file_name, "Rejected package with invalid extension");
        return Err(AppError::BadRequest(format!(
            "Only {PACKAGE_EXTENSION} files are accepted"
        )));
    }
    Ok(())
}
