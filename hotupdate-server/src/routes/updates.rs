//! Update checks and package downloads.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::resolver::{UpdateAvailable, UpdateDecision};
use crate::state::AppState;
use crate::storage;
use crate::validation::DEFAULT_APP_ID;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/apps/{app_id}/check", get(check_update))
        .route(
            "/api/apps/{app_id}/download/{version}/{filename}",
            get(download_file),
        )
        .route("/api/check", get(check_default_update))
        .route(
            "/api/download/{version}/{filename}",
            get(download_default_file),
        )
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub version: Option<String>,
}

/// Body of the check endpoint.
///
/// With an update: `hasUpdate`, `isProgressive` and the fields of
/// [`UpdateAvailable`]. Without: `hasUpdate` and `message`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub has_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_progressive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub update: Option<UpdateAvailable>,
}

impl From<UpdateDecision> for CheckResponse {
    fn from(decision: UpdateDecision) -> Self {
        match decision {
            UpdateDecision::Available(update) => Self {
                has_update: true,
                is_progressive: Some(true),
                message: None,
                update: Some(update),
            },
            UpdateDecision::NoUpdate { reason } => Self {
                has_update: false,
                is_progressive: None,
                message: Some(reason.message().to_string()),
                update: None,
            },
        }
    }
}

async fn check_update(
    Path(app_id): Path<String>,
    Query(query): Query<CheckQuery>,
    State(state): State<AppState>,
) -> AppResult<Json<CheckResponse>> {
    let current = query.version.unwrap_or_default();
    let decision = state.service.check_update(&app_id, &current).await?;
    Ok(Json(CheckResponse::from(decision)))
}

/// Serves a file from a version directory as an attachment.
async fn download_file(
    Path((app_id, version, filename)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let path = state
        .service
        .package_path(&app_id, &version, &filename)
        .await?;

    let data = storage::read_file(&path).await?;
    info!(app_id = %app_id, version = %version, filename = %filename, size = data.len(), "Serving package");

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={filename}"),
        ),
        (
            HeaderName::from_static("content-description"),
            "File Transfer".to_string(),
        ),
        (
            HeaderName::from_static("content-transfer-encoding"),
            "binary".to_string(),
        ),
    ];
    debug!(path = %path.display(), "Download headers prepared");
    Ok((headers, data).into_response())
}

async fn check_default_update(
    query: Query<CheckQuery>,
    state: State<AppState>,
) -> AppResult<Json<CheckResponse>> {
    check_update(Path(DEFAULT_APP_ID.to_string()), query, state).await
}

async fn download_default_file(
    Path((version, filename)): Path<(String, String)>,
    state: State<AppState>,
) -> AppResult<Response> {
    download_file(
        Path((DEFAULT_APP_ID.to_string(), version, filename)),
        state,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoUpdateReason;

    #[test]
    fn test_no_update_body() {
        let body = CheckResponse::from(UpdateDecision::NoUpdate {
            reason: NoUpdateReason::AlreadyCurrent,
        });
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["hasUpdate"], false);
        assert_eq!(value["message"], NoUpdateReason::AlreadyCurrent.message());
        assert!(value.get("isProgressive").is_none());
        assert!(value.get("nextVersion").is_none());
    }
}
