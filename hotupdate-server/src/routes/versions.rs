//! Version publication and listing.

use axum::{
    extract::{Multipart, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::UploadForm;
use crate::error::AppResult;
use crate::service::NewVersion;
use crate::state::AppState;
use crate::types::{Version, VersionList};
use crate::validation::DEFAULT_APP_ID;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/apps/{app_id}/versions",
            get(list_versions).post(publish_version),
        )
        .route(
            "/api/versions",
            get(list_default_versions).post(publish_default_version),
        )
}

#[derive(Serialize)]
pub struct PublishResponse {
    pub message: String,
    pub version: Version,
}

/// Publishes a version from the multipart fields `version_id`, `name`,
/// `description`, `force` and the package file `file`.
async fn publish_version(
    Path(app_id): Path<String>,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<PublishResponse>> {
    let staging_dir = state.service.layout().staging_dir();
    let mut form = UploadForm::read(multipart, "file", &staging_dir).await?;

    let request = NewVersion {
        version_id: form.text("version_id"),
        name: form.text("name"),
        description: form.text("description"),
        force: form.flag("force"),
        package: form.take_package(),
    };
    info!(app_id = %app_id, version = %request.version_id, force = request.force, "Publishing version");

    let version = state.service.publish_version(&app_id, request).await?;
    Ok(Json(PublishResponse {
        message: "Version created successfully".to_string(),
        version,
    }))
}

async fn list_versions(
    Path(app_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<VersionList>> {
    Ok(Json(state.service.list_versions(&app_id).await?))
}

async fn publish_default_version(
    state: State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<PublishResponse>> {
    publish_version(Path(DEFAULT_APP_ID.to_string()), state, multipart).await
}

async fn list_default_versions(state: State<AppState>) -> AppResult<Json<VersionList>> {
    list_versions(Path(DEFAULT_APP_ID.to_string()), state).await
}
