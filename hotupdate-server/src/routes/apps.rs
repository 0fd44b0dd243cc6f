//! App management: `/api/apps` and `/api/apps/{app_id}`.

use axum::{
    extract::{Multipart, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::UploadForm;
use crate::error::AppResult;
use crate::service::NewApp;
use crate::state::{AppState, SuccessResponse};
use crate::types::{App, AppList, Version, VersionList};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/apps", get(list_apps).post(create_app))
        .route("/api/apps/{app_id}", get(get_app).delete(delete_app))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppResponse {
    pub message: String,
    pub app: App,
    pub initial_version: Version,
}

#[derive(Serialize)]
pub struct AppDetails {
    pub app: App,
    pub versions: VersionList,
}

/// Creates an app from the multipart fields `id`, `name`, `description` and
/// the package file `initial_file`.
async fn create_app(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<CreateAppResponse>> {
    let staging_dir = state.service.layout().staging_dir();
    let mut form = UploadForm::read(multipart, "initial_file", &staging_dir).await?;

    let request = NewApp {
        id: form.text("id"),
        name: form.text("name"),
        description: form.text("description"),
        package: form.take_package(),
    };
    info!(app_id = %request.id, "Creating app");

    let (app, initial_version) = state.service.create_app(request).await?;
    Ok(Json(CreateAppResponse {
        message: "App created successfully".to_string(),
        app,
        initial_version,
    }))
}

async fn list_apps(State(state): State<AppState>) -> AppResult<Json<AppList>> {
    Ok(Json(state.service.list_apps().await?))
}

async fn get_app(
    Path(app_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<AppDetails>> {
    let (app, versions) = state.service.get_app(&app_id).await?;
    Ok(Json(AppDetails { app, versions }))
}

async fn delete_app(
    Path(app_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse>> {
    state.service.delete_app(&app_id).await?;
    Ok(Json(SuccessResponse {
        message: "App deleted successfully".to_string(),
    }))
}
