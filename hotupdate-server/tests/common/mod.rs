//! Common test utilities shared by the HTTP integration tests.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use hotupdate_server::{build_router, AppState, Config};
use tempfile::TempDir;

/// A running test server with its upload directory.
pub struct TestSetup {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub server: TestServer,
}

/// Creates a server over a fresh upload directory and runs bootstrap, so the
/// `default` app exists.
pub async fn create_test_setup() -> TestSetup {
    create_test_setup_with(|_| {}).await
}

/// Like [`create_test_setup`] but lets the caller adjust the config first.
pub async fn create_test_setup_with(configure: impl FnOnce(&mut Config)) -> TestSetup {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::default();
    config.storage.upload_dir = temp_dir.path().to_path_buf();
    configure(&mut config);

    let state = AppState::new(config);
    state
        .service
        .bootstrap()
        .await
        .expect("bootstrap should succeed");
    state.readiness.mark_ready();

    let server = TestServer::new(build_router(state.clone())).expect("should create test server");
    TestSetup {
        temp_dir,
        state,
        server,
    }
}

/// A package part with the given file name.
pub fn package_part(file_name: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(file_name)
        .mime_type("application/zip")
}

/// Form for `POST /api/apps`.
pub fn create_app_form(id: &str, content: &[u8]) -> MultipartForm {
    MultipartForm::new()
        .add_text("id", id)
        .add_text("name", format!("{id} app"))
        .add_text("description", "created in tests")
        .add_part("initial_file", package_part("update.zip", content))
}

/// Form for `POST /api/apps/{id}/versions`.
pub fn publish_form(version_id: &str, force: bool, content: &[u8]) -> MultipartForm {
    MultipartForm::new()
        .add_text("version_id", version_id)
        .add_text("name", format!("Release {version_id}"))
        .add_text("description", "")
        .add_text("force", if force { "true" } else { "false" })
        .add_part("file", package_part("update.zip", content))
}
