use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus bootstrap progress. Always 200; `ready` flips once the
/// built-in apps are provisioned.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "ready": state.readiness.is_ready(),
        "state": state.readiness.state(),
        "service": "hotupdate-server",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Local::now().to_rfc3339(),
    }))
}
