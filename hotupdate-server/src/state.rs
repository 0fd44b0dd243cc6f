//! # Application State
//!
//! Shared state handed to every request handler, plus the readiness flag that
//! bootstrap flips once the built-in apps exist.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::service::AppService;

/// Startup lifecycle of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    Initializing,
    Ready,
}

/// Atomic `Initializing -> Ready` switch. Never goes back.
#[derive(Debug, Default)]
pub struct Readiness {
    state: AtomicU8,
}

const INITIALIZING: u8 = 0;
const READY: u8 = 1;

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.state.store(READY, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    pub fn state(&self) -> ReadinessState {
        if self.is_ready() {
            ReadinessState::Ready
        } else {
            ReadinessState::Initializing
        }
    }
}

/// State shared across handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    pub config: Arc<Config>,
    pub readiness: Arc<Readiness>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            service: Arc::new(AppService::new(Arc::clone(&config))),
            config,
            readiness: Arc::new(Readiness::new()),
        }
    }
}

/// Body of responses that only carry a message.
///
/// Serializes to: `{"message": "App deleted successfully"}`
#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}
