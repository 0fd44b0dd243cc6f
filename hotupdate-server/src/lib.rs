//! # Hot Update Server
//!
//! A multi-app update distribution service. Clients poll it with their
//! current version and receive the next package to install; publishers upload
//! new packages per app.
//!
//! ## Key Modules
//!
//! - [`version`]: dotted version comparison
//! - [`registry`] and [`types`]: JSON-backed app and version registries
//! - [`resolver`]: progressive next-hop selection
//! - [`service`]: app lifecycle, publication and bootstrap
//! - [`storage`]: staging and storing of uploaded packages
//! - [`routes`] and [`server`]: HTTP API
//! - [`config`], [`error`], [`validation`], [`state`]

pub mod config;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;
pub mod version;

// Re-export key types for convenience
pub use config::{Config, ConfigOverrides};
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use resolver::{resolve, NoUpdateReason, UpdateAvailable, UpdateDecision};
pub use server::{build_router, run_server, spawn_bootstrap};
pub use service::{AppService, NewApp, NewVersion};
pub use state::{AppState, Readiness, ReadinessState, SuccessResponse};
pub use types::{App, AppList, Version, VersionList};
pub use validation::DEFAULT_APP_ID;
