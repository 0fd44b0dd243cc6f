//! # Application Service
//!
//! Operations behind the HTTP API: app lifecycle, version publication, update
//! checks and the startup bootstrap that provisions built-in apps.
//!
//! Every load-modify-save cycle on a registry runs under a [`WriteLocks`]
//! guard: one key for `apps.json` and one per app for its `versions.json`.
//! When both are needed the apps registry lock is taken first.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::{Config, PredefinedApp};
use crate::error::{AppError, AppResult};
use crate::registry::{Registry, StorageLayout};
use crate::resolver::{self, UpdateDecision};
use crate::storage::{self, StagedPackage};
use crate::types::{now, App, AppList, Version, VersionList};
use crate::validation::{
    validate_new_app_id, validate_package_file_name, validate_path_segment, validate_version_id,
    DEFAULT_APP_ID,
};

const APPS_REGISTRY_KEY: &str = "registry:apps";

/// Keyed table of async mutexes serializing registry rewrites.
#[derive(Debug, Default)]
pub struct WriteLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl WriteLocks {
    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    async fn apps_registry(&self) -> OwnedMutexGuard<()> {
        self.lock(APPS_REGISTRY_KEY).await
    }

    async fn app(&self, app_id: &str) -> OwnedMutexGuard<()> {
        self.lock(&format!("app:{app_id}")).await
    }
}

/// Form input for [`AppService::create_app`].
#[derive(Debug, Default)]
pub struct NewApp {
    pub id: String,
    pub name: String,
    pub description: String,
    pub package: Option<StagedPackage>,
}

/// Form input for [`AppService::publish_version`].
#[derive(Debug, Default)]
pub struct NewVersion {
    pub version_id: String,
    pub name: String,
    pub description: String,
    pub force: bool,
    pub package: Option<StagedPackage>,
}

pub struct AppService {
    layout: StorageLayout,
    config: Arc<Config>,
    locks: WriteLocks,
}

impl AppService {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            layout: StorageLayout::new(config.storage.upload_dir.clone()),
            config,
            locks: WriteLocks::default(),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Registers a new app with its first version.
    ///
    /// The package becomes the configured initial version (`1.0.0` by default).
    pub async fn create_app(&self, request: NewApp) -> AppResult<(App, Version)> {
        let NewApp {
            id,
            name,
            description,
            package,
        } = request;

        validate_new_app_id(&id)?;
        let package = require_package(package, "Initial version file is required")?;

        let _apps_guard = self.locks.apps_registry().await;
        let mut apps = self.layout.load_apps().await?;
        if apps.contains(&id) {
            return Err(AppError::BadRequest(format!("App ID '{id}' already exists")));
        }

        let _app_guard = self.locks.app(&id).await;
        self.layout.create_app_dirs(&id).await?;

        let version_id = self.config.version.initial_version.clone();
        let file_size = package
            .store(&self.layout.package_path(&id, &version_id))
            .await?;
        let initial_version = self.initial_version(&version_id, file_size);

        let mut versions = VersionList::default();
        versions.append(initial_version.clone());
        self.layout.save_versions(&id, &versions).await?;

        let app = App::new(id, name, description);
        apps.append(app.clone());
        self.layout.save_apps(&apps).await?;

        info!(app_id = %app.id, version = %initial_version.id, file_size, "App created");
        Ok((app, initial_version))
    }

    /// Removes an app from the registry. Its files stay on disk.
    pub async fn delete_app(&self, app_id: &str) -> AppResult<()> {
        if app_id == DEFAULT_APP_ID {
            return Err(AppError::BadRequest(
                "The default app cannot be deleted".to_string(),
            ));
        }

        let _apps_guard = self.locks.apps_registry().await;
        let mut apps = self.layout.load_apps().await?;
        if apps.remove(app_id).is_none() {
            return Err(app_not_found(app_id));
        }
        self.layout.save_apps(&apps).await?;

        info!(app_id = %app_id, "App deleted");
        Ok(())
    }

    /// Stores a package and appends a version record for it.
    ///
    /// A version id that already exists is appended again and its package file
    /// replaced, unless `version.rejectDuplicates` is configured.
    pub async fn publish_version(&self, app_id: &str, request: NewVersion) -> AppResult<Version> {
        self.require_app(app_id).await?;

        let NewVersion {
            version_id,
            name,
            description,
            force,
            package,
        } = request;

        validate_version_id(&version_id)?;
        let package = require_package(package, "Version file is required")?;

        let _app_guard = self.locks.app(app_id).await;
        let mut versions = self.layout.load_versions(app_id).await?;
        if versions.contains(&version_id) {
            if self.config.version.reject_duplicates {
                return Err(AppError::BadRequest(format!(
                    "Version '{version_id}' already exists"
                )));
            }
            warn!(app_id = %app_id, version = %version_id, "Publishing duplicate version id");
        }

        let file_size = package
            .store(&self.layout.package_path(app_id, &version_id))
            .await?;

        let version = Version {
            file_path: StorageLayout::relative_package_path(&version_id),
            id: version_id,
            name,
            description,
            file_size,
            created_at: now(),
            force,
        };
        versions.append(version.clone());
        self.layout.save_versions(app_id, &versions).await?;

        info!(app_id = %app_id, version = %version.id, force, file_size, "Version published");
        Ok(version)
    }

    /// Ensures the built-in `default` app and every app declared in the config
    /// exist and have at least one version. Safe to run repeatedly.
    pub async fn bootstrap(&self) -> AppResult<()> {
        let default_app = PredefinedApp {
            id: DEFAULT_APP_ID.to_string(),
            name: "Default app".to_string(),
            description: "Built-in default application".to_string(),
        };

        self.ensure_app(&default_app).await?;

        for app in &self.config.apps {
            if app.id == DEFAULT_APP_ID {
                continue;
            }
            if let Err(e) = validate_new_app_id(&app.id) {
                warn!(app_id = %app.id, error = %e, "Skipping invalid predefined app");
                continue;
            }
            self.ensure_app(app).await?;
        }

        info!("Bootstrap complete");
        Ok(())
    }

    async fn ensure_app(&self, predefined: &PredefinedApp) -> AppResult<()> {
        let app_id = predefined.id.as_str();
        {
            let _apps_guard = self.locks.apps_registry().await;
            let mut apps = self.layout.load_apps().await?;
            if apps.contains(app_id) {
                debug!(app_id = %app_id, "App already registered");
            } else {
                let name = if predefined.name.is_empty() {
                    app_id
                } else {
                    predefined.name.as_str()
                };
                apps.append(App::new(app_id, name, predefined.description.as_str()));
                self.layout.save_apps(&apps).await?;
                info!(app_id = %app_id, "Registered app");
            }
        }

        let _app_guard = self.locks.app(app_id).await;
        self.layout.create_app_dirs(app_id).await?;

        let mut versions = self.layout.load_versions(app_id).await?;
        if !versions.is_empty() {
            return Ok(());
        }

        let version_id = self.config.version.initial_version.clone();
        let file_size =
            storage::ensure_placeholder(&self.layout.package_path(app_id, &version_id)).await?;
        versions.append(self.initial_version(&version_id, file_size));
        self.layout.save_versions(app_id, &versions).await?;

        info!(app_id = %app_id, version = %version_id, "Created initial version");
        Ok(())
    }

    pub async fn list_apps(&self) -> AppResult<AppList> {
        self.layout.load_apps().await
    }

    /// An app together with its version list.
    pub async fn get_app(&self, app_id: &str) -> AppResult<(App, VersionList)> {
        let app = self.require_app(app_id).await?;
        let versions = self.layout.load_versions(app_id).await?;
        Ok((app, versions))
    }

    pub async fn list_versions(&self, app_id: &str) -> AppResult<VersionList> {
        self.require_app(app_id).await?;
        self.layout.load_versions(app_id).await
    }

    /// Resolves the next update for a client reporting `current`.
    pub async fn check_update(&self, app_id: &str, current: &str) -> AppResult<UpdateDecision> {
        self.require_app(app_id).await?;
        if current.is_empty() {
            return Err(AppError::BadRequest(
                "Missing version parameter".to_string(),
            ));
        }

        let versions = self.layout.load_versions(app_id).await?;
        let decision = resolver::resolve(app_id, current, &versions);
        debug!(app_id = %app_id, current = %current, has_update = decision.has_update(), "Update check");
        Ok(decision)
    }

    /// Location of a downloadable file inside a version directory.
    pub async fn package_path(
        &self,
        app_id: &str,
        version_id: &str,
        file_name: &str,
    ) -> AppResult<PathBuf> {
        self.require_app(app_id).await?;
        validate_path_segment(version_id, "Version")?;
        validate_path_segment(file_name, "File name")?;
        Ok(self.layout.version_file(app_id, version_id, file_name))
    }

    async fn require_app(&self, app_id: &str) -> AppResult<App> {
        let apps = self.layout.load_apps().await?;
        apps.find(app_id).cloned().ok_or_else(|| app_not_found(app_id))
    }

    fn initial_version(&self, version_id: &str, file_size: u64) -> Version {
        Version {
            id: version_id.to_string(),
            name: self.config.version.initial_version_name.clone(),
            description: self.config.version.initial_version_description.clone(),
            file_path: StorageLayout::relative_package_path(version_id),
            file_size,
            created_at: now(),
            force: false,
        }
    }
}

fn app_not_found(app_id: &str) -> AppError {
    AppError::NotFound(format!("App not found: {app_id}"))
}

/// Checks that a package was uploaded and carries the `.zip` extension.
fn require_package(package: Option<StagedPackage>, missing: &str) -> AppResult<StagedPackage> {
    let package = package
        .filter(|p| !p.file_name().is_empty())
        .ok_or_else(|| AppError::BadRequest(missing.to_string()))?;
    validate_package_file_name(package.file_name())?;
    Ok(package)
}
