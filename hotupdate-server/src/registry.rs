//! # JSON Registry Store
//!
//! Loading, saving and editing of the two JSON registries, plus the on-disk
//! layout they live in:
//!
//! ```text
//! {upload_dir}/apps.json                                   AppList
//! {upload_dir}/apps/{app_id}/versions.json                 VersionList
//! {upload_dir}/apps/{app_id}/versions/{version_id}/update.zip
//! ```
//!
//! A registry file that does not exist yet loads as an empty collection, so a
//! fresh upload directory needs no preparation. Saves replace the whole
//! document. Callers that load, modify and save must serialize those cycles
//! themselves (see [`crate::service::WriteLocks`]).

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::types::{App, AppList, Version, VersionList};

/// File name of every stored package.
pub const PACKAGE_FILE_NAME: &str = "update.zip";

/// A registry entry addressed by its id.
pub trait Record {
    fn id(&self) -> &str;
}

impl Record for App {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Version {
    fn id(&self) -> &str {
        &self.id
    }
}

/// An ordered, JSON-persisted collection of [`Record`]s.
pub trait Registry: Default + Serialize + DeserializeOwned {
    type Entry: Record;

    fn entries(&self) -> &[Self::Entry];

    fn entries_mut(&mut self) -> &mut Vec<Self::Entry>;

    /// Appends an entry at the end of the collection.
    fn append(&mut self, entry: Self::Entry) {
        self.entries_mut().push(entry);
    }

    /// First entry with the given id.
    fn find(&self, id: &str) -> Option<&Self::Entry> {
        self.entries().iter().find(|entry| entry.id() == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Replaces the entry with the same id in place, or appends it.
    fn upsert(&mut self, entry: Self::Entry) {
        let position = self.entries().iter().position(|e| e.id() == entry.id());
        match position {
            Some(index) => self.entries_mut()[index] = entry,
            None => self.append(entry),
        }
    }

    /// Removes the first entry with the given id and returns it.
    fn remove(&mut self, id: &str) -> Option<Self::Entry> {
        let index = self.entries().iter().position(|e| e.id() == id)?;
        Some(self.entries_mut().remove(index))
    }
}

impl Registry for AppList {
    type Entry = App;

    fn entries(&self) -> &[App] {
        &self.apps
    }

    fn entries_mut(&mut self) -> &mut Vec<App> {
        &mut self.apps
    }
}

impl Registry for VersionList {
    type Entry = Version;

    fn entries(&self) -> &[Version] {
        &self.versions
    }

    fn entries_mut(&mut self) -> &mut Vec<Version> {
        &mut self.versions
    }

    /// Appending also moves `latest_version` to the new entry.
    fn append(&mut self, entry: Version) {
        self.latest_version = entry.id.clone();
        self.versions.push(entry);
    }
}

/// Loads a registry document, returning an empty collection when the file is absent.
pub async fn load<R: Registry>(path: &Path) -> AppResult<R> {
    let content = match fs::read(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Registry file absent, starting empty");
            return Ok(R::default());
        }
        Err(e) => return Err(AppError::storage(format!("reading {}", path.display()), e)),
    };

    serde_json::from_slice(&content)
        .map_err(|e| AppError::storage(format!("parsing {}", path.display()), e))
}

/// Serializes a registry document with stable field order and two-space indentation.
pub fn to_json<R: Registry>(registry: &R) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(registry)?)
}

/// Overwrites a registry document in full.
///
/// The document is written to a sibling temporary file first and renamed over
/// the target, so readers never observe a half-written registry.
pub async fn save<R: Registry>(path: &Path, registry: &R) -> AppResult<()> {
    let content = to_json(registry)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::storage(format!("creating {}", parent.display()), e))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content.as_bytes())
        .await
        .map_err(|e| AppError::storage(format!("writing {}", tmp_path.display()), e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AppError::storage(format!("replacing {}", path.display()), e))?;

    info!(path = %path.display(), entries = registry.entries().len(), "Registry saved");
    Ok(())
}

/// Derives every registry and package path from the upload directory.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    upload_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn apps_json(&self) -> PathBuf {
        self.upload_dir.join("apps.json")
    }

    pub fn app_dir(&self, app_id: &str) -> PathBuf {
        self.upload_dir.join("apps").join(app_id)
    }

    pub fn versions_json(&self, app_id: &str) -> PathBuf {
        self.app_dir(app_id).join("versions.json")
    }

    pub fn versions_dir(&self, app_id: &str) -> PathBuf {
        self.app_dir(app_id).join("versions")
    }

    pub fn version_dir(&self, app_id: &str, version_id: &str) -> PathBuf {
        self.versions_dir(app_id).join(version_id)
    }

    /// Absolute location of a file inside a version directory.
    pub fn version_file(&self, app_id: &str, version_id: &str, file_name: &str) -> PathBuf {
        self.version_dir(app_id, version_id).join(file_name)
    }

    pub fn package_path(&self, app_id: &str, version_id: &str) -> PathBuf {
        self.version_file(app_id, version_id, PACKAGE_FILE_NAME)
    }

    /// Package location as recorded in `Version::file_path`.
    pub fn relative_package_path(version_id: &str) -> String {
        Path::new("versions")
            .join(version_id)
            .join(PACKAGE_FILE_NAME)
            .to_string_lossy()
            .into_owned()
    }

    /// Directory for uploads that have not been assigned to a version yet.
    pub fn staging_dir(&self) -> PathBuf {
        self.upload_dir.join(".staging")
    }

    /// Creates the app directory and its `versions` subdirectory.
    pub async fn create_app_dirs(&self, app_id: &str) -> AppResult<()> {
        let versions_dir = self.versions_dir(app_id);
        fs::create_dir_all(&versions_dir)
            .await
            .map_err(|e| AppError::storage(format!("creating {}", versions_dir.display()), e))?;
        debug!(app_id = %app_id, dir = %versions_dir.display(), "App directories ready");
        Ok(())
    }

    pub async fn load_apps(&self) -> AppResult<AppList> {
        load(&self.apps_json()).await
    }

    pub async fn save_apps(&self, apps: &AppList) -> AppResult<()> {
        save(&self.apps_json(), apps).await
    }

    pub async fn load_versions(&self, app_id: &str) -> AppResult<VersionList> {
        load(&self.versions_json(app_id)).await
    }

    pub async fn save_versions(&self, app_id: &str, versions: &VersionList) -> AppResult<()> {
        save(&self.versions_json(app_id), versions).await
    }
}
