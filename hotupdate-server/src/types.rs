//! # Registry Data Model
//!
//! Records persisted in the JSON registries. Field names and order match the
//! documents written by existing deployments:
//!
//! - `apps.json`: `{"apps": [App, ...]}`
//! - `apps/{id}/versions.json`: `{"versions": [Version, ...], "latestVersion": "..."}`
//!
//! Timestamps carry their UTC offset so files written in any timezone load
//! back unchanged.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp type stored in the registries.
pub type Timestamp = DateTime<FixedOffset>;

/// Current local time with its offset.
pub fn now() -> Timestamp {
    Local::now().fixed_offset()
}

/// An application with its own version history and package store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl App {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// All registered apps in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub apps: Vec<App>,
}

/// One published release of an app's update package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Package location relative to the app directory.
    pub file_path: String,
    pub file_size: u64,
    pub created_at: Timestamp,
    pub force: bool,
}

/// Versions of one app in publication order.
///
/// `latest_version` names the most recently appended version, which is not
/// necessarily the numerically highest one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub latest_version: String,
}

impl VersionList {
    /// The last published version.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Older writers emitted `null` for empty arrays.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_list_reads_existing_document() {
        let json = r#"{
  "versions": [
    {
      "id": "1.0.0",
      "name": "Initial",
      "description": "first",
      "filePath": "versions/1.0.0/update.zip",
      "fileSize": 42,
      "createdAt": "2024-03-01T10:20:30.123456789+08:00",
      "force": false
    }
  ],
  "latestVersion": "1.0.0"
}"#;
        let list: VersionList = serde_json::from_str(json).unwrap();
        assert_eq!(list.versions.len(), 1);
        assert_eq!(list.latest_version, "1.0.0");
        assert_eq!(list.versions[0].file_size, 42);
        assert_eq!(list.versions[0].created_at.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_null_arrays_load_as_empty() {
        let apps: AppList = serde_json::from_str(r#"{"apps": null}"#).unwrap();
        assert!(apps.apps.is_empty());

        let versions: VersionList =
            serde_json::from_str(r#"{"versions": null, "latestVersion": ""}"#).unwrap();
        assert!(versions.is_empty());
        assert!(versions.latest().is_none());
    }

    #[test]
    fn test_app_field_names() {
        let app = App::new("game", "Game", "A game");
        let value = serde_json::to_value(&app).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        for key in ["id", "name", "description", "createdAt", "updatedAt"] {
            assert!(keys.contains(&key), "missing key {key}");
        }
        assert_eq!(object.len(), 5);
    }
}
