//! HTTP routes. Each submodule contributes a `routes()` router that
//! [`crate::server::build_router`] merges.
//!
//! Handlers bound to the built-in `default` app under the older `/api/versions`,
//! `/api/check` and `/api/download` paths are thin wrappers around the
//! app-scoped handlers.

pub mod apps;
pub mod health;
pub mod updates;
pub mod versions;

use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;
use tracing::debug;

use crate::error::AppResult;
use crate::storage::StagedPackage;

/// A parsed multipart upload: text fields plus at most one staged file.
pub(crate) struct UploadForm {
    fields: HashMap<String, String>,
    package: Option<StagedPackage>,
}

impl UploadForm {
    /// Reads every field, streaming the one named `file_field` to the staging
    /// directory. A part named `file_field` without a file name is ignored.
    pub(crate) async fn read(
        mut multipart: Multipart,
        file_field: &str,
        staging_dir: &Path,
    ) -> AppResult<Self> {
        let mut fields = HashMap::new();
        let mut package = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            if name == file_field {
                if field.file_name().is_none() {
                    debug!(field_name = %name, "File field without file name, skipping");
                    continue;
                }
                package = Some(StagedPackage::from_field(staging_dir, field).await?);
            } else {
                let value = field.text().await?;
                debug!(field_name = %name, size = value.len(), "Processed form field");
                fields.insert(name, value);
            }
        }

        Ok(Self { fields, package })
    }

    /// Value of a text field, empty when absent.
    pub(crate) fn text(&mut self, name: &str) -> String {
        self.fields.remove(name).unwrap_or_default()
    }

    /// Checkbox-style flag: `true`, `1` or `on`.
    pub(crate) fn flag(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("on")
        })
    }

    pub(crate) fn take_package(&mut self) -> Option<StagedPackage> {
        self.package.take()
    }
}
