//! Package file storage.
//!
//! Uploads are streamed into a staging file under the upload directory and
//! only moved into `apps/{id}/versions/{version}/update.zip` once the request
//! has been validated. A [`StagedPackage`] that is dropped without being
//! stored deletes its staging file.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// An uploaded package waiting in the staging directory.
#[derive(Debug)]
pub struct StagedPackage {
    path: PathBuf,
    file_name: String,
    size: u64,
}

impl StagedPackage {
    /// Client-supplied file name of the upload.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Streams a multipart file field to a new staging file.
    ///
    /// An interrupted upload leaves no staging file behind; the partial file is
    /// removed before the error is returned.
    pub async fn from_field(staging_dir: &Path, mut field: Field<'_>) -> AppResult<Self> {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let (path, mut file) = create_staging_file(staging_dir).await?;
        let mut staged = Self {
            path,
            file_name,
            size: 0,
        };

        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            staged.size += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            file_name = %staged.file_name,
            size = staged.size,
            path = %staged.path.display(),
            "Upload staged"
        );
        Ok(staged)
    }

    /// Writes in-memory content to a new staging file.
    pub async fn from_bytes(
        staging_dir: &Path,
        file_name: impl Into<String>,
        content: &[u8],
    ) -> AppResult<Self> {
        let (path, mut file) = create_staging_file(staging_dir).await?;
        let staged = Self {
            path,
            file_name: file_name.into(),
            size: content.len() as u64,
        };
        file.write_all(content).await?;
        file.flush().await?;
        Ok(staged)
    }

    /// Moves the staged file to `destination`, creating parent directories and
    /// replacing any existing file. Returns the stored size in bytes.
    pub async fn store(self, destination: &Path) -> AppResult<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage(format!("creating {}", parent.display()), e))?;
        }

        fs::rename(&self.path, destination).await.map_err(|e| {
            AppError::storage(format!("moving package to {}", destination.display()), e)
        })?;

        let size = fs::metadata(destination).await?.len();
        info!(path = %destination.display(), size, "Package stored");
        Ok(size)
    }
}

impl Drop for StagedPackage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Discarded staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to discard staged upload"),
        }
    }
}

async fn create_staging_file(staging_dir: &Path) -> AppResult<(PathBuf, fs::File)> {
    fs::create_dir_all(staging_dir)
        .await
        .map_err(|e| AppError::storage(format!("creating {}", staging_dir.display()), e))?;

    let path = staging_dir.join(format!("{}.part", uuid::Uuid::new_v4()));
    let file = fs::File::create(&path)
        .await
        .map_err(|e| AppError::storage(format!("creating {}", path.display()), e))?;
    Ok((path, file))
}

/// Creates an empty package file unless one already exists. Returns its size.
pub async fn ensure_placeholder(path: &Path) -> AppResult<u64> {
    if let Ok(metadata) = fs::metadata(path).await {
        debug!(path = %path.display(), "Package already present, keeping it");
        return Ok(metadata.len());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::storage(format!("creating {}", parent.display()), e))?;
    }
    fs::write(path, b"")
        .await
        .map_err(|e| AppError::storage(format!("creating {}", path.display()), e))?;
    info!(path = %path.display(), "Created empty placeholder package");
    Ok(0)
}

/// Reads a stored file, mapping a missing file to `NotFound`.
pub async fn read_file(path: &Path) -> AppResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "File not found");
            Err(AppError::NotFound("File not found".to_string()))
        }
        Err(e) => Err(AppError::storage(format!("reading {}", path.display()), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_moves_staged_file() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_dir.path().join(".staging");
        let staged = StagedPackage::from_bytes(&staging, "update.zip", b"payload")
            .await
            .unwrap();
        let staged_path = staged.path().to_path_buf();
        assert_eq!(staged.size(), 7);
        assert_eq!(staged.file_name(), "update.zip");

        let destination = temp_dir.path().join("apps/game/versions/1.0.0/update.zip");
        let size = staged.store(&destination).await.unwrap();

        assert_eq!(size, 7);
        assert_eq!(std::fs::read(&destination).unwrap(), b"payload");
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn test_dropped_staged_file_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let staged = StagedPackage::from_bytes(temp_dir.path(), "x.zip", b"data")
            .await
            .unwrap();
        let staged_path = staged.path().to_path_buf();
        assert!(staged_path.exists());

        drop(staged);
        assert!(!staged_path.exists());
    }

    #[tokio::test]
    async fn test_placeholder_keeps_existing_package() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("versions/1.0.0/update.zip");

        assert_eq!(ensure_placeholder(&path).await.unwrap(), 0);
        assert!(path.exists());

        std::fs::write(&path, b"real package").unwrap();
        assert_eq!(ensure_placeholder(&path).await.unwrap(), 12);
        assert_eq!(std::fs::read(&path).unwrap(), b"real package");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_file(&temp_dir.path().join("missing.zip")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
