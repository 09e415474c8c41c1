//! Media reference management for article images.
//!
//! Handlers only see the [`MediaStore`] trait: upload bytes into a folder and
//! get back a public URL plus an opaque asset reference used for deletion.
//! [`LocalMediaStore`] keeps files on disk and is served under the configured
//! media base URL.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;

use crate::errors::AppError;
use crate::models::StoredImage;

pub const AVATAR_FOLDER: &str = "articles/avatars";
pub const IMAGE_FOLDER: &str = "articles/images";

/// Accepted image MIME types and the file extension stored for each.
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// An image received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Multipart field the image came from
    pub field: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Check type and size before anything is sent to the media store.
    pub fn validate(&self, max_bytes: usize) -> Result<(), AppError> {
        if self.bytes.is_empty() {
            return Err(AppError::Validation(format!("{} file is empty", self.field)));
        }
        if self.bytes.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "{} file exceeds the {} byte limit",
                self.field, max_bytes
            )));
        }
        if extension_for(&self.content_type).is_none() {
            return Err(AppError::Validation(format!(
                "{} must be a JPEG, PNG, GIF or WebP image",
                self.field
            )));
        }
        Ok(())
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Object store for binary assets.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store an image under `folder` and return its public URL and asset reference.
    async fn upload(&self, upload: &ImageUpload, folder: &str) -> Result<StoredImage, AppError>;

    /// Remove a previously uploaded asset.
    async fn delete(&self, asset_ref: &str) -> Result<(), AppError>;
}

/// Filesystem-backed media store.
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    /// Open (creating if needed) a media directory.
    pub async fn open(root: &Path, base_url: &str) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(root).await.map_err(|e| {
            AppError::Upstream(format!(
                "Failed to create media directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an asset reference to a path inside the media root.
    fn resolve(&self, asset_ref: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(asset_ref);
        let safe = !asset_ref.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Validation(format!(
                "Invalid asset reference '{}'",
                asset_ref
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn upload(&self, upload: &ImageUpload, folder: &str) -> Result<StoredImage, AppError> {
        let ext = extension_for(&upload.content_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported image type {}", upload.content_type))
        })?;

        let asset_ref = format!(
            "{}/{}.{}",
            folder.trim_matches('/'),
            uuid::Uuid::new_v4(),
            ext
        );
        let path = self.resolve(&asset_ref)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Upstream(format!("Failed to create media folder {}: {}", folder, e))
            })?;
        }
        tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
            AppError::Upstream(format!("Failed to store {}: {}", asset_ref, e))
        })?;

        tracing::debug!(
            "Stored {} ({} bytes) as {}",
            upload.field,
            upload.bytes.len(),
            asset_ref
        );

        Ok(StoredImage {
            url: format!("{}/{}", self.base_url, asset_ref),
            asset_ref,
        })
    }

    async fn delete(&self, asset_ref: &str) -> Result<(), AppError> {
        let path = self.resolve(asset_ref)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to delete {}: {}", asset_ref, e)))
    }
}

/// Run an external call under a time budget, surfacing expiry as a retryable error.
pub async fn bounded<T, F>(budget: Duration, what: &str, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("{} timed out after {:?}", what, budget);
            Err(AppError::Timeout(format!(
                "{} did not complete in time, please retry",
                what
            )))
        }
    }
}

/// Best-effort asset removal: failures are logged, never returned.
pub async fn discard(store: &dyn MediaStore, asset_ref: &str, budget: Duration) {
    if asset_ref.is_empty() {
        return;
    }
    match bounded(budget, "Media deletion", store.delete(asset_ref)).await {
        Ok(()) => tracing::debug!("Deleted media asset {}", asset_ref),
        Err(e) => tracing::warn!("Failed to delete media asset {}: {}", asset_ref, e),
    }
}
