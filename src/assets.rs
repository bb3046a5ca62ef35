//! Asset store: validated image uploads for listing media.
//! The local implementation writes under the media root and serves receipts
//! with `/media/...` public URLs; a CDN-backed implementation would slot in
//! behind the same trait.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

// content type -> file extension
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

#[derive(Debug, Clone, Serialize)]
pub struct StoredAsset {
    pub id: String,
    pub public_url: String,
    pub content_type: String,
    pub size: u64,
}

pub trait AssetStore: Send + Sync {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<StoredAsset, ApiError>;
    fn delete(&self, id: &str) -> Result<bool, ApiError>;
}

/// Check an upload against the image-type allowlist and the size cap,
/// returning the file extension to store it under.
pub fn validate_upload(content_type: &str, size: u64, max_bytes: u64) -> Result<&'static str, ApiError> {
    // strip parameters such as "; charset=binary"
    let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let Some((_, ext)) = ALLOWED_IMAGE_TYPES.iter().find(|(ct, _)| *ct == essence) else {
        return Err(ApiError::validation("unsupported_media_type", "only jpeg, png, webp and gif images are accepted"));
    };
    if size == 0 {
        return Err(ApiError::validation("empty_upload", "upload body is empty"));
    }
    if size > max_bytes {
        return Err(ApiError::validation("upload_too_large", "upload exceeds the configured size limit"));
    }
    Ok(ext)
}

pub struct DiskAssets {
    root: PathBuf,
    public_base: String,
    max_bytes: u64,
}

impl DiskAssets {
    pub fn new(root: impl AsRef<Path>, public_base: impl Into<String>, max_bytes: u64) -> Self {
        Self { root: root.as_ref().to_path_buf(), public_base: public_base.into(), max_bytes }
    }

    fn file_for(&self, id: &str) -> Option<PathBuf> {
        if Uuid::parse_str(id).is_err() { return None; }
        for (_, ext) in ALLOWED_IMAGE_TYPES {
            let candidate = self.root.join(format!("{id}.{ext}"));
            if candidate.exists() { return Some(candidate); }
        }
        None
    }
}

impl AssetStore for DiskAssets {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<StoredAsset, ApiError> {
        let ext = validate_upload(content_type, bytes.len() as u64, self.max_bytes)?;
        let id = Uuid::new_v4().to_string();
        if let Err(e) = fs::create_dir_all(&self.root) {
            error!("media root {} unavailable: {e}", self.root.display());
            return Err(ApiError::downstream("asset_store_unavailable", "could not store upload"));
        }
        let path = self.root.join(format!("{id}.{ext}"));
        if let Err(e) = fs::write(&path, bytes) {
            error!("writing asset {} failed: {e}", path.display());
            return Err(ApiError::downstream("asset_write_failed", "could not store upload"));
        }
        debug!(target: "brickline::assets", "stored asset id='{}' bytes={}", id, bytes.len());
        Ok(StoredAsset {
            public_url: format!("{}/{id}.{ext}", self.public_base),
            id,
            content_type: content_type.split(';').next().unwrap_or(content_type).trim().to_string(),
            size: bytes.len() as u64,
        })
    }

    fn delete(&self, id: &str) -> Result<bool, ApiError> {
        let Some(path) = self.file_for(id) else { return Ok(false); };
        if let Err(e) = fs::remove_file(&path) {
            error!("deleting asset {} failed: {e}", path.display());
            return Err(ApiError::downstream("asset_delete_failed", "could not delete asset"));
        }
        Ok(true)
    }
}
