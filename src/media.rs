//! Uploaded photo storage
//!
//! Photos are written under `MEDIA_ROOT/detections/` with a generated file
//! name. The stored reference is the path relative to the media root.

use std::path::{Path, PathBuf};

use uuid::Uuid;

const PHOTO_DIR: &str = "detections";
const OVERLAY_DIR: &str = "explain";

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic"];

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a leaf photo and return the stored reference.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> std::io::Result<String> {
        self.save_in(PHOTO_DIR, original_name, bytes).await
    }

    /// Write an explainability overlay next to the photos.
    pub async fn save_overlay(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        self.save_in(OVERLAY_DIR, original_name, bytes).await
    }

    async fn save_in(
        &self,
        subdir: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(original_name));
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{}/{}", subdir, file_name))
    }

    /// Best-effort removal, used to roll back a failed create.
    pub async fn remove(&self, reference: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(reference)).await {
            tracing::warn!("Failed to remove orphaned photo {}: {}", reference, e);
        }
    }
}

fn extension_for(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string())
}
