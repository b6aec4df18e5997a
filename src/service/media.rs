//! Uploaded files on local disk under the media root. Stored paths are relative, with `/` separators.

use crate::error::AppError;
use std::path::{Component, Path, PathBuf};

pub const ENTRY_IMAGE_DIR: &str = "encyclopedia/images";
pub const AVATAR_DIR: &str = "users/avatars";

#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MediaStore { root: root.into() }
    }

    /// Write `bytes` under `dir` with a generated name and return the relative path.
    /// Rejections are reported against the form field `field`.
    pub async fn save(
        &self,
        field: &str,
        dir: &str,
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::field(field, "the submitted file is empty"));
        }
        let ext = image_extension(content_type, file_name)
            .ok_or_else(|| AppError::field(field, "upload a valid image"))?;
        let relative = format!("{}/{}.{}", dir.trim_matches('/'), uuid::Uuid::new_v4().simple(), ext);
        let full = self.resolve(&relative)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "stored upload");
        Ok(relative)
    }

    /// Delete a stored file. Missing files are not an error.
    pub async fn remove(&self, relative: &str) -> Result<(), AppError> {
        let full = self.resolve(relative)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of several files; failures are logged.
    pub async fn remove_all(&self, paths: &[String]) {
        for p in paths {
            if let Err(e) = self.remove(p).await {
                tracing::warn!(path = %p, error = %e, "could not remove media file");
            }
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, AppError> {
        let rel = Path::new(relative);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AppError::BadRequest(format!("invalid media path: {}", relative)));
        }
        Ok(self.root.join(rel))
    }
}

/// Extension for an image upload. The content type must be `image/*`; an image
/// subtype not listed here falls back to the file name's extension.
/// SVG is never accepted: uploads are served from the API's own origin.
pub fn image_extension(content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    let content_type = content_type?.trim().to_ascii_lowercase();
    let subtype = content_type.strip_prefix("image/")?;
    let from_type = match subtype {
        "png" => Some("png"),
        "jpeg" | "jpg" | "pjpeg" => Some("jpg"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "bmp" => Some("bmp"),
        s if s.starts_with("svg") => return None,
        _ => None,
    };
    from_type.or_else(|| {
        let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some("png"),
            "jpg" | "jpeg" => Some("jpg"),
            "gif" => Some("gif"),
            "webp" => Some("webp"),
            "bmp" => Some("bmp"),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_type_or_name() {
        assert_eq!(image_extension(Some("image/png"), None), Some("png"));
        assert_eq!(image_extension(Some("image/jpeg"), Some("x.gif")), Some("jpg"));
        assert_eq!(image_extension(Some("image/x-unknown"), Some("Photo.JPEG")), Some("jpg"));
        assert_eq!(image_extension(Some("text/plain"), Some("a.png")), None);
        assert_eq!(image_extension(Some("image/x-unknown"), Some("notes.txt")), None);
    }

    #[test]
    fn generic_binary_type_is_not_an_image() {
        assert_eq!(image_extension(Some("application/octet-stream"), Some("a.webp")), None);
        assert_eq!(image_extension(None, Some("a.png")), None);
    }

    #[test]
    fn svg_is_refused_by_type_and_by_name() {
        assert_eq!(image_extension(Some("image/svg+xml"), Some("logo.svg")), None);
        assert_eq!(image_extension(Some("IMAGE/SVG+XML"), None), None);
        assert_eq!(image_extension(Some("image/x-unknown"), Some("logo.svg")), None);
    }

    #[tokio::test]
    async fn save_rejects_svg_upload() {
        let root = std::env::temp_dir().join(format!("baike-media-{}", uuid::Uuid::new_v4().simple()));
        let store = MediaStore::new(&root);
        let err = store
            .save("image", ENTRY_IMAGE_DIR, Some("x.svg"), Some("image/svg+xml"), b"<svg/>")
            .await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn save_and_remove_round_trip_on_disk() {
        let root = std::env::temp_dir().join(format!("baike-media-{}", uuid::Uuid::new_v4().simple()));
        let store = MediaStore::new(&root);
        let rel = store
            .save("image", ENTRY_IMAGE_DIR, Some("a.png"), Some("image/png"), b"\x89PNG")
            .await
            .unwrap();
        assert!(rel.starts_with("encyclopedia/images/"));
        assert!(rel.ends_with(".png"));
        assert!(root.join(&rel).exists());
        store.remove(&rel).await.unwrap();
        assert!(!root.join(&rel).exists());
        store.remove(&rel).await.unwrap();
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn refuses_traversal_and_empty_files() {
        let store = MediaStore::new(std::env::temp_dir());
        assert!(store.remove("../etc/passwd").await.is_err());
        assert!(store.save("avatar", AVATAR_DIR, None, Some("image/png"), b"").await.is_err());
    }
}
