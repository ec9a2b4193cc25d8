//! Upload handling
//!
//! Validates incoming files and stores them in a scratch directory under a
//! random name, so concurrent requests never write to the same path.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::UploadConfig;
use crate::utils::error::{LeafError, Result};

/// Accepted file extensions (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Check the extension of an uploaded file name.
///
/// Returns the lower-cased extension including the leading dot (`".jpg"`).
pub fn validate_extension(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(format!(".{}", extension))
    } else {
        Err(LeafError::Validation(
            "unsupported file format, use JPG or PNG".to_string(),
        ))
    }
}

/// An upload that has been written to the scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Generated file name (`<uuid hex><ext>`)
    pub file_name: String,
    /// Location on disk
    pub path: PathBuf,
    /// Public URL of the stored file
    pub url: String,
}

/// Scratch directory for uploaded images
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
}

impl UploadStore {
    /// Open the store, creating the directory if needed
    pub fn open(config: &UploadConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        Ok(Self {
            dir: config.dir.clone(),
            url_prefix: config.mount_path().to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate an upload and persist it.
    ///
    /// Nothing is written when validation fails.
    pub fn accept(&self, file_name: Option<&str>, bytes: &[u8]) -> Result<StoredUpload> {
        let file_name = file_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LeafError::Validation("no file uploaded".to_string()))?;

        let extension = validate_extension(file_name)?;

        if bytes.is_empty() {
            return Err(LeafError::Validation("uploaded file is empty".to_string()));
        }

        let stored_name = format!("{}{}", Uuid::new_v4().simple(), extension);
        let path = self.dir.join(&stored_name);
        std::fs::write(&path, bytes)?;

        tracing::debug!("Stored upload {:?} as {:?} ({} bytes)", file_name, path, bytes.len());

        Ok(StoredUpload {
            url: format!("{}/{}", self.url_prefix, stored_name),
            file_name: stored_name,
            path,
        })
    }

    /// Delete every stored image. Returns the number of removed files.
    pub fn purge(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_upload = path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| ALLOWED_EXTENSIONS.contains(&e))
                    .unwrap_or(false);

            if is_upload {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }

        tracing::info!("Purged {} uploads from {:?}", removed, self.dir);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> UploadStore {
        UploadStore::open(&UploadConfig {
            dir: dir.join("uploads"),
            ..Default::default()
        })
        .unwrap()
    }

    fn stored_files(store: &UploadStore) -> usize {
        std::fs::read_dir(store.dir()).unwrap().count()
    }

    #[test]
    fn test_validate_extension() {
        assert_eq!(validate_extension("leaf.jpg").unwrap(), ".jpg");
        assert_eq!(validate_extension("LEAF.JPEG").unwrap(), ".jpeg");
        assert_eq!(validate_extension("photo.Png").unwrap(), ".png");
        assert!(validate_extension("leaf.gif").is_err());
        assert!(validate_extension("leaf").is_err());
        assert!(validate_extension("png").is_err());
    }

    #[test]
    fn test_accept_persists_with_random_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let a = store.accept(Some("Leaf.PNG"), b"one").unwrap();
        let b = store.accept(Some("Leaf.PNG"), b"two").unwrap();

        assert_ne!(a.file_name, b.file_name);
        assert!(a.file_name.ends_with(".png"));
        // 32 hex chars + ".png"
        assert_eq!(a.file_name.len(), 36);
        assert_eq!(a.url, format!("/static/uploads/{}", a.file_name));
        assert_eq!(std::fs::read(&a.path).unwrap(), b"one");
        assert_eq!(stored_files(&store), 2);
    }

    #[test]
    fn test_rejected_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.accept(Some("leaf.gif"), b"GIF89a").unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(stored_files(&store), 0);
    }

    #[test]
    fn test_missing_or_empty_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        assert!(matches!(store.accept(None, b"data"), Err(LeafError::Validation(_))));
        assert!(matches!(store.accept(Some(""), b"data"), Err(LeafError::Validation(_))));
        assert!(matches!(store.accept(Some("leaf.jpg"), b""), Err(LeafError::Validation(_))));
        assert_eq!(stored_files(&store), 0);
    }

    #[test]
    fn test_purge() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.accept(Some("a.jpg"), b"a").unwrap();
        store.accept(Some("b.png"), b"b").unwrap();
        std::fs::write(store.dir().join("README.txt"), b"keep").unwrap();

        assert_eq!(store.purge().unwrap(), 2);
        assert_eq!(stored_files(&store), 1);
    }
}
