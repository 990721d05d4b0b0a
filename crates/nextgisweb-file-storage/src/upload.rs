//! Temporary file uploads.
//!
//! An upload is stored as a data file plus a JSON metadata file next to it:
//! `{path}/{id[0:2]}/{id[2:4]}/{id}` and `{id}.meta`. The id is a UUID in
//! simple hex form and is what clients pass back to attach the upload to a
//! resource.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nextgisweb_core::{NgwError, NgwResult};

use crate::storage::fan_out;

/// Metadata stored alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMeta {
    pub id: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Root of the temporary upload area.
#[derive(Debug, Clone)]
pub struct FileUpload {
    path: PathBuf,
}

impl FileUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn paths(&self, id: &str) -> NgwResult<(PathBuf, PathBuf)> {
        let (level1, level2) = fan_out(id)?;
        let dir = self.path.join(level1).join(level2);
        Ok((dir.join(id), dir.join(format!("{id}.meta"))))
    }

    /// Stores `data` as a new upload.
    pub async fn store(
        &self,
        data: &[u8],
        mime_type: Option<String>,
        name: Option<String>,
    ) -> NgwResult<UploadMeta> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (data_path, meta_path) = self.paths(&id)?;
        if let Some(dir) = data_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let meta = UploadMeta {
            id,
            size: data.len() as u64,
            mime_type,
            name,
        };
        tokio::fs::write(&data_path, data).await?;
        let encoded = serde_json::to_vec(&meta)
            .map_err(|e| NgwError::SerializationError(e.to_string()))?;
        tokio::fs::write(&meta_path, encoded).await?;

        tracing::debug!(id = %meta.id, size = meta.size, "Stored upload");
        Ok(meta)
    }

    /// Resolves an upload id to its data file and metadata.
    ///
    /// A malformed id is a validation error; an unknown one is not found.
    pub async fn get_filename(&self, id: &str) -> NgwResult<(PathBuf, UploadMeta)> {
        let (data_path, meta_path) = self.paths(id)?;
        let raw = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(NgwError::NotFound(format!("Upload '{id}' not found")));
            }
            Err(e) => return Err(e.into()),
        };
        let meta: UploadMeta = serde_json::from_slice(&raw)
            .map_err(|e| NgwError::SerializationError(format!("Corrupt upload metadata: {e}")))?;
        if !tokio::fs::try_exists(&data_path).await? {
            return Err(NgwError::NotFound(format!("Upload '{id}' not found")));
        }
        Ok((data_path, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let upload = FileUpload::new(dir.path());
        let meta = upload
            .store(b"<qml/>", Some("text/xml".into()), Some("roads.qml".into()))
            .await
            .unwrap();
        assert_eq!(meta.size, 6);

        let (path, loaded) = upload.get_filename(&meta.id).await.unwrap();
        assert_eq!(loaded, meta);
        assert_eq!(std::fs::read(&path).unwrap(), b"<qml/>");
        assert!(path.starts_with(dir.path().join(&meta.id[0..2]).join(&meta.id[2..4])));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let upload = FileUpload::new(dir.path());
        let result = upload
            .get_filename("0123456789abcdef0123456789abcdef")
            .await;
        assert!(matches!(result, Err(NgwError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_malformed_id_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let upload = FileUpload::new(dir.path());
        let result = upload.get_filename("../secret").await;
        assert!(matches!(result, Err(NgwError::ValidationError(_))));
    }
}
