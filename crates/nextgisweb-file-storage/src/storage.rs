//! Durable file storage.
//!
//! Files live under `{path}/{component}/{uuid[0:2]}/{uuid[2:4]}/{uuid}`.

use std::path::{Path, PathBuf};

use nextgisweb_core::{NgwError, NgwResult, ValidationError};

use crate::model::FileObj;

/// Root of the durable file store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an unsaved file object with a fresh UUID.
    pub fn fileobj(&self, component: &str) -> FileObj {
        FileObj {
            id: None,
            component: component.to_string(),
            uuid: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Returns the on-disk path of a file object, creating its parent
    /// directories when `makedirs` is set.
    pub async fn filename(&self, fileobj: &FileObj, makedirs: bool) -> NgwResult<PathBuf> {
        let (level1, level2) = fan_out(&fileobj.uuid)?;
        let dir = self
            .path
            .join(&fileobj.component)
            .join(level1)
            .join(level2);
        if makedirs {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(dir.join(&fileobj.uuid))
    }

    /// Copies `src` into the storage slot of `fileobj`, returning the
    /// destination path and the number of bytes copied.
    pub async fn copy_into(&self, src: &Path, fileobj: &FileObj) -> NgwResult<(PathBuf, u64)> {
        let dst = self.filename(fileobj, true).await?;
        let size = tokio::fs::copy(src, &dst).await?;
        tracing::debug!(src = %src.display(), dst = %dst.display(), size, "Copied file into storage");
        Ok((dst, size))
    }
}

/// Splits a 32-character hex id into its two fan-out directory names.
pub(crate) fn fan_out(id: &str) -> NgwResult<(&str, &str)> {
    if id.len() != 32 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(NgwError::from(
            ValidationError::new(format!("Invalid file id '{id}'."), "invalid")
                .with_param("id", id),
        ));
    }
    Ok((&id[0..2], &id[2..4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fileobj_has_hex_uuid() {
        let storage = FileStorage::new("/tmp/none");
        let fileobj = storage.fileobj("feature_layer");
        assert_eq!(fileobj.component, "feature_layer");
        assert_eq!(fileobj.uuid.len(), 32);
        assert!(fileobj.id.is_none());
    }

    #[tokio::test]
    async fn test_filename_layout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let fileobj = FileObj {
            id: None,
            component: "feature_layer".into(),
            uuid: "aabbccddeeff00112233445566778899".into(),
        };

        let path = storage.filename(&fileobj, false).await.unwrap();
        assert_eq!(
            path,
            dir.path()
                .join("feature_layer/aa/bb/aabbccddeeff00112233445566778899")
        );
        assert!(!path.parent().unwrap().exists());

        storage.filename(&fileobj, true).await.unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_copy_into() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        std::fs::write(&src, b"style bytes").unwrap();

        let storage = FileStorage::new(dir.path().join("storage"));
        let fileobj = storage.fileobj("feature_layer");
        let (dst, size) = storage.copy_into(&src, &fileobj).await.unwrap();
        assert_eq!(size, 11);
        assert_eq!(std::fs::read(dst).unwrap(), b"style bytes");
    }

    #[test]
    fn test_fan_out_rejects_non_hex() {
        assert!(fan_out("../../etc/passwd").is_err());
        assert!(fan_out("zzbbccddeeff00112233445566778899").is_err());
        assert_eq!(
            fan_out("0123456789abcdef0123456789abcdef").unwrap(),
            ("01", "23")
        );
    }
}
