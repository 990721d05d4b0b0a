//! The `file_storage` and `file_upload` components.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use nextgisweb_core::{Component, Env, NgwResult, SettingInfo};
use nextgisweb_db::Metadata;
use nextgisweb_web::{Configurator, WebComponent};

use crate::api;
use crate::model::FILEOBJ_META;
use crate::storage::FileStorage;
use crate::upload::FileUpload;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FileStorageSettings {
    path: PathBuf,
}

impl Default for FileStorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/file_storage"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FileUploadSettings {
    path: PathBuf,
}

impl Default for FileUploadSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/file_upload"),
        }
    }
}

/// Provides [`FileStorage`] and registers the `fileobj` table.
#[derive(Debug, Default)]
pub struct FileStorageComponent;

impl Component for FileStorageComponent {
    fn identity(&self) -> &'static str {
        "file_storage"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn settings_info(&self) -> &'static [SettingInfo] {
        &[SettingInfo {
            key: "path",
            desc: "Directory of the durable file store",
        }]
    }

    fn initialize(&self, env: &mut Env) -> NgwResult<()> {
        let settings: FileStorageSettings = env.settings().component(self.identity())?;
        env.service::<Metadata>()?.add(&FILEOBJ_META)?;
        tracing::debug!(path = %settings.path.display(), "File storage");
        env.provide(Arc::new(FileStorage::new(settings.path)));
        Ok(())
    }
}

impl WebComponent for FileStorageComponent {}

/// Provides [`FileUpload`] and serves the upload API.
#[derive(Debug, Default)]
pub struct FileUploadComponent;

impl Component for FileUploadComponent {
    fn identity(&self) -> &'static str {
        "file_upload"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn settings_info(&self) -> &'static [SettingInfo] {
        &[SettingInfo {
            key: "path",
            desc: "Directory for temporary uploads",
        }]
    }

    fn initialize(&self, env: &mut Env) -> NgwResult<()> {
        let settings: FileUploadSettings = env.settings().component(self.identity())?;
        tracing::debug!(path = %settings.path.display(), "File upload");
        env.provide(Arc::new(FileUpload::new(settings.path)));
        Ok(())
    }
}

impl WebComponent for FileUploadComponent {
    fn setup_routes(&self, config: &mut Configurator) -> NgwResult<()> {
        api::setup_routes(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextgisweb_core::Settings;
    use serde_json::json;

    #[test]
    fn test_paths_from_settings() {
        let mut settings = Settings::default();
        settings.set_component_option("file_storage", "path", json!("/srv/ngw/storage"));
        let mut env = Env::new(settings);
        env.provide(Arc::new(Metadata::new()));

        FileStorageComponent.initialize(&mut env).unwrap();
        FileUploadComponent.initialize(&mut env).unwrap();

        assert_eq!(
            env.service::<FileStorage>().unwrap().path(),
            std::path::Path::new("/srv/ngw/storage")
        );
        assert_eq!(
            env.service::<FileUpload>().unwrap().path(),
            std::path::Path::new("data/file_upload")
        );
        assert_eq!(
            env.service::<Metadata>().unwrap().table_names().unwrap(),
            vec!["fileobj"]
        );
    }
}
