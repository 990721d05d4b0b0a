//! Test fixtures.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tempfile::TempDir;

use nextgisweb_core::Settings;
use nextgisweb_web::auth::AUTH_TKT_COOKIE;
use nextgisweb_web::AuthTktPolicy;

/// Secret used by [`TestSettings`].
pub const TEST_SECRET: &str = "test-secret";

/// Settings backed by a scratch directory that lives as long as the value.
///
/// The database is in memory; file storage and uploads go to the scratch
/// directory.
#[derive(Debug)]
pub struct TestSettings {
    pub settings: Settings,
    dir: TempDir,
}

impl TestSettings {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let mut settings = Settings::default();
        settings.log_level = "warn".to_string();
        settings.database.path = ":memory:".into();
        settings.set_component_option("pyramid", "secret", json!(TEST_SECRET));
        settings.set_component_option(
            "pyramid",
            "static_dir",
            json!(dir.path().join("static")),
        );
        settings.set_component_option(
            "file_storage",
            "path",
            json!(dir.path().join("file_storage")),
        );
        settings.set_component_option("file_upload", "path", json!(dir.path().join("file_upload")));
        Ok(Self { settings, dir })
    }

    /// Drops the secret to exercise startup failures.
    #[must_use]
    pub fn without_secret(mut self) -> Self {
        if let Some(serde_json::Value::Object(section)) = self.settings.components.get_mut("pyramid") {
            section.remove("secret");
        }
        self
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// A `name=value` cookie pair authenticating `userid` under `secret`.
pub fn auth_cookie(secret: &str, userid: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let ticket = AuthTktPolicy::new(secret).ticket(userid, now);
    format!("{AUTH_TKT_COOKIE}={ticket}")
}
