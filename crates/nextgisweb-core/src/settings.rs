//! Application settings.
//!
//! [`Settings`] holds the process-wide configuration. Options that belong to
//! a single component live under `components.<identity>` as raw JSON values;
//! each component deserializes its own section with [`Settings::component`].
//!
//! ```toml
//! debug = false
//! log_level = "info"
//!
//! [database]
//! path = "nextgisweb.sqlite"
//!
//! [components.pyramid]
//! secret = "change-me"
//!
//! [components.file_storage]
//! path = "/var/lib/nextgisweb/storage"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{NgwError, NgwResult};

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file, or `:memory:`.
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("nextgisweb.sqlite"),
        }
    }
}

/// The complete set of application settings.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.log_level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The log filter directive (e.g. "info", "nextgisweb_web=debug").
    pub log_level: String,
    /// Database configuration.
    pub database: DatabaseSettings,
    /// Per-component settings sections, keyed by component identity.
    pub components: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            database: DatabaseSettings::default(),
            components: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the raw settings section of a component, if present.
    pub fn component_section(&self, identity: &str) -> Option<&serde_json::Value> {
        self.components.get(identity)
    }

    /// Deserializes the settings section of a component.
    ///
    /// A missing section yields `T::default()`.
    pub fn component<T>(&self, identity: &str) -> NgwResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.components.get(identity) {
            None => Ok(T::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                NgwError::ConfigurationError(format!(
                    "Invalid settings for component '{identity}': {e}"
                ))
            }),
        }
    }

    /// Sets a single key in a component's settings section, creating the
    /// section if it does not exist yet.
    pub fn set_component_option(
        &mut self,
        identity: &str,
        key: &str,
        value: serde_json::Value,
    ) {
        let section = self
            .components
            .entry(identity.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !section.is_object() {
            *section = serde_json::Value::Object(serde_json::Map::new());
        }
        if let serde_json::Value::Object(map) = section {
            map.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct StorageSection {
        path: Option<String>,
        levels: u8,
    }

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.database.path, PathBuf::from("nextgisweb.sqlite"));
        assert!(s.components.is_empty());
    }

    #[test]
    fn test_missing_component_section_is_default() {
        let s = Settings::default();
        let section: StorageSection = s.component("file_storage").unwrap();
        assert!(section.path.is_none());
        assert_eq!(section.levels, 0);
    }

    #[test]
    fn test_component_section_deserialization() {
        let mut s = Settings::default();
        s.set_component_option("file_storage", "path", serde_json::json!("/tmp/ngw"));
        s.set_component_option("file_storage", "levels", serde_json::json!(2));

        let section: StorageSection = s.component("file_storage").unwrap();
        assert_eq!(section.path.as_deref(), Some("/tmp/ngw"));
        assert_eq!(section.levels, 2);
    }

    #[test]
    fn test_invalid_component_section() {
        let mut s = Settings::default();
        s.set_component_option("file_storage", "levels", serde_json::json!("many"));

        let result: NgwResult<StorageSection> = s.component("file_storage");
        assert!(matches!(result, Err(NgwError::ConfigurationError(_))));
    }

    #[test]
    fn test_set_option_replaces_non_object_section() {
        let mut s = Settings::default();
        s.components
            .insert("pyramid".to_string(), serde_json::json!("garbage"));
        s.set_component_option("pyramid", "secret", serde_json::json!("s3cret"));
        assert_eq!(
            s.component_section("pyramid").unwrap()["secret"],
            serde_json::json!("s3cret")
        );
    }
}
