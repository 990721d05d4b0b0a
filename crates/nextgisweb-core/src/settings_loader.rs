//! Settings loading from configuration files and the environment.
//!
//! A file (TOML, or JSON by extension) is deep-merged over
//! [`Settings::default`], then `NEXTGISWEB_*` variables are applied on top.
//!
//! ## Environment variables
//!
//! | Env Var | Setting |
//! |---|---|
//! | `NEXTGISWEB_DEBUG` | `debug` |
//! | `NEXTGISWEB_LOG_LEVEL` | `log_level` |
//! | `NEXTGISWEB_DATABASE_PATH` | `database.path` |
//! | `NEXTGISWEB_SECRET` | `components.pyramid.secret` |
//! | `NEXTGISWEB_<COMPONENT>__<KEY>` | `components.<component>.<key>` |
//!
//! Values of the generic form are parsed as JSON when possible and kept as
//! strings otherwise, so `NEXTGISWEB_PYRAMID__STATIC_CACHE_MAX_AGE=60` sets
//! a number.

use std::path::Path;

use serde_json::Value as JsonValue;

use crate::error::NgwError;
use crate::settings::Settings;

const ENV_PREFIX: &str = "NEXTGISWEB_";

/// Loads settings from a TOML string. Keys not present keep their defaults.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, NgwError> {
    let parsed: toml::Value = toml::from_str(toml_str)
        .map_err(|e| NgwError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    from_json_value(toml_to_json(parsed), "TOML")
}

pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, NgwError> {
    from_toml_str(&read_file(path.as_ref(), "TOML")?)
}

/// Loads settings from a JSON string. Keys not present keep their defaults.
pub fn from_json_str(json_str: &str) -> Result<Settings, NgwError> {
    let parsed: JsonValue = serde_json::from_str(json_str)
        .map_err(|e| NgwError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    from_json_value(parsed, "JSON")
}

pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, NgwError> {
    from_json_str(&read_file(path.as_ref(), "JSON")?)
}

/// Loads settings from a file, picking the format by extension
/// (`.json` is JSON, anything else TOML), then applies environment
/// overrides.
pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Settings, NgwError> {
    let path = path.as_ref();
    let mut settings = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => from_json_file(path)?,
        _ => from_toml_file(path)?,
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from environment variables only (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies overrides from the process environment.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, std::env::vars());
}

/// Applies `NEXTGISWEB_*` overrides from an arbitrary set of variables.
pub fn apply_overrides<I, K, V>(settings: &mut Settings, vars: I)
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    for (key, value) in vars {
        let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let value: String = value.into();
        match name {
            "DEBUG" => {
                settings.debug = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes");
            }
            "LOG_LEVEL" => settings.log_level = value,
            "DATABASE_PATH" => settings.database.path = value.into(),
            "SECRET" => {
                settings.set_component_option("pyramid", "secret", JsonValue::String(value));
            }
            other => {
                if let Some((component, option)) = other.split_once("__") {
                    if component.is_empty() || option.is_empty() {
                        continue;
                    }
                    let parsed = serde_json::from_str(&value)
                        .unwrap_or(JsonValue::String(value));
                    settings.set_component_option(
                        &component.to_lowercase(),
                        &option.to_lowercase(),
                        parsed,
                    );
                }
            }
        }
    }
}

fn read_file(path: &Path, format: &str) -> Result<String, NgwError> {
    std::fs::read_to_string(path).map_err(|e| {
        NgwError::ConfigurationError(format!("Cannot read {format} file '{}': {e}", path.display()))
    })
}

fn from_json_value(value: JsonValue, format: &str) -> Result<Settings, NgwError> {
    let defaults = serde_json::to_value(Settings::default())
        .map_err(|e| NgwError::ConfigurationError(format!("Default settings: {e}")))?;
    serde_json::from_value(merge_json(defaults, value))
        .map_err(|e| NgwError::ConfigurationError(format!("Invalid {format} settings: {e}")))
}

fn toml_to_json(value: toml::Value) -> JsonValue {
    use toml::Value as T;
    match value {
        T::String(s) => JsonValue::String(s),
        T::Integer(i) => JsonValue::from(i),
        T::Float(f) => JsonValue::from(f),
        T::Boolean(b) => JsonValue::Bool(b),
        T::Datetime(dt) => JsonValue::String(dt.to_string()),
        T::Array(items) => items.into_iter().map(toml_to_json).collect(),
        T::Table(table) => JsonValue::Object(
            table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect(),
        ),
    }
}

/// Deep-merges `over` into `base`. Objects merge key by key; any other
/// value in `over` replaces the one in `base`.
pub fn merge_json(base: JsonValue, over: JsonValue) -> JsonValue {
    match (base, over) {
        (JsonValue::Object(mut target), JsonValue::Object(source)) => {
            for (key, value) in source {
                let merged = match target.remove(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => value,
                };
                target.insert(key, merged);
            }
            JsonValue::Object(target)
        }
        (_, over) => over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            log_level = "warn"

            [database]
            path = "/var/lib/ngw/db.sqlite"

            [components.pyramid]
            secret = "toml-secret"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.database.path, PathBuf::from("/var/lib/ngw/db.sqlite"));
        assert_eq!(
            settings.component_section("pyramid").unwrap()["secret"],
            serde_json::json!("toml-secret")
        );
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert!(settings.debug);
        assert!(settings.components.is_empty());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("[[invalid toml content");
        assert!(matches!(result, Err(NgwError::ConfigurationError(_))));
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{
            "debug": false,
            "components": {"file_storage": {"path": "/data"}}
        }"#;

        let settings = from_json_str(json).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "info");
        assert_eq!(
            settings.component_section("file_storage").unwrap()["path"],
            serde_json::json!("/data")
        );
    }

    #[test]
    fn test_from_json_str_wrong_type() {
        let result = from_json_str(r#"{"debug": "sometimes"}"#);
        assert!(result.is_err());
    }

    // ── Files ───────────────────────────────────────────────────────

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("settings.json");
        std::fs::write(&json_path, r#"{"log_level": "debug"}"#).unwrap();
        let toml_path = dir.path().join("settings.toml");
        std::fs::write(&toml_path, "log_level = \"trace\"").unwrap();

        assert_eq!(from_json_file(&json_path).unwrap().log_level, "debug");
        assert_eq!(from_toml_file(&toml_path).unwrap().log_level, "trace");
    }

    #[test]
    fn test_missing_file() {
        let result = from_toml_file("/nonexistent/nextgisweb.toml");
        assert!(matches!(result, Err(NgwError::ConfigurationError(_))));
    }

    // ── Overrides ───────────────────────────────────────────────────

    #[test]
    fn test_apply_overrides_known_keys() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            vec![
                ("NEXTGISWEB_DEBUG", "false"),
                ("NEXTGISWEB_LOG_LEVEL", "debug"),
                ("NEXTGISWEB_DATABASE_PATH", ":memory:"),
                ("NEXTGISWEB_SECRET", "env-secret"),
                ("UNRELATED", "ignored"),
            ],
        );

        assert!(!settings.debug);
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.database.path, PathBuf::from(":memory:"));
        assert_eq!(
            settings.component_section("pyramid").unwrap()["secret"],
            serde_json::json!("env-secret")
        );
    }

    #[test]
    fn test_apply_overrides_component_keys() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            vec![
                ("NEXTGISWEB_PYRAMID__STATIC_CACHE_MAX_AGE", "60"),
                ("NEXTGISWEB_FILE_STORAGE__PATH", "/srv/storage"),
                ("NEXTGISWEB___BROKEN", "x"),
            ],
        );

        let pyramid = settings.component_section("pyramid").unwrap();
        assert_eq!(pyramid["static_cache_max_age"], serde_json::json!(60));
        let storage = settings.component_section("file_storage").unwrap();
        assert_eq!(storage["path"], serde_json::json!("/srv/storage"));
        assert_eq!(settings.components.len(), 2);
    }

    #[test]
    fn test_merge_json_deep() {
        let base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": 3});
        let over = serde_json::json!({"a": {"c": 20}, "e": 5});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": {"b": 1, "c": 20}, "d": 3, "e": 5}));
    }
}
