//! The `pyramid` component: web application bootstrap.
//!
//! [`PyramidComponent::make_app`] builds the [`Configurator`] once at
//! process start:
//!
//! 1. merges the `pyramid` settings section with call-time overrides,
//! 2. exposes the [`Env`] to handlers and installs the auth ticket and ACL
//!    policies (a secret is required),
//! 3. registers the `home` route, the versioned static view and the
//!    `amd_package` route,
//! 4. runs `setup_pyramid` and then `setup_routes` of every component in
//!    registration order.

use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

use axum::extract;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};

use nextgisweb_core::settings_loader::merge_json;
use nextgisweb_core::{Component, ComponentRegistry, Env, NgwError, NgwResult, SettingInfo};

use crate::auth::{AclAuthorizationPolicy, AuthTktPolicy};
use crate::component::WebComponent;
use crate::config::Configurator;
use crate::error::ApiResult;
use crate::static_key::{static_key, CommandListing, ComponentListing, PackageListing};

/// Settings key of the template directories.
pub const MAKO_DIRECTORIES: &str = "mako.directories";

const DEFAULT_MAKO_DIRECTORIES: &str = "nextgisweb:templates/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct PyramidSettings {
    secret: Option<String>,
    static_cache_max_age: u64,
    static_key_command: Option<String>,
    static_dir: PathBuf,
    auth_timeout: Option<u64>,
    auth_secure: bool,
}

impl Default for PyramidSettings {
    fn default() -> Self {
        Self {
            secret: None,
            static_cache_max_age: 3600,
            static_key_command: None,
            static_dir: PathBuf::from("static"),
            auth_timeout: None,
            auth_secure: false,
        }
    }
}

static SETTINGS_INFO: &[SettingInfo] = &[
    SettingInfo {
        key: "secret",
        desc: "Cookie signing secret (required)",
    },
    SettingInfo {
        key: "static_cache_max_age",
        desc: "Static files cache max age in seconds",
    },
    SettingInfo {
        key: "static_key_command",
        desc: "Command whose output versions static URLs",
    },
    SettingInfo {
        key: "static_dir",
        desc: "Directory with static assets",
    },
    SettingInfo {
        key: "auth_timeout",
        desc: "Authentication ticket lifetime in seconds",
    },
    SettingInfo {
        key: "auth_secure",
        desc: "Send the authentication cookie over HTTPS only",
    },
];

/// The web bootstrap component.
#[derive(Debug, Default)]
pub struct PyramidComponent;

impl Component for PyramidComponent {
    fn identity(&self) -> &'static str {
        "pyramid"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn settings_info(&self) -> &'static [SettingInfo] {
        SETTINGS_INFO
    }
}

impl WebComponent for PyramidComponent {}

impl PyramidComponent {
    /// Builds the web configuration.
    ///
    /// `env` must come from an initialized `registry`.
    pub fn make_app(
        &self,
        env: Arc<Env>,
        registry: &ComponentRegistry<dyn WebComponent>,
        overrides: Map<String, JsonValue>,
    ) -> NgwResult<Configurator> {
        let section = env
            .settings()
            .component_section(self.identity())
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Map::new()));
        let mut settings = match merge_json(section, JsonValue::Object(overrides)) {
            JsonValue::Object(map) => map,
            _ => {
                return Err(NgwError::ConfigurationError(
                    "Settings of component 'pyramid' must be a table".to_string(),
                ))
            }
        };
        settings.insert(MAKO_DIRECTORIES.to_string(), json!(DEFAULT_MAKO_DIRECTORIES));

        let options: PyramidSettings = serde_json::from_value(JsonValue::Object(settings.clone()))
            .map_err(|e| {
                NgwError::ConfigurationError(format!("Invalid settings for component 'pyramid': {e}"))
            })?;
        let secret = options
            .secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NgwError::ImproperlyConfigured("Secret not set!".to_string()))?;

        let key = match &options.static_key_command {
            Some(command) => static_key(&CommandListing::new(command))?,
            None => static_key(&component_listing(registry))?,
        };
        settings.insert("static_key".to_string(), json!(key));

        let mut config = Configurator::new(settings);
        config.set_request_property(env);
        config.set_authentication_policy(Arc::new(
            AuthTktPolicy::new(secret)
                .with_timeout(options.auth_timeout)
                .with_secure(options.auth_secure),
        ));
        config.set_authorization_policy(Arc::new(AclAuthorizationPolicy));

        config.add_route("home", "/")?;
        config.add_view("home", get(home))?;

        config.add_static_view(
            &format!("static{key}/asset"),
            &options.static_dir,
            options.static_cache_max_age,
        )?;

        config.add_route("amd_package", &format!("static{key}/amd/*subpath"))?;
        let amd_root = options.static_dir.join("amd");
        config.add_view(
            "amd_package",
            get(move |extract::Path(subpath): extract::Path<String>| {
                let root = amd_root.clone();
                async move { amd_package(&root, &subpath).await }
            }),
        )?;

        tracing::info!(static_key = %key, "Configured static assets");

        for component in registry.iter() {
            tracing::debug!(component = component.identity(), "setup_pyramid");
            component.setup_pyramid(&mut config)?;
        }
        for component in registry.iter() {
            tracing::debug!(component = component.identity(), "setup_routes");
            component.setup_routes(&mut config)?;
        }

        Ok(config)
    }
}

fn component_listing(registry: &ComponentRegistry<dyn WebComponent>) -> impl PackageListing {
    registry
        .iter()
        .fold(ComponentListing::new(env!("CARGO_PKG_VERSION")), |listing, c| {
            listing.with_package(c.identity(), c.version())
        })
}

async fn home() -> Json<JsonValue> {
    Json(json!({"application": "nextgisweb", "version": env!("CARGO_PKG_VERSION")}))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("html") => "text/html",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn amd_package(root: &Path, subpath: &str) -> ApiResult<Response> {
    let relative = Path::new(subpath);
    if !relative
        .components()
        .all(|c| matches!(c, PathComponent::Normal(_)))
    {
        return Err(NgwError::NotFound(format!("AMD package file '{subpath}'")).into());
    }

    let path = root.join(relative);
    match tokio::fs::read(&path).await {
        Ok(body) => Ok((StatusCode::OK, [(CONTENT_TYPE, content_type(&path))], body).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(NgwError::NotFound(format!("AMD package file '{subpath}'")).into())
        }
        Err(e) => Err(NgwError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nextgisweb_core::Settings;

    fn registry() -> ComponentRegistry<dyn WebComponent> {
        let mut registry: ComponentRegistry<dyn WebComponent> = ComponentRegistry::new();
        registry.register(Arc::new(PyramidComponent)).unwrap();
        registry
    }

    fn env_with(section: JsonValue) -> Arc<Env> {
        let mut settings = Settings::default();
        settings.components.insert("pyramid".into(), section);
        Arc::new(Env::new(settings))
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let result = PyramidComponent.make_app(env_with(json!({})), &registry(), Map::new());
        match result {
            Err(NgwError::ImproperlyConfigured(msg)) => assert_eq!(msg, "Secret not set!"),
            other => panic!("unexpected: {other:?}"),
        }

        let empty = PyramidComponent.make_app(env_with(json!({"secret": ""})), &registry(), Map::new());
        assert!(matches!(empty, Err(NgwError::ImproperlyConfigured(_))));
    }

    #[test]
    fn test_overrides_win_and_template_default() {
        let mut overrides = Map::new();
        overrides.insert("secret".into(), json!("from-call"));
        overrides.insert("custom.option".into(), json!(1));
        let config = PyramidComponent
            .make_app(env_with(json!({"secret": "from-file"})), &registry(), overrides)
            .unwrap();

        assert_eq!(config.setting("secret"), Some(&json!("from-call")));
        assert_eq!(config.setting("custom.option"), Some(&json!(1)));
        assert_eq!(
            config.setting(MAKO_DIRECTORIES),
            Some(&json!("nextgisweb:templates/"))
        );
    }

    #[test]
    fn test_template_directories_are_fixed() {
        let mut overrides = Map::new();
        overrides.insert(MAKO_DIRECTORIES.into(), json!("call:templates/"));
        let config = PyramidComponent
            .make_app(
                env_with(json!({"secret": "s", "mako.directories": "custom:templates/"})),
                &registry(),
                overrides,
            )
            .unwrap();
        assert_eq!(
            config.setting(MAKO_DIRECTORIES),
            Some(&json!("nextgisweb:templates/"))
        );
    }

    #[test]
    fn test_base_routes() {
        let config = PyramidComponent
            .make_app(env_with(json!({"secret": "s"})), &registry(), Map::new())
            .unwrap();
        let key = config.setting("static_key").unwrap().as_str().unwrap().to_string();

        let names: Vec<&str> = config.routes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["home", "amd_package"]);
        assert_eq!(config.route_path("home", &[]).unwrap(), "/");
        assert_eq!(
            config.route("amd_package").unwrap().pattern,
            format!("/static{key}/amd/*subpath")
        );
        assert_eq!(config.static_views()[0].prefix, format!("/static{key}/asset"));
        assert_eq!(config.static_views()[0].cache_max_age, 3600);
        assert!(config.security().authentication.is_some());
        assert!(config.security().authorization.is_some());
    }

    #[test]
    fn test_static_key_from_command() {
        let config = PyramidComponent
            .make_app(
                env_with(json!({"secret": "s", "static_key_command": "echo pkg==1"})),
                &registry(),
                Map::new(),
            )
            .unwrap();
        let expected = static_key(&CommandListing::new("echo pkg==1")).unwrap();
        assert_eq!(config.setting("static_key"), Some(&json!(expected)));

        let failing = PyramidComponent.make_app(
            env_with(json!({"secret": "s", "static_key_command": "false"})),
            &registry(),
            Map::new(),
        );
        assert!(failing.is_err());
    }

    #[tokio::test]
    async fn test_amd_package_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "define([]);").unwrap();

        let response = amd_package(dir.path(), "main.js").await.unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "application/javascript");
        assert!(matches!(
            amd_package(dir.path(), "../secret").await,
            Err(crate::error::ApiError(NgwError::NotFound(_)))
        ));
        assert!(amd_package(dir.path(), "missing.js").await.is_err());
    }
}
