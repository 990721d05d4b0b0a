//! The web configurator.
//!
//! [`Configurator`] collects named routes, their views, static views,
//! security policies and request properties while the application is
//! bootstrapped, and finally turns them into an axum [`Router`].
//!
//! Route patterns are relative to the site root and use `{name}` for a
//! single path segment and a trailing `*name` for the remainder of the path:
//!
//! ```text
//! api/resource/{id}/feature_layer
//! static/0a1b.../amd/*subpath
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::Request;
use axum::routing::MethodRouter;
use axum::{Extension, Router};
use http::header::CACHE_CONTROL;
use http::HeaderValue;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value as JsonValue};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use nextgisweb_core::logging::request_span;
use nextgisweb_core::{NgwError, NgwResult, Principal};

use crate::auth::{Ace, AuthenticationPolicy, AuthorizationPolicy};

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Part of a route pattern between two slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Remainder(String),
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A named route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    /// Normalized pattern, always starting with `/`.
    pub pattern: String,
    segments: Vec<Segment>,
}

impl Route {
    fn parse(name: &str, pattern: &str) -> NgwResult<Self> {
        let trimmed = pattern.trim_start_matches('/');
        let mut segments = Vec::new();
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        let invalid = |why: &str| {
            NgwError::ConfigurationError(format!("Invalid pattern '{pattern}' of route '{name}': {why}"))
        };

        for (idx, part) in parts.iter().enumerate() {
            let segment = if let Some(rest) = part.strip_prefix('*') {
                if idx + 1 != parts.len() {
                    return Err(invalid("'*' is only allowed in the last segment"));
                }
                if !is_identifier(rest) {
                    return Err(invalid("bad remainder name"));
                }
                Segment::Remainder(rest.to_string())
            } else if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if !is_identifier(inner) {
                    return Err(invalid("bad placeholder name"));
                }
                Segment::Param(inner.to_string())
            } else if part.contains(['{', '}', '*']) {
                return Err(invalid("placeholders must span a whole segment"));
            } else {
                Segment::Literal((*part).to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            name: name.to_string(),
            pattern: format!("/{trimmed}"),
            segments,
        })
    }

    /// The pattern in axum syntax.
    pub fn axum_path(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(l) => l.clone(),
                Segment::Param(p) => format!("{{{p}}}"),
                Segment::Remainder(r) => format!("{{*{r}}}"),
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    /// Builds a path for this route from parameter values.
    pub fn path(&self, params: &[(&str, &str)]) -> NgwResult<String> {
        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    NgwError::ConfigurationError(format!(
                        "Missing parameter '{key}' for route '{}'",
                        self.name
                    ))
                })
        };

        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            parts.push(match segment {
                Segment::Literal(l) => l.clone(),
                Segment::Param(p) => utf8_percent_encode(lookup(p)?, SEGMENT).to_string(),
                Segment::Remainder(r) => lookup(r)?
                    .split('/')
                    .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
                    .collect::<Vec<_>>()
                    .join("/"),
            });
        }
        Ok(format!("/{}", parts.join("/")))
    }
}

/// A directory served under a URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticView {
    /// URL prefix, always starting with `/`.
    pub prefix: String,
    pub path: PathBuf,
    pub cache_max_age: u64,
}

/// Authentication and authorization policies, available to handlers as a
/// request extension.
#[derive(Clone, Default)]
pub struct Security {
    pub authentication: Option<Arc<dyn AuthenticationPolicy>>,
    pub authorization: Option<Arc<dyn AuthorizationPolicy>>,
}

impl Security {
    /// Asks the installed authorization policy; without one nothing is
    /// permitted.
    pub fn permits(&self, acl: &[Ace], principals: &[Principal], permission: &str) -> bool {
        self.authorization
            .as_ref()
            .is_some_and(|policy| policy.permits(acl, principals, permission))
    }
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("authentication", &self.authentication.is_some())
            .field("authorization", &self.authorization.is_some())
            .finish()
    }
}

type RouterLayer = Box<dyn FnOnce(Router) -> Router + Send>;

/// Collects web configuration during bootstrap.
pub struct Configurator {
    settings: Map<String, JsonValue>,
    routes: Vec<Route>,
    route_index: HashMap<String, usize>,
    views: HashMap<String, MethodRouter>,
    static_views: Vec<StaticView>,
    security: Security,
    request_properties: Vec<RouterLayer>,
}

impl Configurator {
    pub fn new(settings: Map<String, JsonValue>) -> Self {
        Self {
            settings,
            routes: Vec::new(),
            route_index: HashMap::new(),
            views: HashMap::new(),
            static_views: Vec::new(),
            security: Security::default(),
            request_properties: Vec::new(),
        }
    }

    /// The merged settings the configurator was created with.
    pub const fn settings(&self) -> &Map<String, JsonValue> {
        &self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&JsonValue> {
        self.settings.get(key)
    }

    /// Registers a named route.
    pub fn add_route(&mut self, name: &str, pattern: &str) -> NgwResult<()> {
        if self.route_index.contains_key(name) {
            return Err(NgwError::ConfigurationError(format!(
                "Route '{name}' is already registered"
            )));
        }
        let route = Route::parse(name, pattern)?;
        let axum_path = route.axum_path();
        if let Some(other) = self.routes.iter().find(|r| r.axum_path() == axum_path) {
            return Err(NgwError::ConfigurationError(format!(
                "Route '{name}' duplicates the pattern of route '{}'",
                other.name
            )));
        }

        tracing::debug!(route = name, pattern = %route.pattern, "Added route");
        self.route_index.insert(name.to_string(), self.routes.len());
        self.routes.push(route);
        Ok(())
    }

    /// Attaches a view to a registered route.
    pub fn add_view(&mut self, route_name: &str, view: MethodRouter) -> NgwResult<()> {
        if !self.route_index.contains_key(route_name) {
            return Err(NgwError::ConfigurationError(format!(
                "Cannot add view to unknown route '{route_name}'"
            )));
        }
        if self.views.contains_key(route_name) {
            return Err(NgwError::ConfigurationError(format!(
                "Route '{route_name}' already has a view"
            )));
        }
        self.views.insert(route_name.to_string(), view);
        Ok(())
    }

    /// Serves the files under `path` at the URL prefix `name`.
    pub fn add_static_view(
        &mut self,
        name: &str,
        path: impl Into<PathBuf>,
        cache_max_age: u64,
    ) -> NgwResult<()> {
        let trimmed = name.trim_matches('/');
        if trimmed.is_empty() || trimmed.contains(['{', '}', '*']) {
            return Err(NgwError::ConfigurationError(format!(
                "Invalid static view prefix '{name}'"
            )));
        }
        let prefix = format!("/{trimmed}");
        if self.static_views.iter().any(|v| v.prefix == prefix) {
            return Err(NgwError::ConfigurationError(format!(
                "Static view '{prefix}' is already registered"
            )));
        }
        self.static_views.push(StaticView {
            prefix,
            path: path.into(),
            cache_max_age,
        });
        Ok(())
    }

    /// Returns the route with the given name.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.route_index.get(name).map(|&idx| &self.routes[idx])
    }

    /// Builds the path of a named route.
    pub fn route_path(&self, name: &str, params: &[(&str, &str)]) -> NgwResult<String> {
        self.route(name)
            .ok_or_else(|| NgwError::ConfigurationError(format!("Unknown route '{name}'")))?
            .path(params)
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn has_view(&self, route_name: &str) -> bool {
        self.views.contains_key(route_name)
    }

    pub fn static_views(&self) -> &[StaticView] {
        &self.static_views
    }

    pub fn set_authentication_policy(&mut self, policy: Arc<dyn AuthenticationPolicy>) {
        self.security.authentication = Some(policy);
    }

    pub fn set_authorization_policy(&mut self, policy: Arc<dyn AuthorizationPolicy>) {
        self.security.authorization = Some(policy);
    }

    pub const fn security(&self) -> &Security {
        &self.security
    }

    /// Makes `value` available to every handler as `Extension<T>`.
    pub fn set_request_property<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.request_properties
            .push(Box::new(move |router: Router| router.layer(Extension(value))));
    }

    /// Builds the router. Routes without a view are not served.
    pub fn into_router(self) -> Router {
        let Self {
            routes,
            mut views,
            static_views,
            security,
            request_properties,
            ..
        } = self;

        let mut router = Router::new();
        for route in &routes {
            if let Some(view) = views.remove(&route.name) {
                router = router.route(&route.axum_path(), view);
            }
        }

        for view in static_views {
            let cache_control = HeaderValue::from_str(&format!("max-age={}", view.cache_max_age))
                .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
            let service = ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(CACHE_CONTROL, cache_control))
                .service(ServeDir::new(&view.path));
            router = router.nest_service(&view.prefix, service);
        }

        for layer in request_properties {
            router = layer(router);
        }

        router.layer(Extension(security)).layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| request_span(req.method().as_str(), req.uri().path())),
        )
    }
}

impl std::fmt::Debug for Configurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configurator")
            .field("routes", &self.routes.len())
            .field("views", &self.views.len())
            .field("static_views", &self.static_views)
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(http::Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    #[test]
    fn test_pattern_translation() {
        let route = Route::parse("amd_package", "static/abc/amd/*subpath").unwrap();
        assert_eq!(route.pattern, "/static/abc/amd/*subpath");
        assert_eq!(route.axum_path(), "/static/abc/amd/{*subpath}");

        let home = Route::parse("home", "/").unwrap();
        assert_eq!(home.axum_path(), "/");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(Route::parse("r", "a/*rest/b").is_err());
        assert!(Route::parse("r", "a/x{id}").is_err());
        assert!(Route::parse("r", "a/{1id}").is_err());
    }

    #[test]
    fn test_route_path() {
        let mut config = Configurator::new(Map::new());
        config
            .add_route("feature_layer", "api/resource/{id}/feature_layer")
            .unwrap();
        config.add_route("amd", "static/k/amd/*subpath").unwrap();

        assert_eq!(
            config.route_path("feature_layer", &[("id", "5")]).unwrap(),
            "/api/resource/5/feature_layer"
        );
        assert_eq!(
            config
                .route_path("amd", &[("subpath", "ngw/a b.js")])
                .unwrap(),
            "/static/k/amd/ngw/a%20b.js"
        );
        assert!(config.route_path("feature_layer", &[]).is_err());
        assert!(config.route_path("missing", &[]).is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut config = Configurator::new(Map::new());
        config.add_route("home", "/").unwrap();
        assert!(config.add_route("home", "/other").is_err());
        assert!(config.add_route("root", "").is_err());

        config.add_view("home", get(|| async { "home" })).unwrap();
        assert!(config.add_view("home", get(|| async { "again" })).is_err());
        assert!(config.add_view("missing", get(|| async { "" })).is_err());
    }

    #[test]
    fn test_routes_keep_registration_order() {
        let mut config = Configurator::new(Map::new());
        for (name, pattern) in [("b", "/b"), ("a", "/a"), ("c", "/c/{id}")] {
            config.add_route(name, pattern).unwrap();
        }
        let names: Vec<&str> = config.routes().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_router_serves_views_and_skips_bare_routes() {
        let mut config = Configurator::new(Map::new());
        config.add_route("home", "/").unwrap();
        config.add_route("item", "/item/{id}").unwrap();
        config
            .add_view(
                "item",
                get(|axum::extract::Path(id): axum::extract::Path<i64>| async move {
                    format!("item {id}")
                }),
            )
            .unwrap();
        config.set_request_property(Arc::new(String::from("unused")));

        let router = config.into_router();
        assert_eq!(
            get_text(router.clone(), "/item/3").await,
            (StatusCode::OK, "item 3".to_string())
        );
        assert_eq!(get_text(router, "/").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_view_sets_cache_control() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "var x;").unwrap();

        let mut config = Configurator::new(Map::new());
        config
            .add_static_view("static/key/asset", dir.path(), 3600)
            .unwrap();
        assert!(config.add_static_view("/", dir.path(), 1).is_err());

        let response = config
            .into_router()
            .oneshot(
                http::Request::get("/static/key/asset/app.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=3600");
    }

    #[tokio::test]
    async fn test_request_property_reaches_handler() {
        let mut config = Configurator::new(Map::new());
        config.add_route("greet", "/greet").unwrap();
        config
            .add_view(
                "greet",
                get(|Extension(name): Extension<Arc<String>>| async move { format!("hi {name}") }),
            )
            .unwrap();
        config.set_request_property(Arc::new(String::from("ngw")));

        assert_eq!(
            get_text(config.into_router(), "/greet").await,
            (StatusCode::OK, "hi ngw".to_string())
        );
    }
}
