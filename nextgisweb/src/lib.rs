//! # nextgisweb
//!
//! Web GIS platform core. This crate wires the component crates into one
//! application and ships the `nextgisweb` binary.
//!
//! ```rust,no_run
//! use nextgisweb::core::settings_loader;
//!
//! async fn run() -> nextgisweb::core::NgwResult<()> {
//!     let settings = settings_loader::from_file_with_env("nextgisweb.toml")?;
//!     let (_env, config) = nextgisweb::application(settings).configurator()?;
//!     nextgisweb::web::server::serve(config.into_router(), "127.0.0.1:8080").await
//! }
//! ```

#![allow(clippy::result_large_err)]

use std::sync::Arc;

/// Error types, settings, logging, components and the environment.
pub use nextgisweb_core as core;

/// SQLite backend, models and metadata.
pub use nextgisweb_db as db;

/// Resources, permission scopes and serializers.
pub use nextgisweb_resource as resource;

/// File objects and uploads.
pub use nextgisweb_file_storage as file_storage;

/// Configurator, policies and the application bootstrap.
pub use nextgisweb_web as web;

/// Feature layers, fields and styles.
pub use nextgisweb_feature_layer as feature_layer;

/// Management commands.
pub use nextgisweb_cli as cli;

pub use axum;
pub use serde_json;
pub use tokio;
pub use tracing;

use nextgisweb_cli::Application;
use nextgisweb_core::{ComponentRegistry, NgwResult, Settings};
use nextgisweb_web::WebComponent;

/// The standard component set in registration order.
///
/// `pyramid` is last so every other component is initialized when the
/// web application is assembled.
pub fn default_components() -> NgwResult<ComponentRegistry<dyn WebComponent>> {
    let mut registry: ComponentRegistry<dyn WebComponent> = ComponentRegistry::new();
    registry.register(Arc::new(db::DbComponent))?;
    registry.register(Arc::new(resource::ResourceComponent))?;
    registry.register(Arc::new(file_storage::FileStorageComponent))?;
    registry.register(Arc::new(file_storage::FileUploadComponent))?;
    registry.register(Arc::new(feature_layer::FeatureLayerComponent))?;
    registry.register(Arc::new(web::PyramidComponent))?;
    Ok(registry)
}

/// An [`Application`] over the standard component set.
pub fn application(settings: Settings) -> Application {
    Application::new(settings, default_components)
}
