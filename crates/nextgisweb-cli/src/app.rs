//! The application a management command operates on.

use std::fmt;
use std::sync::Arc;

use serde_json::Map;

use nextgisweb_core::{ComponentRegistry, Env, NgwResult, Settings};
use nextgisweb_db::{Metadata, SqliteBackend};
use nextgisweb_web::{Configurator, PyramidComponent, WebComponent};

/// Builds the component set of an application, in registration order.
pub type ComponentFactory =
    Arc<dyn Fn() -> NgwResult<ComponentRegistry<dyn WebComponent>> + Send + Sync>;

/// Loaded settings plus the component set to bootstrap with them.
///
/// Every call to [`Application::env`] starts a fresh environment, so a
/// command decides itself how long its database connection lives.
#[derive(Clone)]
pub struct Application {
    settings: Settings,
    components: ComponentFactory,
}

impl Application {
    pub fn new<F>(settings: Settings, components: F) -> Self
    where
        F: Fn() -> NgwResult<ComponentRegistry<dyn WebComponent>> + Send + Sync + 'static,
    {
        Self {
            settings,
            components: Arc::new(components),
        }
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Initializes every component against a new [`Env`].
    pub fn env(&self) -> NgwResult<(Env, ComponentRegistry<dyn WebComponent>)> {
        let mut registry = (self.components)()?;
        let mut env = Env::new(self.settings.clone());
        registry.initialize(&mut env)?;
        tracing::debug!(components = ?registry.identities(), "Environment initialized");
        Ok((env, registry))
    }

    /// Bootstraps the web application.
    pub fn configurator(&self) -> NgwResult<(Arc<Env>, Configurator)> {
        let (env, registry) = self.env()?;
        let env = Arc::new(env);
        let config = PyramidComponent.make_app(env.clone(), &registry, Map::new())?;
        Ok((env, config))
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Creates the tables of every registered model.
pub async fn initialize_db(env: &Env) -> NgwResult<Vec<&'static str>> {
    let db = env.service::<SqliteBackend>()?;
    let metadata = env.service::<Metadata>()?;
    metadata.create_all(&db).await?;
    metadata.table_names()
}
