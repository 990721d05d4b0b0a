//! The application environment.
//!
//! [`Env`] owns the loaded [`Settings`] and a typed service map. Components
//! provide services (database backend, file storage, ...) during
//! initialization and request handlers look them up by type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{NgwError, NgwResult};
use crate::settings::Settings;

type Service = Arc<dyn Any + Send + Sync>;

/// Settings plus the services contributed by components.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use nextgisweb_core::{Env, Settings};
///
/// struct Clock(u64);
///
/// let mut env = Env::new(Settings::default());
/// env.provide(Arc::new(Clock(42)));
/// assert_eq!(env.service::<Clock>().unwrap().0, 42);
/// ```
pub struct Env {
    settings: Settings,
    services: HashMap<TypeId, Service>,
}

impl Env {
    /// Creates an environment with no services.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            services: HashMap::new(),
        }
    }

    /// Returns the application settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registers a service, replacing any previous service of the same type.
    pub fn provide<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Looks up a service by type.
    pub fn service<T: Send + Sync + 'static>(&self) -> NgwResult<Arc<T>> {
        self.try_service::<T>().ok_or_else(|| {
            NgwError::ImproperlyConfigured(format!(
                "Service '{}' is not available; is its component registered?",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Looks up a service by type, returning `None` if absent.
    pub fn try_service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("settings", &self.settings)
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Storage {
        root: &'static str,
    }

    #[test]
    fn test_provide_and_lookup() {
        let mut env = Env::new(Settings::default());
        env.provide(Arc::new(Storage { root: "/data" }));

        assert_eq!(env.service::<Storage>().unwrap().root, "/data");
    }

    #[test]
    fn test_missing_service() {
        let env = Env::new(Settings::default());
        assert!(env.try_service::<Storage>().is_none());
        assert!(matches!(
            env.service::<Storage>(),
            Err(NgwError::ImproperlyConfigured(_))
        ));
    }

    #[test]
    fn test_provide_replaces() {
        let mut env = Env::new(Settings::default());
        env.provide(Arc::new(Storage { root: "/a" }));
        env.provide(Arc::new(Storage { root: "/b" }));
        assert_eq!(env.service::<Storage>().unwrap().root, "/b");
    }
}
