//! Component registry.
//!
//! A [`Component`] is a pluggable unit of the application: it reads its own
//! settings section, contributes services to the [`Env`] and, in the web
//! crate, contributes routes. Components are kept in a [`ComponentRegistry`]
//! in registration order, and every lifecycle hook walks them in that order.
//!
//! The registry is generic over the component trait object so that
//! higher-level crates can store richer capability traits (for example a
//! component trait with web hooks) while keeping this crate free of web
//! dependencies.

use std::collections::HashMap;
use std::sync::Arc;

use crate::env::Env;
use crate::error::{NgwError, NgwResult};

/// Describes a settings key consumed by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingInfo {
    /// The key inside the component's settings section.
    pub key: &'static str,
    /// Human-readable description.
    pub desc: &'static str,
}

/// A pluggable application component.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::component::Component;
///
/// struct Audit;
///
/// impl Component for Audit {
///     fn identity(&self) -> &'static str { "audit" }
/// }
/// ```
pub trait Component: Send + Sync {
    /// Returns the unique identity of the component (e.g. "feature_layer").
    fn identity(&self) -> &'static str;

    /// Returns the version reported in the package listing.
    fn version(&self) -> &'static str {
        "0.0.0"
    }

    /// Settings keys understood by this component.
    fn settings_info(&self) -> &'static [SettingInfo] {
        &[]
    }

    /// Called once, in registration order, before the web application is
    /// built. Components provide their services to `env` here.
    fn initialize(&self, _env: &mut Env) -> NgwResult<()> {
        Ok(())
    }
}

/// Ordered registry of components.
pub struct ComponentRegistry<C: ?Sized + Component = dyn Component> {
    components: Vec<Arc<C>>,
    identities: HashMap<&'static str, usize>,
    initialized: bool,
}

impl<C: ?Sized + Component> Default for ComponentRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized + Component> ComponentRegistry<C> {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            identities: HashMap::new(),
            initialized: false,
        }
    }

    /// Registers a component.
    ///
    /// Fails if a component with the same identity is already registered or
    /// the registry has already been initialized.
    pub fn register(&mut self, component: Arc<C>) -> NgwResult<()> {
        if self.initialized {
            return Err(NgwError::ImproperlyConfigured(
                "Cannot register components after initialization".to_string(),
            ));
        }

        let identity = component.identity();
        if self.identities.contains_key(identity) {
            return Err(NgwError::ImproperlyConfigured(format!(
                "Component '{identity}' is already registered"
            )));
        }

        self.identities.insert(identity, self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// Returns the component with the given identity.
    pub fn get(&self, identity: &str) -> Option<&Arc<C>> {
        self.identities
            .get(identity)
            .map(|&idx| &self.components[idx])
    }

    /// Iterates over components in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<C>> {
        self.components.iter()
    }

    /// Returns component identities in registration order.
    pub fn identities(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.identity()).collect()
    }

    /// Returns the number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no components are registered.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Calls [`Component::initialize`] on each component in registration
    /// order. Stops at the first error.
    pub fn initialize(&mut self, env: &mut Env) -> NgwResult<()> {
        if self.initialized {
            return Err(NgwError::ImproperlyConfigured(
                "Components have already been initialized".to_string(),
            ));
        }

        for component in &self.components {
            tracing::debug!(component = component.identity(), "Initializing component");
            component.initialize(env)?;
        }

        self.initialized = true;
        Ok(())
    }

    /// Returns `true` once [`initialize`](Self::initialize) has succeeded.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }
}
