//! Resource class registry.
//!
//! Every concrete resource type registers a [`ResourceClass`]: its identity
//! (stored in `resource.cls`), display name, permission scope, the
//! interfaces it provides, and the interface its parent must provide.
//! Components register their classes during initialization.

use std::collections::HashMap;
use std::sync::RwLock;

use nextgisweb_core::{NgwError, NgwResult, ValidationError};

use crate::model::Resource;

/// A marker naming a capability a resource class provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interface(pub &'static str);

/// Static description of a resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceClass {
    pub identity: &'static str,
    pub display_name: &'static str,
    /// Identity of the class's main permission scope.
    pub scope: &'static str,
    pub interfaces: &'static [Interface],
    /// Interface a parent must provide, or `None` if any parent is fine.
    pub parent_interface: Option<Interface>,
}

impl ResourceClass {
    /// Returns `true` if the class provides `interface`.
    pub fn provides(&self, interface: Interface) -> bool {
        self.interfaces.contains(&interface)
    }
}

/// The generic container class.
pub const RESOURCE_GROUP: ResourceClass = ResourceClass {
    identity: "resource_group",
    display_name: "Resource group",
    scope: crate::scope::ResourceScope::IDENTITY,
    interfaces: &[],
    parent_interface: None,
};

/// Registered resource classes, keyed by identity.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    classes: RwLock<HashMap<&'static str, ResourceClass>>,
}

impl ResourceRegistry {
    /// Creates a registry holding only [`RESOURCE_GROUP`].
    pub fn new() -> Self {
        let registry = Self::default();
        if let Ok(mut classes) = registry.classes.write() {
            classes.insert(RESOURCE_GROUP.identity, RESOURCE_GROUP);
        }
        registry
    }

    /// Registers a class. Re-registering an identity is an error.
    pub fn register(&self, class: ResourceClass) -> NgwResult<()> {
        let mut classes = self.classes.write().map_err(poisoned)?;
        if classes.contains_key(class.identity) {
            return Err(NgwError::ImproperlyConfigured(format!(
                "Resource class '{}' is already registered",
                class.identity
            )));
        }
        tracing::debug!(cls = class.identity, "Registered resource class");
        classes.insert(class.identity, class);
        Ok(())
    }

    /// Returns the class with the given identity.
    pub fn get(&self, identity: &str) -> NgwResult<ResourceClass> {
        self.classes
            .read()
            .map_err(poisoned)?
            .get(identity)
            .copied()
            .ok_or_else(|| NgwError::NotFound(format!("Unknown resource class '{identity}'")))
    }

    /// Returns `true` if `resource`'s class provides `interface`.
    pub fn provided_by(&self, interface: Interface, resource: &Resource) -> NgwResult<bool> {
        Ok(self.get(&resource.cls)?.provides(interface))
    }

    /// Checks that a resource of class `cls` may be created under `parent`.
    pub fn check_parent(&self, cls: &str, parent: Option<&Resource>) -> NgwResult<()> {
        let class = self.get(cls)?;
        let Some(required) = class.parent_interface else {
            return Ok(());
        };
        let allowed = match parent {
            Some(parent) => self.provided_by(required, parent)?,
            None => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!(
                    "Resource of class '{cls}' can not be a child of {}.",
                    parent.map_or("nothing", |p| p.cls.as_str())
                ),
                "invalid",
            )
            .into())
        }
    }
}

fn poisoned<T>(_: T) -> NgwError {
    NgwError::InternalServerError("Resource registry lock poisoned".to_string())
}
