//! Resource serializers.
//!
//! A [`Serializer`] turns a resource object into its wire form and applies
//! a wire payload back onto it. The wire form is nested under the
//! serializer's identity:
//!
//! ```json
//! {"feature_layer": {"fields": [...]}}
//! ```
//!
//! Each [`SerializedProperty`] declares the permission needed to read it and
//! the permission needed to write it. Properties the caller may not read are
//! left out of [`Serializer::serialize`]; writing a property the caller may
//! not write fails the whole [`Serializer::deserialize`] before anything is
//! applied.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use nextgisweb_core::{Env, NgwError, NgwResult, Principal, ValidationError};

use crate::model::Resource;
use crate::scope::Permission;

/// An in-memory object backed by a [`Resource`] record.
pub trait ResourceObject: Send + Sync {
    /// Returns the base resource record.
    fn resource(&self) -> &Resource;
}

impl ResourceObject for Resource {
    fn resource(&self) -> &Resource {
        self
    }
}

/// A single serialized attribute of a resource object.
#[async_trait]
pub trait SerializedProperty<R: ResourceObject>: Send + Sync {
    /// Key of the property inside the serializer section.
    fn name(&self) -> &'static str;

    /// Permission needed to read; `None` makes the property write-only.
    fn read(&self) -> Option<Permission> {
        None
    }

    /// Permission needed to write; `None` makes the property read-only.
    fn write(&self) -> Option<Permission> {
        None
    }

    /// Produces the wire value.
    fn getter(&self, _obj: &R) -> NgwResult<JsonValue> {
        Ok(JsonValue::Null)
    }

    /// Applies a wire value.
    async fn setter(&self, _obj: &mut R, _value: &JsonValue, _env: &Env) -> NgwResult<()> {
        Err(read_only(self.name()))
    }
}

fn read_only(name: &str) -> NgwError {
    ValidationError::new(format!("Attribute '{name}' is read-only."), "invalid")
        .with_param("attr", name)
        .into()
}

/// An ordered set of properties under one identity.
pub struct Serializer<R: ResourceObject> {
    identity: &'static str,
    properties: Vec<Box<dyn SerializedProperty<R>>>,
}

impl<R: ResourceObject> Serializer<R> {
    /// Creates a serializer with no properties.
    pub fn new(identity: &'static str) -> Self {
        Self {
            identity,
            properties: Vec::new(),
        }
    }

    /// Appends a property.
    #[must_use]
    pub fn property(mut self, property: impl SerializedProperty<R> + 'static) -> Self {
        self.properties.push(Box::new(property));
        self
    }

    pub const fn identity(&self) -> &'static str {
        self.identity
    }

    /// Names of the properties in declaration order.
    pub fn property_names(&self) -> Vec<&'static str> {
        self.properties.iter().map(|p| p.name()).collect()
    }

    /// Serializes every property readable by `principals`.
    pub fn serialize(&self, obj: &R, principals: &[Principal]) -> NgwResult<JsonValue> {
        let resource = obj.resource();
        let mut section = Map::new();
        for property in &self.properties {
            let Some(permission) = property.read() else {
                continue;
            };
            if resource.has_permission(permission, principals) {
                section.insert(property.name().to_string(), property.getter(obj)?);
            }
        }

        let mut out = Map::new();
        out.insert(self.identity.to_string(), JsonValue::Object(section));
        Ok(JsonValue::Object(out))
    }

    /// Applies the properties present in `data[identity]`.
    ///
    /// A missing section is a no-op. Keys that name no property are ignored.
    pub async fn deserialize(
        &self,
        obj: &mut R,
        data: &JsonValue,
        principals: &[Principal],
        env: &Env,
    ) -> NgwResult<()> {
        let Some(section) = data.get(self.identity) else {
            return Ok(());
        };
        let section = section.as_object().ok_or_else(|| {
            NgwError::from(ValidationError::new(
                format!("Section '{}' must be an object.", self.identity),
                "invalid",
            ))
        })?;

        let present: Vec<_> = self
            .properties
            .iter()
            .filter(|p| section.contains_key(p.name()))
            .collect();

        let resource = obj.resource();
        for property in &present {
            let permission = property.write().ok_or_else(|| read_only(property.name()))?;
            if !resource.has_permission(permission, principals) {
                return Err(NgwError::PermissionDenied(format!(
                    "Permission '{permission}' is required to write '{}.{}'",
                    self.identity,
                    property.name()
                )));
            }
        }

        for property in present {
            if let Some(value) = section.get(property.name()) {
                property.setter(obj, value, env).await?;
            }
        }
        tracing::debug!(identity = self.identity, "Deserialized resource data");
        Ok(())
    }
}

impl<R: ResourceObject> std::fmt::Debug for Serializer<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("identity", &self.identity)
            .field("properties", &self.property_names())
            .finish()
    }
}
