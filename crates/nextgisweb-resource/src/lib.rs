//! # nextgisweb-resource
//!
//! Resources are the persisted, access-controlled entities of the platform:
//! layer, style and group records all share the `resource` base table and
//! its ACL.
//!
//! ## Modules
//!
//! - [`scope`] - Permission scopes and their permissions
//! - [`acl`] - ACL rules and their evaluation
//! - [`model`] - The [`Resource`] record and its persistence
//! - [`registry`] - Resource classes, interfaces and parent checks
//! - [`serializer`] - [`Serializer`] and [`SerializedProperty`]
//! - [`component`] - The `resource` component

#![allow(clippy::result_large_err)]

pub mod acl;
pub mod component;
pub mod model;
pub mod registry;
pub mod scope;
pub mod serializer;

pub use acl::{AclAction, AclRule};
pub use component::ResourceComponent;
pub use model::Resource;
pub use registry::{Interface, ResourceClass, ResourceRegistry};
pub use scope::{DataScope, DataStructureScope, Permission, ResourceScope, Scope};
pub use serializer::{ResourceObject, SerializedProperty, Serializer};
