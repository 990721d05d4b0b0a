//! Permission scopes.
//!
//! A [`Scope`] groups related permissions under an identity. A
//! [`Permission`] is always written as `scope.name`, e.g.
//! `data_structure.write`.

use std::fmt;
use std::str::FromStr;

use nextgisweb_core::NgwError;

/// A single permission within a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    /// Identity of the scope the permission belongs to.
    pub scope: &'static str,
    /// Name of the permission inside its scope.
    pub name: &'static str,
}

impl Permission {
    /// Creates a permission.
    pub const fn new(scope: &'static str, name: &'static str) -> Self {
        Self { scope, name }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

impl FromStr for Permission {
    type Err = NgwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scope, name) = s
            .split_once('.')
            .ok_or_else(|| NgwError::SerializationError(format!("Invalid permission '{s}'")))?;
        SCOPES
            .iter()
            .filter(|sc| sc.identity == scope)
            .flat_map(|sc| sc.permissions.iter())
            .find(|p| p.name == name)
            .copied()
            .ok_or_else(|| NgwError::SerializationError(format!("Unknown permission '{s}'")))
    }
}

/// A named group of permissions.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    /// Scope identity, the prefix of its permissions.
    pub identity: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Permissions of the scope in declaration order.
    pub permissions: &'static [Permission],
}

impl Scope {
    /// Returns the permission with the given name.
    pub fn permission(&self, name: &str) -> Option<Permission> {
        self.permissions.iter().find(|p| p.name == name).copied()
    }
}

/// Permissions on the resource itself.
pub struct ResourceScope;

impl ResourceScope {
    pub const IDENTITY: &'static str = "resource";
    pub const READ: Permission = Permission::new(Self::IDENTITY, "read");
    pub const CREATE: Permission = Permission::new(Self::IDENTITY, "create");
    pub const UPDATE: Permission = Permission::new(Self::IDENTITY, "update");
    pub const DELETE: Permission = Permission::new(Self::IDENTITY, "delete");
    pub const MANAGE_CHILDREN: Permission = Permission::new(Self::IDENTITY, "manage_children");
    pub const CHANGE_PERMISSIONS: Permission =
        Permission::new(Self::IDENTITY, "change_permissions");

    pub const SCOPE: Scope = Scope {
        identity: Self::IDENTITY,
        label: "Resource",
        permissions: &[
            Self::READ,
            Self::CREATE,
            Self::UPDATE,
            Self::DELETE,
            Self::MANAGE_CHILDREN,
            Self::CHANGE_PERMISSIONS,
        ],
    };
}

/// Permissions on the data a resource holds.
pub struct DataScope;

impl DataScope {
    pub const IDENTITY: &'static str = "data";
    pub const READ: Permission = Permission::new(Self::IDENTITY, "read");
    pub const WRITE: Permission = Permission::new(Self::IDENTITY, "write");

    pub const SCOPE: Scope = Scope {
        identity: Self::IDENTITY,
        label: "Data",
        permissions: &[Self::READ, Self::WRITE],
    };
}

/// Permissions on the structure of data (the field schema of a layer).
pub struct DataStructureScope;

impl DataStructureScope {
    pub const IDENTITY: &'static str = "data_structure";
    pub const READ: Permission = Permission::new(Self::IDENTITY, "read");
    pub const WRITE: Permission = Permission::new(Self::IDENTITY, "write");

    pub const SCOPE: Scope = Scope {
        identity: Self::IDENTITY,
        label: "Data structure",
        permissions: &[Self::READ, Self::WRITE],
    };
}

/// All known scopes.
pub const SCOPES: &[Scope] = &[
    ResourceScope::SCOPE,
    DataScope::SCOPE,
    DataStructureScope::SCOPE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_text_form() {
        assert_eq!(DataStructureScope::WRITE.to_string(), "data_structure.write");
        assert_eq!(
            "resource.change_permissions".parse::<Permission>().unwrap(),
            ResourceScope::CHANGE_PERMISSIONS
        );
    }

    #[test]
    fn test_unknown_permission() {
        assert!("data.delete".parse::<Permission>().is_err());
        assert!("nodot".parse::<Permission>().is_err());
    }

    #[test]
    fn test_scope_lookup() {
        assert_eq!(DataScope::SCOPE.permission("read"), Some(DataScope::READ));
        assert_eq!(ResourceScope::SCOPE.permissions.len(), 6);
        assert!(DataScope::SCOPE.permission("manage_children").is_none());
    }
}
