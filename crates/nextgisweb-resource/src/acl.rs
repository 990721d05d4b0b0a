//! Resource access control lists.
//!
//! Each resource carries a list of [`AclRule`]s. A rule grants or denies a
//! permission (or a whole scope, or everything via `*`) to a principal.
//! When several rules match a request, a deny wins over an allow. When no
//! rule matches, the permission is denied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nextgisweb_core::{NgwError, Principal};

use crate::scope::Permission;

/// Wildcard matching any scope or any permission.
pub const ANY: &str = "*";

/// Whether a rule grants or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    Allow,
    Deny,
}

impl fmt::Display for AclAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

impl FromStr for AclAction {
    type Err = NgwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(NgwError::SerializationError(format!(
                "Unknown ACL action '{other}'"
            ))),
        }
    }
}

/// A single ACL rule.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::Principal;
/// use nextgisweb_resource::acl::AclRule;
/// use nextgisweb_resource::scope::DataScope;
///
/// let rule = AclRule::allow(Principal::Everyone, "data", "*");
/// assert!(rule.matches(DataScope::WRITE, &[Principal::Everyone]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRule {
    pub action: AclAction,
    pub principal: Principal,
    pub scope: String,
    pub permission: String,
}

impl AclRule {
    /// A rule granting `scope.permission` to `principal`.
    pub fn allow(principal: Principal, scope: &str, permission: &str) -> Self {
        Self {
            action: AclAction::Allow,
            principal,
            scope: scope.to_string(),
            permission: permission.to_string(),
        }
    }

    /// A rule denying `scope.permission` to `principal`.
    pub fn deny(principal: Principal, scope: &str, permission: &str) -> Self {
        Self {
            action: AclAction::Deny,
            ..Self::allow(principal, scope, permission)
        }
    }

    /// Returns `true` if the rule applies to the permission for any of the
    /// given principals.
    pub fn matches(&self, permission: Permission, principals: &[Principal]) -> bool {
        principals.contains(&self.principal)
            && (self.scope == ANY || self.scope == permission.scope)
            && (self.permission == ANY || self.permission == permission.name)
    }
}

/// Evaluates `rules` for a permission and a set of effective principals.
pub fn has_permission(rules: &[AclRule], permission: Permission, principals: &[Principal]) -> bool {
    let mut allowed = false;
    for rule in rules.iter().filter(|r| r.matches(permission, principals)) {
        match rule.action {
            AclAction::Deny => return false,
            AclAction::Allow => allowed = true,
        }
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{DataScope, DataStructureScope, ResourceScope};

    fn user() -> Vec<Principal> {
        nextgisweb_core::security::user_principals(7)
    }

    #[test]
    fn test_no_rules_denies() {
        assert!(!has_permission(&[], ResourceScope::READ, &user()));
    }

    #[test]
    fn test_exact_and_wildcard_allow() {
        let rules = vec![AclRule::allow(Principal::Authenticated, "data_structure", "read")];
        assert!(has_permission(&rules, DataStructureScope::READ, &user()));
        assert!(!has_permission(&rules, DataStructureScope::WRITE, &user()));

        let rules = vec![AclRule::allow(Principal::User(7), ANY, ANY)];
        assert!(has_permission(&rules, ResourceScope::CHANGE_PERMISSIONS, &user()));
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let rules = vec![
            AclRule::allow(Principal::Everyone, ANY, ANY),
            AclRule::deny(Principal::User(7), "data", "write"),
        ];
        assert!(!has_permission(&rules, DataScope::WRITE, &user()));
        assert!(has_permission(&rules, DataScope::READ, &user()));
    }

    #[test]
    fn test_principal_must_match() {
        let rules = vec![AclRule::allow(Principal::Authenticated, ANY, ANY)];
        let anonymous = nextgisweb_core::security::anonymous_principals();
        assert!(!has_permission(&rules, DataScope::READ, &anonymous));
    }

    #[test]
    fn test_action_text_form() {
        assert_eq!("deny".parse::<AclAction>().unwrap(), AclAction::Deny);
        assert_eq!(AclAction::Allow.to_string(), "allow");
        assert!("maybe".parse::<AclAction>().is_err());
    }
}
