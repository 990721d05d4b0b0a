//! Security principals.
//!
//! A [`Principal`] is an identity an ACL entry can name. Authentication
//! turns a request into a list of effective principals; authorization
//! matches those principals against ACL entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NgwError;

/// An identity an ACL entry can grant to or deny from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Principal {
    /// Every request, authenticated or not.
    Everyone,
    /// Any request carrying a valid authentication ticket.
    Authenticated,
    /// A specific user.
    User(i64),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Everyone => write!(f, "system.Everyone"),
            Self::Authenticated => write!(f, "system.Authenticated"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl FromStr for Principal {
    type Err = NgwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system.Everyone" => Ok(Self::Everyone),
            "system.Authenticated" => Ok(Self::Authenticated),
            other => other
                .strip_prefix("user:")
                .and_then(|id| id.parse().ok())
                .map(Self::User)
                .ok_or_else(|| {
                    NgwError::SerializationError(format!("Unknown principal '{other}'"))
                }),
        }
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Principal {
    type Error = NgwError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Returns the effective principals of an anonymous request.
pub fn anonymous_principals() -> Vec<Principal> {
    vec![Principal::Everyone]
}

/// Returns the effective principals of an authenticated user.
pub fn user_principals(userid: i64) -> Vec<Principal> {
    vec![
        Principal::Everyone,
        Principal::Authenticated,
        Principal::User(userid),
    ]
}
