//! Authentication and authorization policies.
//!
//! [`AuthTktPolicy`] keeps the authenticated user id in a signed `auth_tkt`
//! cookie: `{userid}:{issued}:{signature}`, where `issued` is a Unix
//! timestamp and `signature` is the URL-safe base64 HMAC-SHA256 of
//! `{userid}:{issued}` keyed by the application secret.
//!
//! [`AclAuthorizationPolicy`] evaluates an ordered ACL of
//! `(Allow | Deny, principal, permission)` entries. The first entry that
//! matches one of the request's principals decides; no match denies.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use sha2::Sha256;

use nextgisweb_core::security::{anonymous_principals, user_principals};
use nextgisweb_core::Principal;

type HmacSha256 = Hmac<Sha256>;

/// Default name of the ticket cookie.
pub const AUTH_TKT_COOKIE: &str = "auth_tkt";

/// Turns request headers into an identity.
pub trait AuthenticationPolicy: Send + Sync {
    /// Returns the id of the authenticated user, if any.
    fn authenticated_userid(&self, headers: &HeaderMap) -> Option<i64>;

    /// Returns every principal the request acts as.
    fn effective_principals(&self, headers: &HeaderMap) -> Vec<Principal> {
        self.authenticated_userid(headers)
            .map_or_else(anonymous_principals, user_principals)
    }

    /// Returns `Set-Cookie` headers that log `userid` in.
    fn remember(&self, userid: i64) -> Vec<(http::HeaderName, HeaderValue)>;

    /// Returns `Set-Cookie` headers that log the current user out.
    fn forget(&self) -> Vec<(http::HeaderName, HeaderValue)>;
}

/// Decides whether principals hold a permission under an ACL.
pub trait AuthorizationPolicy: Send + Sync {
    fn permits(&self, acl: &[Ace], principals: &[Principal], permission: &str) -> bool;
}

/// Signed-cookie authentication.
pub struct AuthTktPolicy {
    secret: String,
    cookie_name: String,
    timeout: Option<u64>,
    secure: bool,
}

impl AuthTktPolicy {
    /// Creates a policy keyed by `secret` with no ticket timeout.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: AUTH_TKT_COOKIE.to_string(),
            timeout: None,
            secure: false,
        }
    }

    /// Rejects tickets older than `seconds`.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: Option<u64>) -> Self {
        self.timeout = seconds;
        self
    }

    /// Marks the cookie `Secure`.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key size")
    }

    /// Builds a ticket for `userid` issued at `issued`.
    pub fn ticket(&self, userid: i64, issued: u64) -> String {
        let payload = format!("{userid}:{issued}");
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload}:{signature}")
    }

    /// Verifies a ticket at time `now`, returning its user id.
    pub fn verify_ticket(&self, ticket: &str, now: u64) -> Option<i64> {
        let (payload, signature) = ticket.rsplit_once(':')?;
        let (userid, issued) = payload.split_once(':')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let issued: u64 = issued.parse().ok()?;
        if let Some(timeout) = self.timeout {
            if now.saturating_sub(issued) > timeout {
                return None;
            }
        }
        userid.parse().ok()
    }

    /// Like [`AuthenticationPolicy::authenticated_userid`] at a fixed time.
    pub fn authenticated_userid_at(&self, headers: &HeaderMap, now: u64) -> Option<i64> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|part| part.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .and_then(|(_, value)| self.verify_ticket(value, now))
    }

    fn cookie(&self, value: &str, max_age: Option<u64>) -> Option<HeaderValue> {
        let mut cookie = format!("{}={value}; Path=/; HttpOnly; SameSite=Lax", self.cookie_name);
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

impl AuthenticationPolicy for AuthTktPolicy {
    fn authenticated_userid(&self, headers: &HeaderMap) -> Option<i64> {
        self.authenticated_userid_at(headers, now())
    }

    fn remember(&self, userid: i64) -> Vec<(http::HeaderName, HeaderValue)> {
        self.cookie(&self.ticket(userid, now()), self.timeout)
            .map(|v| (SET_COOKIE, v))
            .into_iter()
            .collect()
    }

    fn forget(&self) -> Vec<(http::HeaderName, HeaderValue)> {
        self.cookie("", Some(0))
            .map(|v| (SET_COOKIE, v))
            .into_iter()
            .collect()
    }
}

impl std::fmt::Debug for AuthTktPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTktPolicy")
            .field("cookie_name", &self.cookie_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Action of an ACL entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AceAction {
    Allow,
    Deny,
}

/// Permission named by an ACL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcePermission {
    Named(String),
    All,
}

/// A single ACL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    pub action: AceAction,
    pub principal: Principal,
    pub permission: AcePermission,
}

impl Ace {
    pub fn allow(principal: Principal, permission: AcePermission) -> Self {
        Self {
            action: AceAction::Allow,
            principal,
            permission,
        }
    }

    pub fn deny(principal: Principal, permission: AcePermission) -> Self {
        Self {
            action: AceAction::Deny,
            principal,
            permission,
        }
    }

    fn covers(&self, permission: &str) -> bool {
        match &self.permission {
            AcePermission::All => true,
            AcePermission::Named(name) => name == permission,
        }
    }
}

/// First-match ACL evaluation.
///
/// This is the framework-level policy, consulted through
/// [`Security::permits`](crate::Security::permits) with an ACL the caller
/// supplies. Resource permissions are evaluated separately by
/// `nextgisweb_resource::AclRule` over the resource tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct AclAuthorizationPolicy;

impl AuthorizationPolicy for AclAuthorizationPolicy {
    fn permits(&self, acl: &[Ace], principals: &[Principal], permission: &str) -> bool {
        acl.iter()
            .find(|ace| principals.contains(&ace.principal) && ace.covers(permission))
            .is_some_and(|ace| ace.action == AceAction::Allow)
    }
}
