//! # nextgisweb-web
//!
//! Web application bootstrap for nextgisweb.
//!
//! ## Modules
//!
//! - [`config`] - The [`Configurator`]: routes, views, static views, policies
//! - [`component`] - The [`WebComponent`] hooks every component may implement
//! - [`pyramid`] - The [`PyramidComponent`] and its `make_app` bootstrapper
//! - [`auth`] - Auth ticket authentication and ACL authorization policies
//! - [`static_key`] - Cache-busting key derived from the package listing
//! - [`request`] - Request extractors for principals, the [`Env`](nextgisweb_core::Env)
//!   and JSON-rejecting body, path and query input
//! - [`error`] - JSON error responses
//! - [`server`] - Serving the built router

// result_large_err: NgwError is the workspace error type and is used consistently
#![allow(clippy::result_large_err)]

pub mod auth;
pub mod component;
pub mod config;
pub mod error;
pub mod pyramid;
pub mod request;
pub mod server;
pub mod static_key;

pub use auth::{
    Ace, AceAction, AcePermission, AclAuthorizationPolicy, AuthTktPolicy, AuthenticationPolicy,
    AuthorizationPolicy,
};
pub use component::WebComponent;
pub use config::{Configurator, Route, Security, StaticView};
pub use error::{ApiError, ApiResult};
pub use pyramid::PyramidComponent;
pub use request::{ApiJson, ApiPath, ApiQuery, Principals, RequestEnv};
pub use static_key::{static_key, CommandListing, ComponentListing, PackageListing};
