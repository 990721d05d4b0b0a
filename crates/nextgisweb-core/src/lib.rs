//! # nextgisweb-core
//!
//! Core types, settings, component registry, and error types for nextgisweb.
//! This crate has no web or database dependencies and provides the foundation
//! for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Application settings and per-component sections
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`component`] - The [`Component`] trait and the ordered [`ComponentRegistry`]
//! - [`env`] - The [`Env`] service container shared by components and handlers
//! - [`security`] - Security principals used by authentication and ACLs
//! - [`logging`] - Tracing-based logging integration

pub mod component;
pub mod env;
pub mod error;
pub mod logging;
pub mod security;
pub mod settings;
pub mod settings_loader;

pub use component::{Component, ComponentRegistry, SettingInfo};
pub use env::Env;
pub use error::{NgwError, NgwResult, ValidationError};
pub use security::Principal;
pub use settings::Settings;
