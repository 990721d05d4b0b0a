//! # nextgisweb-db
//!
//! Relational storage for nextgisweb models.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`] enum, [`Row`] and [`FromValue`]
//! - [`model`] - The [`Model`] trait, [`ModelMeta`] and column definitions
//! - [`executor`] - The async [`DbExecutor`] trait and model CRUD functions
//! - [`sqlite`] - The `rusqlite`-based [`SqliteBackend`] and its [`Transaction`]
//! - [`component`] - The [`DbComponent`] and the shared table [`Metadata`]

// result_large_err: NgwError is the workspace error type and is used consistently
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]

pub mod component;
pub mod executor;
pub mod model;
pub mod sqlite;
pub mod value;

pub use component::{DbComponent, Metadata};
pub use executor::{
    delete_model, get_model, insert_model, select_models, update_model, DbExecutor,
};
pub use model::{ColumnDef, ColumnType, ForeignKey, Model, ModelMeta, OnDelete};
pub use sqlite::{SqliteBackend, Transaction};
pub use value::{FromValue, Row, Value};
