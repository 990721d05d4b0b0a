//! Database component and table metadata registry.
//!
//! [`DbComponent`] opens the SQLite database named in the settings and
//! provides the [`SqliteBackend`] and a shared [`Metadata`] to the [`Env`].
//! Components that own tables add their [`ModelMeta`] to the metadata
//! during initialization; `initialize_db` then creates every table in the
//! order they were added.

use std::sync::{Arc, RwLock};

use nextgisweb_core::{Component, Env, NgwError, NgwResult};

use crate::model::ModelMeta;
use crate::sqlite::SqliteBackend;

/// Ordered collection of table definitions.
#[derive(Debug, Default)]
pub struct Metadata {
    tables: RwLock<Vec<&'static ModelMeta>>,
}

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table. Adding the same table twice is a no-op.
    pub fn add(&self, meta: &'static ModelMeta) -> NgwResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        if !tables.iter().any(|t| t.table == meta.table) {
            tables.push(meta);
        }
        Ok(())
    }

    /// Returns the table names in the order they were added.
    pub fn table_names(&self) -> NgwResult<Vec<&'static str>> {
        Ok(self
            .tables
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|t| t.table)
            .collect())
    }

    /// Creates all tables that do not exist yet.
    pub async fn create_all(&self, db: &SqliteBackend) -> NgwResult<()> {
        let tables = self.tables.read().map_err(poisoned)?.clone();
        db.create_tables(&tables).await
    }
}

fn poisoned<T>(_: T) -> NgwError {
    NgwError::InternalServerError("Metadata lock poisoned".to_string())
}

/// The database component (`core`).
#[derive(Debug, Default)]
pub struct DbComponent;

impl Component for DbComponent {
    fn identity(&self) -> &'static str {
        "core"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn initialize(&self, env: &mut Env) -> NgwResult<()> {
        let path = env.settings().database.path.clone();
        let backend = SqliteBackend::open(path)?;
        env.provide(Arc::new(backend));
        env.provide(Arc::new(Metadata::new()));
        Ok(())
    }
}
