//! Model trait and table metadata.
//!
//! A [`Model`] maps one struct to one table. [`ModelMeta`] describes the
//! table: its columns, foreign keys and checks. The metadata is enough to
//! generate the DDL and the CRUD statements in [`crate::executor`].

use crate::value::{Row, Value};
use nextgisweb_core::NgwResult;

/// The core trait for persisted records.
///
/// # Examples
///
/// ```
/// use nextgisweb_db::model::{ColumnDef, ColumnType, Model, ModelMeta};
/// use nextgisweb_db::value::{Row, Value};
/// use nextgisweb_core::NgwResult;
/// use once_cell::sync::Lazy;
///
/// struct Tag {
///     id: Option<i64>,
///     name: String,
/// }
///
/// static TAG_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
///     table: "tag",
///     columns: vec![
///         ColumnDef::primary_key("id"),
///         ColumnDef::new("name", ColumnType::Text),
///     ],
///     checks: vec![],
/// });
///
/// impl Model for Tag {
///     fn meta() -> &'static ModelMeta { &TAG_META }
///     fn pk(&self) -> Option<i64> { self.id }
///     fn set_pk(&mut self, id: i64) { self.id = Some(id); }
///     fn field_values(&self) -> Vec<(&'static str, Value)> {
///         vec![("name", Value::from(self.name.as_str()))]
///     }
///     fn from_row(row: &Row) -> NgwResult<Self> {
///         Ok(Tag { id: row.get("id")?, name: row.get("name")? })
///     }
/// }
///
/// assert!(Tag::meta().create_table_sql().starts_with("CREATE TABLE IF NOT EXISTS \"tag\""));
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the database table name.
    fn table_name() -> &'static str {
        Self::meta().table
    }

    /// Returns the name of the primary key column.
    fn pk_field_name() -> &'static str {
        "id"
    }

    /// Returns the primary key, or `None` if the record is unsaved.
    fn pk(&self) -> Option<i64>;

    /// Sets the primary key (used after INSERT).
    fn set_pk(&mut self, id: i64);

    /// Returns column name-value pairs excluding the primary key.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Constructs a record from a database row.
    fn from_row(row: &Row) -> NgwResult<Self>
    where
        Self: Sized;
}

/// Table metadata.
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// The table name.
    pub table: &'static str,
    /// Column definitions, in DDL order.
    pub columns: Vec<ColumnDef>,
    /// Table-level CHECK expressions.
    pub checks: Vec<String>,
}

impl ModelMeta {
    /// Returns the column names in DDL order.
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Generates an idempotent `CREATE TABLE` statement.
    pub fn create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnDef::ddl).collect();
        for check in &self.checks {
            parts.push(format!("CHECK ({check})"));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.table,
            parts.join(", ")
        )
    }
}

/// SQL storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `INTEGER` storage.
    Integer,
    /// `TEXT` storage.
    Text,
    /// Boolean, stored as `INTEGER` 0/1.
    Boolean,
    /// `REAL` storage.
    Real,
    /// `BLOB` storage.
    Blob,
}

impl ColumnType {
    /// Returns the SQL type name.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

/// Referential action on delete of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// Refuse the delete.
    Restrict,
    /// No action (SQL default).
    NoAction,
}

impl OnDelete {
    /// Returns the SQL clause.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// The referenced table.
    pub table: &'static str,
    /// The referenced column.
    pub column: &'static str,
    /// Action on delete of the referenced row.
    pub on_delete: OnDelete,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub column_type: ColumnType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether this is the (integer) primary key.
    pub primary_key: bool,
    /// Whether the primary key is assigned by the database.
    pub autoincrement: bool,
    /// SQL default expression.
    pub default: Option<&'static str>,
    /// Foreign key reference.
    pub references: Option<ForeignKey>,
}

impl ColumnDef {
    /// A NOT NULL column without default.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            primary_key: false,
            autoincrement: false,
            default: None,
            references: None,
        }
    }

    /// An auto-assigned integer primary key.
    pub const fn primary_key(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::Integer,
            nullable: false,
            primary_key: true,
            autoincrement: true,
            default: None,
            references: None,
        }
    }

    /// Marks the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets a default expression.
    #[must_use]
    pub const fn default(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    /// Adds a foreign key reference.
    #[must_use]
    pub const fn references(
        mut self,
        table: &'static str,
        column: &'static str,
        on_delete: OnDelete,
    ) -> Self {
        self.references = Some(ForeignKey {
            table,
            column,
            on_delete,
        });
        self
    }

    /// Makes the primary key caller-assigned (joined subtype tables share
    /// the id of their base row).
    #[must_use]
    pub const fn assigned(mut self) -> Self {
        self.autoincrement = false;
        self
    }

    /// Generates the column's DDL fragment.
    pub fn ddl(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.name, self.column_type.sql());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if let Some(fk) = &self.references {
            sql.push_str(&format!(
                " REFERENCES \"{}\" (\"{}\") ON DELETE {}",
                fk.table,
                fk.column,
                fk.on_delete.sql()
            ));
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ddl() {
        assert_eq!(
            ColumnDef::primary_key("id").ddl(),
            "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT"
        );
        assert_eq!(
            ColumnDef::primary_key("id").assigned().ddl(),
            "\"id\" INTEGER PRIMARY KEY"
        );
        assert_eq!(
            ColumnDef::new("keyname", ColumnType::Text).ddl(),
            "\"keyname\" TEXT NOT NULL"
        );
        assert_eq!(
            ColumnDef::new("grid_visibility", ColumnType::Boolean)
                .default("1")
                .ddl(),
            "\"grid_visibility\" INTEGER NOT NULL DEFAULT 1"
        );
        assert_eq!(
            ColumnDef::new("layer_id", ColumnType::Integer)
                .references("resource", "id", OnDelete::Cascade)
                .ddl(),
            "\"layer_id\" INTEGER NOT NULL REFERENCES \"resource\" (\"id\") ON DELETE CASCADE"
        );
        assert_eq!(
            ColumnDef::new("parent_id", ColumnType::Integer).nullable().ddl(),
            "\"parent_id\" INTEGER"
        );
    }

    #[test]
    fn test_create_table_sql_with_check() {
        let meta = ModelMeta {
            table: "t",
            columns: vec![
                ColumnDef::primary_key("id"),
                ColumnDef::new("kind", ColumnType::Text),
            ],
            checks: vec!["\"kind\" IN ('a', 'b')".to_string()],
        };
        assert_eq!(
            meta.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"t\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"kind\" TEXT NOT NULL, CHECK (\"kind\" IN ('a', 'b')))"
        );
        assert_eq!(meta.column_names(), vec!["id", "kind"]);
    }
}
