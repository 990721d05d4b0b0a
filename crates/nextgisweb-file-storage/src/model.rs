//! The `fileobj` table.

use once_cell::sync::Lazy;

use nextgisweb_core::NgwResult;
use nextgisweb_db::{ColumnDef, ColumnType, Model, ModelMeta, Row, Value};

pub static FILEOBJ_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "fileobj",
    columns: vec![
        ColumnDef::primary_key("id"),
        ColumnDef::new("component", ColumnType::Text),
        ColumnDef::new("uuid", ColumnType::Text),
    ],
    checks: vec![],
});

/// A file kept in durable storage on behalf of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObj {
    pub id: Option<i64>,
    /// Identity of the owning component, the first path segment.
    pub component: String,
    /// Simple (unhyphenated) hex form of a random UUID.
    pub uuid: String,
}

impl Model for FileObj {
    fn meta() -> &'static ModelMeta {
        &FILEOBJ_META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("component", Value::from(self.component.as_str())),
            ("uuid", Value::from(self.uuid.as_str())),
        ]
    }

    fn from_row(row: &Row) -> NgwResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            component: row.get("component")?,
            uuid: row.get("uuid")?,
        })
    }
}
