//! Layer fields.
//!
//! A [`LayerField`] is one attribute column of a layer. [`LayerFields`] is
//! the ordered field collection of a single layer together with its
//! optional label field. The position of a field in the collection is its
//! `idx`; [`LayerFields::reorder`] writes positions back into `idx`.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

use nextgisweb_core::{NgwError, NgwResult};
use nextgisweb_db::{
    insert_model, select_models, update_model, ColumnDef, ColumnType, DbExecutor, Model,
    ModelMeta, OnDelete, Row, Value,
};

use crate::interface::FieldType;

/// Polymorphic identity of the base field class.
pub const LAYER_FIELD: &str = "layer_field";

pub static LAYER_FIELD_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "layer_field",
    columns: vec![
        ColumnDef::primary_key("id"),
        ColumnDef::new("layer_id", ColumnType::Integer)
            .references("resource", "id", OnDelete::Cascade),
        ColumnDef::new("cls", ColumnType::Text),
        ColumnDef::new("idx", ColumnType::Integer),
        ColumnDef::new("keyname", ColumnType::Text),
        ColumnDef::new("datatype", ColumnType::Text),
        ColumnDef::new("display_name", ColumnType::Text),
        ColumnDef::new("grid_visibility", ColumnType::Boolean).default("1"),
    ],
    checks: vec![FieldType::check_sql("datatype")],
});

/// An attribute definition of a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerField {
    pub id: Option<i64>,
    pub layer_id: Option<i64>,
    pub cls: String,
    pub idx: i64,
    pub keyname: String,
    pub datatype: FieldType,
    pub display_name: String,
    pub grid_visibility: bool,
}

impl LayerField {
    /// Creates an unsaved field of class `cls`.
    pub fn new(cls: &str, datatype: FieldType, keyname: &str) -> Self {
        Self {
            id: None,
            layer_id: None,
            cls: cls.to_string(),
            idx: 0,
            keyname: keyname.to_string(),
            datatype,
            display_name: keyname.to_string(),
            grid_visibility: true,
        }
    }

    pub fn to_dict(&self) -> JsonValue {
        json!({
            "id": self.id,
            "layer_id": self.layer_id,
            "cls": self.cls,
            "idx": self.idx,
            "keyname": self.keyname,
            "datatype": self.datatype,
            "display_name": self.display_name,
            "grid_visibility": self.grid_visibility,
        })
    }
}

impl fmt::Display for LayerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

impl Model for LayerField {
    fn meta() -> &'static ModelMeta {
        &LAYER_FIELD_META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("layer_id", Value::from(self.layer_id)),
            ("cls", Value::from(self.cls.as_str())),
            ("idx", Value::from(self.idx)),
            ("keyname", Value::from(self.keyname.as_str())),
            ("datatype", Value::from(self.datatype.as_str())),
            ("display_name", Value::from(self.display_name.as_str())),
            ("grid_visibility", Value::from(self.grid_visibility)),
        ]
    }

    fn from_row(row: &Row) -> NgwResult<Self> {
        let datatype: String = row.get("datatype")?;
        Ok(Self {
            id: row.get("id")?,
            layer_id: row.get("layer_id")?,
            cls: row.get("cls")?,
            idx: row.get("idx")?,
            keyname: row.get("keyname")?,
            datatype: datatype
                .parse()
                .map_err(|_| NgwError::DatabaseError(format!("Bad field datatype '{datatype}'")))?,
            display_name: row.get("display_name")?,
            grid_visibility: row.get("grid_visibility")?,
        })
    }
}

/// The ordered fields of one layer and its label field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFields {
    fields: Vec<LayerField>,
    label: Option<usize>,
}

impl LayerFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LayerField> {
        self.fields.iter()
    }

    pub fn get(&self, position: usize) -> Option<&LayerField> {
        self.fields.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut LayerField> {
        self.fields.get_mut(position)
    }

    pub fn by_keyname(&self, keyname: &str) -> Option<&LayerField> {
        self.fields.iter().find(|f| f.keyname == keyname)
    }

    /// Appends a field and renumbers.
    pub fn push(&mut self, field: LayerField) {
        self.fields.push(field);
        self.reorder();
    }

    /// Replaces every field and the label reference, then renumbers.
    ///
    /// A label position outside `fields` clears the label.
    pub fn replace(&mut self, fields: Vec<LayerField>, label: Option<usize>) {
        self.label = label.filter(|&i| i < fields.len());
        self.fields = fields;
        self.reorder();
    }

    /// Takes every field out, leaving the collection empty.
    pub fn take(&mut self) -> Vec<LayerField> {
        self.label = None;
        std::mem::take(&mut self.fields)
    }

    /// Sets `idx` of every field to its position.
    pub fn reorder(&mut self) {
        for (idx, field) in (0_i64..).zip(self.fields.iter_mut()) {
            field.idx = idx;
        }
    }

    pub fn label_field(&self) -> Option<&LayerField> {
        self.label.and_then(|i| self.fields.get(i))
    }

    /// Position of the label field.
    pub const fn label_position(&self) -> Option<usize> {
        self.label
    }

    pub fn set_label(&mut self, position: Option<usize>) {
        self.label = position.filter(|&i| i < self.fields.len());
    }

    pub fn is_label(&self, position: usize) -> bool {
        self.label == Some(position)
    }

    /// Loads the fields of a layer ordered by `idx`.
    pub async fn load(
        db: &dyn DbExecutor,
        layer_id: i64,
        label_field_id: Option<i64>,
    ) -> NgwResult<Self> {
        let fields: Vec<LayerField> = select_models(
            db,
            "\"layer_id\" = ?",
            &[Value::Int(layer_id)],
            "\"idx\", \"id\"",
        )
        .await?;
        let label = label_field_id.and_then(|id| fields.iter().position(|f| f.id == Some(id)));
        let mut loaded = Self {
            fields,
            label,
        };
        loaded.reorder();
        Ok(loaded)
    }

    /// Writes the collection as the fields of `layer_id`.
    ///
    /// Stored fields of the layer that are no longer in the collection are
    /// deleted, kept ones are updated in place and new ones inserted.
    /// Returns the id of the label field.
    pub async fn save(&mut self, db: &dyn DbExecutor, layer_id: i64) -> NgwResult<Option<i64>> {
        self.reorder();
        let stored: Vec<LayerField> =
            select_models(db, "\"layer_id\" = ?", &[Value::Int(layer_id)], "\"id\"").await?;
        let kept: HashSet<i64> = self.fields.iter().filter_map(|f| f.id).collect();

        for field in stored.iter().filter(|f| f.id.is_some_and(|id| !kept.contains(&id))) {
            db.execute_sql(
                "DELETE FROM \"layer_field\" WHERE \"id\" = ?",
                &[Value::from(field.id)],
            )
            .await?;
        }

        let stored_ids: HashSet<i64> = stored.iter().filter_map(|f| f.id).collect();
        for field in &mut self.fields {
            field.layer_id = Some(layer_id);
            match field.id {
                Some(id) if stored_ids.contains(&id) => update_model(&*field, db).await?,
                Some(id) => {
                    return Err(NgwError::IntegrityError(format!(
                        "Field {id} does not belong to layer {layer_id}"
                    )))
                }
                None => insert_model(field, db).await?,
            }
        }

        tracing::debug!(layer_id, fields = self.fields.len(), "Saved layer fields");
        Ok(self.label_field().and_then(|f| f.id))
    }
}

impl<'a> IntoIterator for &'a LayerFields {
    type Item = &'a LayerField;
    type IntoIter = std::slice::Iter<'a, LayerField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(keyname: &str) -> LayerField {
        LayerField::new(LAYER_FIELD, FieldType::String, keyname)
    }

    #[test]
    fn test_new_field_defaults() {
        let f = field("name");
        assert_eq!(f.display_name, "name");
        assert!(f.grid_visibility);
        assert_eq!(f.to_string(), "name");
        assert_eq!(
            f.to_dict(),
            json!({
                "id": null, "layer_id": null, "cls": "layer_field", "idx": 0,
                "keyname": "name", "datatype": "STRING", "display_name": "name",
                "grid_visibility": true,
            })
        );
    }

    #[test]
    fn test_push_renumbers() {
        let mut fields = LayerFields::new();
        fields.push(field("a"));
        fields.push(field("b"));
        fields.push(field("c"));
        let idx: Vec<i64> = fields.iter().map(|f| f.idx).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn test_replace_and_label() {
        let mut fields = LayerFields::new();
        fields.replace(vec![field("a"), field("b")], Some(1));
        assert_eq!(fields.label_field().unwrap().keyname, "b");
        assert!(fields.is_label(1));

        fields.replace(vec![field("a")], Some(4));
        assert!(fields.label_field().is_none());

        fields.set_label(Some(0));
        let taken = fields.take();
        assert_eq!(taken.len(), 1);
        assert!(fields.is_empty());
        assert!(fields.label_position().is_none());
    }
}
