//! Feature layers.

use once_cell::sync::Lazy;

use nextgisweb_core::{NgwError, NgwResult};
use nextgisweb_db::{ColumnDef, ColumnType, DbExecutor, ModelMeta, OnDelete, Value};
use nextgisweb_resource::{DataStructureScope, Resource, ResourceClass, ResourceObject, Scope};

use crate::field::{LayerFields, LAYER_FIELD};
use crate::interface::IFEATURE_LAYER;

/// Contract of resource types that own a field schema.
pub trait LayerFieldsMixin: ResourceObject {
    /// Class identity given to fields created through the serializer.
    const FIELD_CLASS: &'static str = LAYER_FIELD;

    /// Scope guarding the field schema.
    const SCOPE: Scope = DataStructureScope::SCOPE;

    fn fields(&self) -> &LayerFields;

    fn fields_mut(&mut self) -> &mut LayerFields;
}

pub const FEATURE_LAYER: ResourceClass = ResourceClass {
    identity: "feature_layer",
    display_name: "Feature layer",
    scope: DataStructureScope::IDENTITY,
    interfaces: &[IFEATURE_LAYER],
    parent_interface: None,
};

pub static FEATURE_LAYER_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "feature_layer",
    columns: vec![
        ColumnDef::primary_key("id")
            .assigned()
            .references("resource", "id", OnDelete::Cascade),
        ColumnDef::new("srs_id", ColumnType::Integer),
        ColumnDef::new("feature_label_field_id", ColumnType::Integer)
            .nullable()
            .references("layer_field", "id", OnDelete::SetNull),
    ],
    checks: vec![],
});

/// A vector layer: a resource with a spatial reference system and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayer {
    pub resource: Resource,
    pub srs_id: i64,
    pub fields: LayerFields,
}

impl FeatureLayer {
    /// Creates an unsaved layer without fields.
    pub fn new(display_name: &str, srs_id: i64) -> Self {
        Self {
            resource: Resource::new(FEATURE_LAYER.identity, display_name),
            srs_id,
            fields: LayerFields::new(),
        }
    }

    pub const fn id(&self) -> Option<i64> {
        self.resource.id
    }

    /// Loads a layer with its ACL and fields.
    pub async fn load(db: &dyn DbExecutor, id: i64) -> NgwResult<Self> {
        let resource = Resource::load(db, id).await?;
        if resource.cls != FEATURE_LAYER.identity {
            return Err(NgwError::NotFound(format!(
                "Resource {id} is not a feature layer"
            )));
        }
        let row = db
            .query_one(
                "SELECT \"srs_id\", \"feature_label_field_id\" FROM \"feature_layer\" WHERE \"id\" = ?",
                &[Value::Int(id)],
            )
            .await?;
        let label_field_id: Option<i64> = row.get("feature_label_field_id")?;
        let fields = LayerFields::load(db, id, label_field_id).await?;
        Ok(Self {
            resource,
            srs_id: row.get("srs_id")?,
            fields,
        })
    }

    /// Saves the resource record, the layer row and the fields.
    pub async fn save(&mut self, db: &dyn DbExecutor) -> NgwResult<()> {
        self.resource.save(db).await?;
        let id = self
            .resource
            .id
            .ok_or_else(|| NgwError::DatabaseError("Saved resource has no id".to_string()))?;

        db.execute_sql(
            "INSERT INTO \"feature_layer\" (\"id\", \"srs_id\") VALUES (?, ?) \
             ON CONFLICT (\"id\") DO UPDATE SET \"srs_id\" = excluded.\"srs_id\"",
            &[Value::Int(id), Value::Int(self.srs_id)],
        )
        .await?;
        let label_field_id = self.fields.save(db, id).await?;
        db.execute_sql(
            "UPDATE \"feature_layer\" SET \"feature_label_field_id\" = ? WHERE \"id\" = ?",
            &[Value::from(label_field_id), Value::Int(id)],
        )
        .await?;
        Ok(())
    }

    /// Deletes the layer. Its fields and styles are removed by cascade.
    pub async fn delete(&self, db: &dyn DbExecutor) -> NgwResult<()> {
        self.resource.delete(db).await
    }
}

impl ResourceObject for FeatureLayer {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

impl LayerFieldsMixin for FeatureLayer {
    fn fields(&self) -> &LayerFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut LayerFields {
        &mut self.fields
    }
}

impl std::fmt::Display for FeatureLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.resource, f)
    }
}
