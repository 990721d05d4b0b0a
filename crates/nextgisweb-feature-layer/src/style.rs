//! Feature layer styles.
//!
//! A style is a child resource of a feature layer holding an uploaded style
//! file. The file lives in durable storage under the `feature_layer`
//! component.

use once_cell::sync::Lazy;

use nextgisweb_core::{NgwError, NgwResult};
use nextgisweb_db::{
    get_model, insert_model, ColumnDef, ColumnType, DbExecutor, ModelMeta, OnDelete, Value,
};
use nextgisweb_file_storage::FileObj;
use nextgisweb_resource::{DataScope, Resource, ResourceClass, ResourceObject, ResourceRegistry};

use crate::interface::{IFEATURE_LAYER, IFEATURE_LAYER_STYLE};
use crate::layer::FeatureLayer;

pub const FEATURE_LAYER_STYLE: ResourceClass = ResourceClass {
    identity: "feature_layer_style",
    display_name: "Feature layer style",
    scope: DataScope::IDENTITY,
    interfaces: &[IFEATURE_LAYER_STYLE],
    parent_interface: Some(IFEATURE_LAYER),
};

pub static FEATURE_LAYER_STYLE_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "feature_layer_style",
    columns: vec![
        ColumnDef::primary_key("id")
            .assigned()
            .references("resource", "id", OnDelete::Cascade),
        ColumnDef::new("fileobj_id", ColumnType::Integer)
            .nullable()
            .references("fileobj", "id", OnDelete::NoAction),
    ],
    checks: vec![],
});

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureLayerStyle {
    pub resource: Resource,
    pub fileobj: Option<FileObj>,
}

impl FeatureLayerStyle {
    /// Creates an unsaved style under `parent`.
    ///
    /// The parent must be saved and provide the feature layer interface.
    pub fn new(
        registry: &ResourceRegistry,
        parent: &Resource,
        display_name: &str,
    ) -> NgwResult<Self> {
        registry.check_parent(FEATURE_LAYER_STYLE.identity, Some(parent))?;
        let parent_id = parent.id.ok_or_else(|| {
            NgwError::validation("Parent resource must be saved before adding a style.")
        })?;

        let mut resource = Resource::new(FEATURE_LAYER_STYLE.identity, display_name);
        resource.parent_id = Some(parent_id);
        Ok(Self {
            resource,
            fileobj: None,
        })
    }

    /// Spatial reference system of the parent layer.
    pub async fn srs(&self, db: &dyn DbExecutor) -> NgwResult<i64> {
        let parent_id = self
            .resource
            .parent_id
            .ok_or_else(|| NgwError::DoesNotExist("Style has no parent layer".to_string()))?;
        Ok(FeatureLayer::load(db, parent_id).await?.srs_id)
    }

    pub async fn load(db: &dyn DbExecutor, id: i64) -> NgwResult<Self> {
        let resource = Resource::load(db, id).await?;
        if resource.cls != FEATURE_LAYER_STYLE.identity {
            return Err(NgwError::NotFound(format!(
                "Resource {id} is not a feature layer style"
            )));
        }
        let row = db
            .query_one(
                "SELECT \"fileobj_id\" FROM \"feature_layer_style\" WHERE \"id\" = ?",
                &[Value::Int(id)],
            )
            .await?;
        let fileobj = match row.get::<Option<i64>>("fileobj_id")? {
            Some(fileobj_id) => Some(get_model::<FileObj>(db, fileobj_id).await?),
            None => None,
        };
        Ok(Self { resource, fileobj })
    }

    pub async fn save(&mut self, db: &dyn DbExecutor) -> NgwResult<()> {
        if let Some(fileobj) = self.fileobj.as_mut().filter(|f| f.id.is_none()) {
            insert_model(fileobj, db).await?;
        }
        self.resource.save(db).await?;
        let id = self
            .resource
            .id
            .ok_or_else(|| NgwError::DatabaseError("Saved resource has no id".to_string()))?;

        let fileobj_id = self.fileobj.as_ref().and_then(|f| f.id);
        db.execute_sql(
            "INSERT INTO \"feature_layer_style\" (\"id\", \"fileobj_id\") VALUES (?, ?) \
             ON CONFLICT (\"id\") DO UPDATE SET \"fileobj_id\" = excluded.\"fileobj_id\"",
            &[Value::Int(id), Value::from(fileobj_id)],
        )
        .await?;
        tracing::debug!(id, ?fileobj_id, "Saved feature layer style");
        Ok(())
    }

    pub async fn delete(&self, db: &dyn DbExecutor) -> NgwResult<()> {
        self.resource.delete(db).await
    }
}

impl ResourceObject for FeatureLayerStyle {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}
