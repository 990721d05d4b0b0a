//! The `resource` and `resource_acl` tables.
//!
//! [`Resource`] is the base record of every resource class. Subtype tables
//! (`feature_layer`, `feature_layer_style`, ...) share its id and reference
//! it with `ON DELETE CASCADE`, so deleting the base row removes the
//! subtype row and everything hanging off it.

use once_cell::sync::Lazy;

use nextgisweb_core::{NgwResult, Principal};
use nextgisweb_db::{
    delete_model, get_model, insert_model, select_models, update_model, ColumnDef, ColumnType,
    DbExecutor, Model, ModelMeta, OnDelete, Row, Value,
};

use crate::acl::{self, AclRule};
use crate::scope::Permission;

pub static RESOURCE_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "resource",
    columns: vec![
        ColumnDef::primary_key("id"),
        ColumnDef::new("cls", ColumnType::Text),
        ColumnDef::new("parent_id", ColumnType::Integer)
            .nullable()
            .references("resource", "id", OnDelete::Cascade),
        ColumnDef::new("keyname", ColumnType::Text).nullable(),
        ColumnDef::new("display_name", ColumnType::Text),
        ColumnDef::new("owner_user_id", ColumnType::Integer).nullable(),
    ],
    checks: vec![],
});

pub static RESOURCE_ACL_META: Lazy<ModelMeta> = Lazy::new(|| ModelMeta {
    table: "resource_acl",
    columns: vec![
        ColumnDef::primary_key("id"),
        ColumnDef::new("resource_id", ColumnType::Integer)
            .references("resource", "id", OnDelete::Cascade),
        ColumnDef::new("action", ColumnType::Text),
        ColumnDef::new("principal", ColumnType::Text),
        ColumnDef::new("scope", ColumnType::Text),
        ColumnDef::new("permission", ColumnType::Text),
    ],
    checks: vec!["\"action\" IN ('allow', 'deny')".to_string()],
});

/// A persisted, access-controlled entity.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::Principal;
/// use nextgisweb_resource::{AclRule, Resource};
/// use nextgisweb_resource::scope::DataScope;
///
/// let mut res = Resource::new("feature_layer", "Roads");
/// res.acl.push(AclRule::allow(Principal::Everyone, "data", "read"));
/// assert!(res.has_permission(DataScope::READ, &[Principal::Everyone]));
/// assert!(!res.has_permission(DataScope::WRITE, &[Principal::Everyone]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: Option<i64>,
    /// Identity of the resource class.
    pub cls: String,
    pub parent_id: Option<i64>,
    pub keyname: Option<String>,
    pub display_name: String,
    pub owner_user_id: Option<i64>,
    pub acl: Vec<AclRule>,
}

impl Resource {
    /// Creates an unsaved resource of class `cls`.
    pub fn new(cls: &str, display_name: &str) -> Self {
        Self {
            id: None,
            cls: cls.to_string(),
            parent_id: None,
            keyname: None,
            display_name: display_name.to_string(),
            owner_user_id: None,
            acl: Vec::new(),
        }
    }

    /// Evaluates the resource's ACL.
    pub fn has_permission(&self, permission: Permission, principals: &[Principal]) -> bool {
        acl::has_permission(&self.acl, permission, principals)
    }

    /// Loads a resource and its ACL.
    pub async fn load(db: &dyn DbExecutor, id: i64) -> NgwResult<Self> {
        let mut resource: Self = get_model(db, id).await?;
        let rules: Vec<AclRecord> =
            select_models(db, "\"resource_id\" = ?", &[Value::Int(id)], "\"id\"").await?;
        resource.acl = rules
            .into_iter()
            .map(AclRecord::into_rule)
            .collect::<NgwResult<_>>()?;
        Ok(resource)
    }

    /// Inserts or updates the resource and replaces its stored ACL.
    pub async fn save(&mut self, db: &dyn DbExecutor) -> NgwResult<()> {
        if self.id.is_some() {
            update_model(&*self, db).await?;
        } else {
            insert_model(self, db).await?;
        }
        let Some(id) = self.id else {
            return Ok(());
        };

        db.execute_sql(
            "DELETE FROM \"resource_acl\" WHERE \"resource_id\" = ?",
            &[Value::Int(id)],
        )
        .await?;
        for rule in &self.acl {
            let mut record = AclRecord::from_rule(id, rule);
            insert_model(&mut record, db).await?;
        }
        tracing::debug!(id, cls = %self.cls, "Saved resource");
        Ok(())
    }

    /// Deletes the resource. Subtype rows, ACL rules and children go with it.
    pub async fn delete(&self, db: &dyn DbExecutor) -> NgwResult<()> {
        delete_model(self, db).await
    }

    /// Loads the parent resource, if any.
    pub async fn parent(&self, db: &dyn DbExecutor) -> NgwResult<Option<Self>> {
        match self.parent_id {
            Some(id) => Self::load(db, id).await.map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

impl Model for Resource {
    fn meta() -> &'static ModelMeta {
        &RESOURCE_META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("cls", Value::from(self.cls.as_str())),
            ("parent_id", Value::from(self.parent_id)),
            ("keyname", Value::from(self.keyname.clone())),
            ("display_name", Value::from(self.display_name.as_str())),
            ("owner_user_id", Value::from(self.owner_user_id)),
        ]
    }

    fn from_row(row: &Row) -> NgwResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            cls: row.get("cls")?,
            parent_id: row.get("parent_id")?,
            keyname: row.get("keyname")?,
            display_name: row.get("display_name")?,
            owner_user_id: row.get("owner_user_id")?,
            acl: Vec::new(),
        })
    }
}

/// Stored form of an ACL rule.
struct AclRecord {
    id: Option<i64>,
    resource_id: i64,
    action: String,
    principal: String,
    scope: String,
    permission: String,
}

impl AclRecord {
    fn from_rule(resource_id: i64, rule: &AclRule) -> Self {
        Self {
            id: None,
            resource_id,
            action: rule.action.to_string(),
            principal: rule.principal.to_string(),
            scope: rule.scope.clone(),
            permission: rule.permission.clone(),
        }
    }

    fn into_rule(self) -> NgwResult<AclRule> {
        Ok(AclRule {
            action: self.action.parse()?,
            principal: self.principal.parse()?,
            scope: self.scope,
            permission: self.permission,
        })
    }
}

impl Model for AclRecord {
    fn meta() -> &'static ModelMeta {
        &RESOURCE_ACL_META
    }

    fn pk(&self) -> Option<i64> {
        self.id
    }

    fn set_pk(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("resource_id", Value::Int(self.resource_id)),
            ("action", Value::from(self.action.as_str())),
            ("principal", Value::from(self.principal.as_str())),
            ("scope", Value::from(self.scope.as_str())),
            ("permission", Value::from(self.permission.as_str())),
        ]
    }

    fn from_row(row: &Row) -> NgwResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            resource_id: row.get("resource_id")?,
            action: row.get("action")?,
            principal: row.get("principal")?,
            scope: row.get("scope")?,
            permission: row.get("permission")?,
        })
    }
}
