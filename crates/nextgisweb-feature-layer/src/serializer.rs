//! Serializers of feature layers and styles.
//!
//! The field schema travels as an ordered list under
//! `feature_layer.fields`:
//!
//! ```json
//! {"feature_layer": {"fields": [
//!     {"id": 1, "keyname": "name", "display_name": "Name", "label_field": true},
//!     {"keyname": "population", "datatype": "INTEGER"}
//! ]}}
//! ```
//!
//! On write, entries with an `id` update the existing field, entries
//! without one create a field, and existing fields that are not listed are
//! dropped. List order becomes field order.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};

use nextgisweb_core::{Env, NgwError, NgwResult, ValidationError};
use nextgisweb_file_storage::{FileStorage, FileUpload};
use nextgisweb_resource::{DataStructureScope, Permission, ResourceScope, SerializedProperty, Serializer};

use crate::field::LayerField;
use crate::interface::FieldType;
use crate::layer::LayerFieldsMixin;
use crate::style::FeatureLayerStyle;

/// Component identity owning stored style files.
pub const FILE_COMPONENT: &str = "feature_layer";

fn invalid(message: impl Into<String>) -> NgwError {
    ValidationError::new(message, "invalid").into()
}

/// The `fields` property of layers with a field schema.
pub struct FieldsAttr<R>(PhantomData<fn() -> R>);

impl<R> Default for FieldsAttr<R> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<R: LayerFieldsMixin + 'static> SerializedProperty<R> for FieldsAttr<R> {
    fn name(&self) -> &'static str {
        "fields"
    }

    fn read(&self) -> Option<Permission> {
        Some(DataStructureScope::READ)
    }

    fn write(&self) -> Option<Permission> {
        Some(DataStructureScope::WRITE)
    }

    fn getter(&self, obj: &R) -> NgwResult<JsonValue> {
        let fields = obj.fields();
        Ok(JsonValue::Array(
            fields
                .iter()
                .enumerate()
                .map(|(position, f)| {
                    json!({
                        "id": f.id,
                        "keyname": f.keyname,
                        "datatype": f.datatype,
                        "typemod": null,
                        "display_name": f.display_name,
                        "label_field": fields.is_label(position),
                        "grid_visibility": f.grid_visibility,
                    })
                })
                .collect(),
        ))
    }

    async fn setter(&self, obj: &mut R, value: &JsonValue, _env: &Env) -> NgwResult<()> {
        let (fields, label) = apply_fields(obj.fields().iter().cloned().collect(), value, R::FIELD_CLASS)?;
        obj.fields_mut().replace(fields, label);
        Ok(())
    }
}

fn optional_str<'a>(descriptor: &'a Map<String, JsonValue>, key: &str) -> NgwResult<Option<&'a str>> {
    match descriptor.get(key) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(format!("Field attribute '{key}' must be a string."))),
    }
}

fn optional_bool(descriptor: &Map<String, JsonValue>, key: &str) -> NgwResult<Option<bool>> {
    match descriptor.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(format!("Field attribute '{key}' must be a boolean."))),
    }
}

/// Applies a field list payload to `current` and returns the new field
/// list with the position of the label field.
///
/// Nothing is changed unless the whole payload is valid.
pub fn apply_fields(
    current: Vec<LayerField>,
    value: &JsonValue,
    field_class: &str,
) -> NgwResult<(Vec<LayerField>, Option<usize>)> {
    let descriptors = value
        .as_array()
        .ok_or_else(|| invalid("Fields must be a list."))?;

    let mut by_id: HashMap<i64, LayerField> = current
        .into_iter()
        .filter_map(|f| f.id.map(|id| (id, f)))
        .collect();

    let mut fields = Vec::with_capacity(descriptors.len());
    let mut label = None;

    for descriptor in descriptors {
        let descriptor = descriptor
            .as_object()
            .ok_or_else(|| invalid("Field descriptor must be an object."))?;

        let mut field = match descriptor.get("id") {
            None | Some(JsonValue::Null) => {
                let datatype: FieldType = optional_str(descriptor, "datatype")?
                    .ok_or_else(|| invalid("Field datatype is required."))?
                    .parse()?;
                let keyname = optional_str(descriptor, "keyname")?
                    .ok_or_else(|| invalid("Field keyname is required."))?;
                LayerField::new(field_class, datatype, keyname)
            }
            Some(id) => {
                let id = id
                    .as_i64()
                    .ok_or_else(|| invalid(format!("Invalid field ID '{id}'.")))?;
                by_id.remove(&id).ok_or_else(|| {
                    NgwError::from(
                        ValidationError::new(format!("Field not found (ID={id})."), "invalid")
                            .with_param("id", id.to_string()),
                    )
                })?
            }
        };

        if let Some(keyname) = optional_str(descriptor, "keyname")? {
            field.keyname = keyname.to_string();
        }
        if let Some(display_name) = optional_str(descriptor, "display_name")? {
            field.display_name = display_name.to_string();
        }
        if let Some(grid_visibility) = optional_bool(descriptor, "grid_visibility")? {
            field.grid_visibility = grid_visibility;
        }
        if optional_bool(descriptor, "label_field")?.unwrap_or(false) {
            label = Some(fields.len());
        }

        fields.push(field);
    }

    Ok((fields, label))
}

/// Serializer of layers with a field schema.
pub fn feature_layer_serializer<R: LayerFieldsMixin + 'static>() -> Serializer<R> {
    Serializer::new("feature_layer").property(FieldsAttr::<R>::default())
}

/// The write-only `file_upload` property of styles.
#[derive(Debug, Default)]
pub struct FileUploadAttr;

#[async_trait]
impl SerializedProperty<FeatureLayerStyle> for FileUploadAttr {
    fn name(&self) -> &'static str {
        "file_upload"
    }

    fn write(&self) -> Option<Permission> {
        Some(ResourceScope::UPDATE)
    }

    async fn setter(
        &self,
        obj: &mut FeatureLayerStyle,
        value: &JsonValue,
        env: &Env,
    ) -> NgwResult<()> {
        let upload_id = value
            .get("id")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid("File upload ID is required."))?;

        let file_upload = env.service::<FileUpload>()?;
        let file_storage = env.service::<FileStorage>()?;

        let (src, _meta) = file_upload.get_filename(upload_id).await?;
        let fileobj = file_storage.fileobj(FILE_COMPONENT);
        let (dst, size) = file_storage.copy_into(&src, &fileobj).await?;
        tracing::info!(upload = upload_id, dst = %dst.display(), size, "Attached style file");

        obj.fileobj = Some(fileobj);
        Ok(())
    }
}

/// Serializer of feature layer styles.
pub fn feature_layer_style_serializer() -> Serializer<FeatureLayerStyle> {
    Serializer::new("feature_layer_style").property(FileUploadAttr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i64, keyname: &str, datatype: FieldType) -> LayerField {
        let mut f = LayerField::new("layer_field", datatype, keyname);
        f.id = Some(id);
        f
    }

    fn current() -> Vec<LayerField> {
        vec![
            field(1, "name", FieldType::String),
            field(2, "population", FieldType::Integer),
            field(3, "area", FieldType::Real),
        ]
    }

    #[test]
    fn test_reorder_and_drop() {
        let (fields, label) =
            apply_fields(current(), &json!([{"id": 3}, {"id": 1}]), "layer_field").unwrap();
        let ids: Vec<_> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![Some(3), Some(1)]);
        assert!(label.is_none());
    }

    #[test]
    fn test_partial_update_keeps_other_attributes() {
        let (fields, _) = apply_fields(
            current(),
            &json!([{"id": 2, "display_name": "Population", "datatype": "STRING"}]),
            "layer_field",
        )
        .unwrap();
        assert_eq!(fields[0].display_name, "Population");
        assert_eq!(fields[0].keyname, "population");
        assert_eq!(fields[0].datatype, FieldType::Integer);
    }

    #[test]
    fn test_new_field() {
        let (fields, label) = apply_fields(
            vec![],
            &json!([{"keyname": "code", "datatype": "STRING", "grid_visibility": false, "label_field": true}]),
            "custom_field",
        )
        .unwrap();
        assert_eq!(fields[0].cls, "custom_field");
        assert_eq!(fields[0].display_name, "code");
        assert!(!fields[0].grid_visibility);
        assert!(fields[0].id.is_none());
        assert_eq!(label, Some(0));
    }

    #[test]
    fn test_last_label_wins() {
        let (_, label) = apply_fields(
            current(),
            &json!([{"id": 1, "label_field": true}, {"id": 2, "label_field": true}, {"id": 3}]),
            "layer_field",
        )
        .unwrap();
        assert_eq!(label, Some(1));
    }

    fn assert_invalid(payload: JsonValue, message: &str) {
        match apply_fields(current(), &payload, "layer_field") {
            Err(NgwError::ValidationError(e)) => {
                assert_eq!(e.message, message);
                assert_eq!(e.code, "invalid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_invalid(json!([{"id": 9999}]), "Field not found (ID=9999).");
    }

    #[test]
    fn test_id_referenced_twice() {
        assert_invalid(json!([{"id": 1}, {"id": 1}]), "Field not found (ID=1).");
    }

    #[test]
    fn test_new_field_requirements() {
        assert_invalid(json!([{"keyname": "x"}]), "Field datatype is required.");
        assert_invalid(json!([{"datatype": "REAL"}]), "Field keyname is required.");
        assert_invalid(
            json!([{"keyname": "x", "datatype": "GEOMETRY"}]),
            "Unknown field datatype 'GEOMETRY'.",
        );
    }

    #[test]
    fn test_malformed_payload() {
        assert_invalid(json!({"id": 1}), "Fields must be a list.");
        assert_invalid(json!([1]), "Field descriptor must be an object.");
        assert_invalid(
            json!([{"id": 1, "grid_visibility": "yes"}]),
            "Field attribute 'grid_visibility' must be a boolean.",
        );
    }
}
