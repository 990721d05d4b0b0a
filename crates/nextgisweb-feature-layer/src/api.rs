//! HTTP API of feature layers and styles.
//!
//! - `GET /api/resource/{id}/feature_layer`
//! - `PUT /api/resource/{id}/feature_layer`
//! - `PUT /api/resource/{id}/feature_layer_style`
//!
//! Writes run inside a single database transaction.

use axum::routing::{get, put};
use axum::Json;
use serde_json::{json, Value as JsonValue};

use nextgisweb_core::{NgwError, NgwResult, Principal};
use nextgisweb_db::SqliteBackend;
use nextgisweb_resource::{Resource, ResourceScope};
use nextgisweb_web::{ApiJson, ApiPath, ApiResult, Configurator, Principals, RequestEnv};

use crate::layer::FeatureLayer;
use crate::serializer::{feature_layer_serializer, feature_layer_style_serializer};
use crate::style::FeatureLayerStyle;

fn require_read(resource: &Resource, principals: &[Principal]) -> NgwResult<()> {
    if resource.has_permission(ResourceScope::READ, principals) {
        Ok(())
    } else {
        Err(NgwError::PermissionDenied(format!(
            "Permission '{}' is required on resource {}",
            ResourceScope::READ,
            resource.id.unwrap_or_default()
        )))
    }
}

fn section(mut data: JsonValue, identity: &str) -> JsonValue {
    data.get_mut(identity).map(JsonValue::take).unwrap_or_default()
}

fn wrap(identity: &str, body: JsonValue) -> JsonValue {
    let mut data = serde_json::Map::new();
    data.insert(identity.to_string(), body);
    JsonValue::Object(data)
}

async fn fields_get(
    RequestEnv(env): RequestEnv,
    Principals(principals): Principals,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<JsonValue>> {
    let db = env.service::<SqliteBackend>()?;
    let layer = FeatureLayer::load(&*db, id).await?;
    require_read(&layer.resource, &principals)?;

    let serializer = feature_layer_serializer::<FeatureLayer>();
    let data = serializer.serialize(&layer, &principals)?;
    Ok(Json(section(data, serializer.identity())))
}

async fn fields_put(
    RequestEnv(env): RequestEnv,
    Principals(principals): Principals,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<JsonValue>,
) -> ApiResult<Json<JsonValue>> {
    let db = env.service::<SqliteBackend>()?;
    let serializer = feature_layer_serializer::<FeatureLayer>();

    let tx = db.begin().await?;
    let mut layer = FeatureLayer::load(&tx, id).await?;
    require_read(&layer.resource, &principals)?;
    serializer
        .deserialize(
            &mut layer,
            &wrap(serializer.identity(), body),
            &principals,
            &env,
        )
        .await?;
    layer.save(&tx).await?;
    tx.commit()?;

    tracing::info!(id, fields = layer.fields.len(), "Updated layer fields");
    let data = serializer.serialize(&layer, &principals)?;
    Ok(Json(section(data, serializer.identity())))
}

async fn style_put(
    RequestEnv(env): RequestEnv,
    Principals(principals): Principals,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<JsonValue>,
) -> ApiResult<Json<JsonValue>> {
    let db = env.service::<SqliteBackend>()?;
    let serializer = feature_layer_style_serializer();

    let tx = db.begin().await?;
    let mut style = FeatureLayerStyle::load(&tx, id).await?;
    require_read(&style.resource, &principals)?;
    serializer
        .deserialize(
            &mut style,
            &wrap(serializer.identity(), body),
            &principals,
            &env,
        )
        .await?;
    style.save(&tx).await?;
    tx.commit()?;

    Ok(Json(json!({
        "id": id,
        "fileobj": style.fileobj.map(|f| json!({"id": f.id, "uuid": f.uuid})),
    })))
}

pub fn setup_routes(config: &mut Configurator) -> NgwResult<()> {
    config.add_route("feature_layer.fields", "/api/resource/{id}/feature_layer")?;
    config.add_view("feature_layer.fields", get(fields_get).put(fields_put))?;

    config.add_route(
        "feature_layer_style.file",
        "/api/resource/{id}/feature_layer_style",
    )?;
    config.add_view("feature_layer_style.file", put(style_put))
}
