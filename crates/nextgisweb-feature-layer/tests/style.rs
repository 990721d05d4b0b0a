use std::sync::Arc;

use serde_json::json;

use nextgisweb_core::{Component, ComponentRegistry, Env, NgwError, Principal, Settings};
use nextgisweb_db::{DbComponent, Metadata, SqliteBackend};
use nextgisweb_feature_layer::{
    feature_layer_style_serializer, FeatureLayer, FeatureLayerComponent, FeatureLayerStyle,
};
use nextgisweb_file_storage::{FileStorage, FileStorageComponent, FileUpload, FileUploadComponent};
use nextgisweb_resource::acl::ANY;
use nextgisweb_resource::{AclRule, Resource, ResourceComponent, ResourceRegistry};

const EVERYONE: &[Principal] = &[Principal::Everyone];

async fn env(dir: &std::path::Path) -> Env {
    let mut settings = Settings::default();
    settings.database.path = ":memory:".into();
    settings.set_component_option("file_storage", "path", json!(dir.join("storage")));
    settings.set_component_option("file_upload", "path", json!(dir.join("upload")));

    let mut registry: ComponentRegistry = ComponentRegistry::new();
    let components: Vec<Arc<dyn Component>> = vec![
        Arc::new(DbComponent),
        Arc::new(ResourceComponent),
        Arc::new(FileStorageComponent),
        Arc::new(FileUploadComponent),
        Arc::new(FeatureLayerComponent),
    ];
    for component in components {
        registry.register(component).unwrap();
    }
    let mut env = Env::new(settings);
    registry.initialize(&mut env).unwrap();
    let db = env.service::<SqliteBackend>().unwrap();
    env.service::<Metadata>()
        .unwrap()
        .create_all(&db)
        .await
        .unwrap();
    env
}

async fn layer(db: &SqliteBackend) -> FeatureLayer {
    let mut layer = FeatureLayer::new("Roads", 4326);
    layer
        .resource
        .acl
        .push(AclRule::allow(Principal::Everyone, ANY, ANY));
    layer.save(db).await.unwrap();
    layer
}

fn style_acl() -> Vec<AclRule> {
    vec![AclRule::allow(Principal::Everyone, ANY, ANY)]
}

#[tokio::test]
async fn test_upload_is_copied_into_storage() {
    let dir = tempfile::tempdir().unwrap();
    let env = env(dir.path()).await;
    let db = env.service::<SqliteBackend>().unwrap();
    let registry = env.service::<ResourceRegistry>().unwrap();
    let layer = layer(&db).await;

    let upload = env
        .service::<FileUpload>()
        .unwrap()
        .store(b"<qgis version=\"3\"/>", None, Some("roads.qml".into()))
        .await
        .unwrap();

    let mut style = FeatureLayerStyle::new(&registry, &layer.resource, "Roads style").unwrap();
    style.resource.acl = style_acl();
    feature_layer_style_serializer()
        .deserialize(
            &mut style,
            &json!({"feature_layer_style": {"file_upload": {"id": upload.id}}}),
            EVERYONE,
            &env,
        )
        .await
        .unwrap();
    style.save(&*db).await.unwrap();

    let loaded = FeatureLayerStyle::load(&*db, style.resource.id.unwrap())
        .await
        .unwrap();
    let fileobj = loaded.fileobj.clone().unwrap();
    assert_eq!(fileobj.component, "feature_layer");
    assert!(fileobj.id.is_some());

    let expected = dir
        .path()
        .join("storage/feature_layer")
        .join(&fileobj.uuid[0..2])
        .join(&fileobj.uuid[2..4])
        .join(&fileobj.uuid);
    let path = env
        .service::<FileStorage>()
        .unwrap()
        .filename(&fileobj, false)
        .await
        .unwrap();
    assert_eq!(path, expected);
    assert_eq!(std::fs::read(path).unwrap(), b"<qgis version=\"3\"/>");
    assert_eq!(loaded.srs(&*db).await.unwrap(), 4326);
}

#[tokio::test]
async fn test_missing_upload_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let env = env(dir.path()).await;
    let db = env.service::<SqliteBackend>().unwrap();
    let registry = env.service::<ResourceRegistry>().unwrap();
    let layer = layer(&db).await;

    let mut style = FeatureLayerStyle::new(&registry, &layer.resource, "Style").unwrap();
    style.resource.acl = style_acl();
    let serializer = feature_layer_style_serializer();

    let missing = serializer
        .deserialize(
            &mut style,
            &json!({"feature_layer_style": {"file_upload": {"id": "0123456789abcdef0123456789abcdef"}}}),
            EVERYONE,
            &env,
        )
        .await;
    assert!(matches!(missing, Err(NgwError::NotFound(_))));

    let malformed = serializer
        .deserialize(
            &mut style,
            &json!({"feature_layer_style": {"file_upload": {"id": "../../etc"}}}),
            EVERYONE,
            &env,
        )
        .await;
    assert!(matches!(malformed, Err(NgwError::ValidationError(_))));
    assert!(style.fileobj.is_none());
}

#[tokio::test]
async fn test_upload_requires_update_permission() {
    let dir = tempfile::tempdir().unwrap();
    let env = env(dir.path()).await;
    let db = env.service::<SqliteBackend>().unwrap();
    let registry = env.service::<ResourceRegistry>().unwrap();
    let layer = layer(&db).await;

    let mut style = FeatureLayerStyle::new(&registry, &layer.resource, "Style").unwrap();
    style.resource.acl = vec![AclRule::allow(Principal::Everyone, "resource", "read")];
    let result = feature_layer_style_serializer()
        .deserialize(
            &mut style,
            &json!({"feature_layer_style": {"file_upload": {"id": "0123456789abcdef0123456789abcdef"}}}),
            EVERYONE,
            &env,
        )
        .await;
    assert!(matches!(result, Err(NgwError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_style_requires_feature_layer_parent() {
    let dir = tempfile::tempdir().unwrap();
    let env = env(dir.path()).await;
    let db = env.service::<SqliteBackend>().unwrap();
    let registry = env.service::<ResourceRegistry>().unwrap();

    let mut group = Resource::new("resource_group", "Main");
    group.save(&*db).await.unwrap();
    assert!(matches!(
        FeatureLayerStyle::new(&registry, &group, "Style"),
        Err(NgwError::ValidationError(_))
    ));

    let unsaved = FeatureLayer::new("Draft", 3857);
    assert!(FeatureLayerStyle::new(&registry, &unsaved.resource, "Style").is_err());
}

#[tokio::test]
async fn test_deleting_layer_deletes_styles() {
    let dir = tempfile::tempdir().unwrap();
    let env = env(dir.path()).await;
    let db = env.service::<SqliteBackend>().unwrap();
    let registry = env.service::<ResourceRegistry>().unwrap();
    let layer = layer(&db).await;

    let mut style = FeatureLayerStyle::new(&registry, &layer.resource, "Style").unwrap();
    style.save(&*db).await.unwrap();
    let style_id = style.resource.id.unwrap();

    layer.delete(&*db).await.unwrap();
    assert!(FeatureLayerStyle::load(&*db, style_id).await.is_err());
}
