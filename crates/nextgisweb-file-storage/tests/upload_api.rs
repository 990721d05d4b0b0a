use std::sync::Arc;

use axum::body::Body;
use http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value as JsonValue};
use tower::ServiceExt;

use nextgisweb_core::{Component, Env, Settings};
use nextgisweb_file_storage::{FileUpload, FileUploadComponent};
use nextgisweb_web::{Configurator, WebComponent};

async fn put(router: axum::Router, uri: &str, body: &'static [u8]) -> (StatusCode, JsonValue) {
    let response = router
        .oneshot(
            http::Request::put(uri)
                .header("content-type", "text/xml")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_upload_stores_body_and_returns_meta() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.set_component_option("file_upload", "path", json!(dir.path()));
    let mut env = Env::new(settings);
    FileUploadComponent.initialize(&mut env).unwrap();
    let env = Arc::new(env);

    let mut config = Configurator::new(Map::new());
    config.set_request_property(env.clone());
    FileUploadComponent.setup_routes(&mut config).unwrap();

    let (status, meta) = put(
        config.into_router(),
        "/api/component/file_upload/upload?name=style.qml",
        b"<qgis/>",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta["size"], 7);
    assert_eq!(meta["name"], "style.qml");
    assert_eq!(meta["mime_type"], "text/xml");

    let id = meta["id"].as_str().unwrap();
    let (path, _) = env
        .service::<FileUpload>()
        .unwrap()
        .get_filename(id)
        .await
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"<qgis/>");
}

#[tokio::test]
async fn test_upload_without_component_is_server_error() {
    let mut config = Configurator::new(Map::new());
    config.set_request_property(Arc::new(Env::new(Settings::default())));
    FileUploadComponent.setup_routes(&mut config).unwrap();

    let (status, body) = put(
        config.into_router(),
        "/api/component/file_upload/upload",
        b"x",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status_code"], 500);
}

#[tokio::test]
async fn test_upload_with_malformed_query_is_bad_request() {
    let mut config = Configurator::new(Map::new());
    config.set_request_property(Arc::new(Env::new(Settings::default())));
    FileUploadComponent.setup_routes(&mut config).unwrap();

    let (status, body) = put(
        config.into_router(),
        "/api/component/file_upload/upload?name=a.qml&name=b.qml",
        b"x",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
}
