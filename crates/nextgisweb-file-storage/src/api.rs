//! Upload API.
//!
//! `PUT /api/component/file_upload/upload` stores the raw request body as a
//! temporary upload and answers with its metadata. The optional `name`
//! query parameter and the `Content-Type` header are kept in the metadata.

use axum::routing::put;
use axum::Json;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::Deserialize;

use nextgisweb_core::NgwResult;
use nextgisweb_web::{ApiQuery, ApiResult, Configurator, RequestEnv};

use crate::upload::{FileUpload, UploadMeta};

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

async fn upload(
    RequestEnv(env): RequestEnv,
    ApiQuery(params): ApiQuery<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<UploadMeta>> {
    let file_upload = env.service::<FileUpload>()?;
    let mime_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let meta = file_upload.store(&body, mime_type, params.name).await?;
    Ok(Json(meta))
}

pub fn setup_routes(config: &mut Configurator) -> NgwResult<()> {
    config.add_route("file_upload.upload", "/api/component/file_upload/upload")?;
    config.add_view("file_upload.upload", put(upload))
}
