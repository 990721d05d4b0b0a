//! JSON error responses.
//!
//! Handlers return [`ApiResult`]; any [`NgwError`] becomes a JSON body
//!
//! ```json
//! {"message": "...", "status_code": 400, "code": "invalid"}
//! ```
//!
//! with the matching HTTP status. `code` is only present for validation
//! errors.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use nextgisweb_core::NgwError;

/// An [`NgwError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub NgwError);

/// Result type of API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl<E: Into<NgwError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.0.status_code();
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let (message, code) = match &self.0 {
            NgwError::ValidationError(v) => (v.to_string(), Some(v.code.clone())),
            other => (other.to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status_code, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                message,
                status_code,
                code,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let response = ApiError(NgwError::validation("Field not found (ID=9999).")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "message": "Field not found (ID=9999).",
                "status_code": 400,
                "code": "invalid"
            })
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (NgwError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (NgwError::DoesNotExist("x".into()), StatusCode::NOT_FOUND),
            (NgwError::DatabaseError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_from_io_error() {
        let err: ApiError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err.0, NgwError::IoError(_)));
    }
}
