//! Request extractors.
//!
//! [`ApiJson`], [`ApiPath`] and [`ApiQuery`] wrap the axum extractors of the
//! same name and reject malformed input with a JSON [`ApiError`] body.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::Json;
use http::request::Parts;
use serde::de::DeserializeOwned;

use nextgisweb_core::security::anonymous_principals;
use nextgisweb_core::{Env, NgwError, Principal};

use crate::config::Security;
use crate::error::ApiError;

/// The principals of the current request.
///
/// Without an authentication policy every request is anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principals(pub Vec<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for Principals {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principals = parts
            .extensions
            .get::<Security>()
            .and_then(|security| security.authentication.as_ref())
            .map_or_else(anonymous_principals, |policy| {
                policy.effective_principals(&parts.headers)
            });
        Ok(Self(principals))
    }
}

/// The application [`Env`], set as a request property by the bootstrapper.
#[derive(Debug, Clone)]
pub struct RequestEnv(pub Arc<Env>);

impl<S: Send + Sync> FromRequestParts<S> for RequestEnv {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Env>>()
            .cloned()
            .map(Self)
            .ok_or_else(|| {
                ApiError(NgwError::ImproperlyConfigured(
                    "Environment is not set as a request property".to_string(),
                ))
            })
    }
}

fn bad_request(what: &str, body_text: &str) -> ApiError {
    ApiError(NgwError::SerializationError(format!("{what}: {body_text}")))
}

/// A JSON request body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection @ JsonRejection::MissingJsonContentType(_)) => {
                Err(bad_request("Expected a JSON request body", &rejection.body_text()))
            }
            Err(rejection) => Err(bad_request("Invalid JSON body", &rejection.body_text())),
        }
    }
}

/// Path parameters.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection: PathRejection| {
                bad_request("Invalid path parameter", &rejection.body_text())
            })
    }
}

/// Query string parameters.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection: QueryRejection| {
                bad_request("Invalid query string", &rejection.body_text())
            })
    }
}
