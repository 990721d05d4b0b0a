//! Core error types for nextgisweb.
//!
//! [`NgwError`] covers HTTP, storage, validation, configuration, serialization
//! and IO failures. Every variant maps to an HTTP status code so that request
//! handlers can turn any error into a response without extra bookkeeping.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Submitted data that is well-formed but breaks a model rule, such as a
/// field update referencing a field the layer does not own.
///
/// # Examples
///
/// ```
/// use nextgisweb_core::error::ValidationError;
///
/// let err = ValidationError::new("Field not found (ID=9999).", "invalid")
///     .with_param("id", "9999");
/// assert_eq!(err.to_string(), "Field not found (ID=9999).");
/// assert_eq!(err.params["id"], "9999");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    /// Machine-readable kind, e.g. "required" or "invalid".
    pub code: String,
    pub params: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: BTreeMap::new(),
        }
    }

    /// Records the offending value under `key`.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for nextgisweb.
///
/// Each variant maps to an HTTP status code via [`NgwError::status_code`].
#[derive(Error, Debug)]
pub enum NgwError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 403 Forbidden.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Storage errors ───────────────────────────────────────────────

    /// A lookup expected exactly one row but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A lookup expected exactly one row but found several.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A database integrity constraint was violated.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (open failure, lost connection).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// Submitted data failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The application is improperly configured (e.g. missing secret).
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl NgwError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `ValidationError`, `SerializationError` -> 400
    /// - `PermissionDenied` -> 403
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) | Self::SerializationError(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::InternalServerError(_)
            | Self::MultipleObjectsReturned(_)
            | Self::DatabaseError(_)
            | Self::IntegrityError(_)
            | Self::OperationalError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Shorthand for a simple validation error with the `invalid` code.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(ValidationError::new(message, "invalid"))
    }
}

impl From<ValidationError> for NgwError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, NgwError>`.
pub type NgwResult<T> = Result<T, NgwError>;
