//! Typed error handling for blueprint routes
//!
//! Errors come in two flavors:
//!
//! - **Registration-time** errors ([`ConfigError`], [`ClassificationError`]) are returned from
//!   [`BlueprintBuilder`](crate::server::BlueprintBuilder) and prevent the route from being
//!   registered at all.
//! - **Request-time** errors (`NotFound`, `Unauthorized`, `BadRequest`, `Validation`,
//!   `Internal`) are produced by action handlers and converted into an HTTP response at the
//!   handler boundary through [`IntoResponse`].
//!
//! Failures reported by a [`Model`](crate::core::model::Model) arrive as [`StorageError`] and
//! are translated to the nearest request-time kind; raw storage text never reaches a 5xx body.
//!
//! # Example
//!
//! ```rust,ignore
//! match builder.build() {
//!     Ok(router) => serve(router).await,
//!     Err(BlueprintError::Classification(e)) => eprintln!("bad route: {}", e),
//!     Err(e) => eprintln!("setup failed: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Message used for every 5xx body
const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// The main error type for blueprint routes
#[derive(Debug)]
pub enum BlueprintError {
    /// Invalid or contradictory route options (registration time)
    Config(ConfigError),

    /// No action matches the method and path shape (registration time)
    Classification(ClassificationError),

    /// Missing record or relation
    NotFound { message: String },

    /// Ownership check failed or required identity is missing
    Unauthorized { message: String },

    /// Malformed request: bad filter JSON, missing child specification, ...
    BadRequest { message: String },

    /// The storage layer rejected the values
    Validation(ValidationError),

    /// Unexpected storage or transport failure; the cause is kept for logs only
    Internal { cause: String },
}

impl BlueprintError {
    pub fn not_found(message: impl Into<String>) -> Self {
        BlueprintError::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        BlueprintError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        BlueprintError::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        BlueprintError::Internal {
            cause: cause.into(),
        }
    }

    /// Whether this error can only happen while registering a route
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            BlueprintError::Config(_) | BlueprintError::Classification(_)
        )
    }
}

impl fmt::Display for BlueprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintError::Config(e) => write!(f, "{}", e),
            BlueprintError::Classification(e) => write!(f, "{}", e),
            BlueprintError::NotFound { message } => write!(f, "Not found: {}", message),
            BlueprintError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            BlueprintError::BadRequest { message } => write!(f, "Bad request: {}", message),
            BlueprintError::Validation(e) => write!(f, "{}", e),
            BlueprintError::Internal { cause } => write!(f, "Internal error: {}", cause),
        }
    }
}

impl std::error::Error for BlueprintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlueprintError::Config(e) => Some(e),
            BlueprintError::Classification(e) => Some(e),
            BlueprintError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl BlueprintError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BlueprintError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BlueprintError::Classification(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BlueprintError::NotFound { .. } => StatusCode::NOT_FOUND,
            BlueprintError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            BlueprintError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            BlueprintError::Validation(_) => StatusCode::BAD_REQUEST,
            BlueprintError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            BlueprintError::Config(_) => "CONFIG_ERROR",
            BlueprintError::Classification(_) => "CLASSIFICATION_ERROR",
            BlueprintError::NotFound { .. } => "NOT_FOUND",
            BlueprintError::Unauthorized { .. } => "UNAUTHORIZED",
            BlueprintError::BadRequest { .. } => "BAD_REQUEST",
            BlueprintError::Validation(_) => "VALIDATION_ERROR",
            BlueprintError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    ///
    /// 5xx responses are generic: the underlying cause stays server side.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.status_code().is_server_error() {
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            BlueprintError::Validation(ValidationError { details, .. }) => details.clone(),
            _ => None,
        }
    }
}

impl IntoResponse for BlueprintError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "blueprint request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to route options, detected while registering a route
#[derive(Debug)]
pub enum ConfigError {
    /// The route targets a model that is not in the registry
    UnknownModel { model: String },

    /// No model could be deduced from the options or the path
    MissingModel { path: String },

    /// The path cannot be used for a blueprint
    InvalidPath { path: String, message: String },

    /// Invalid value in the route or plugin options
    InvalidValue { field: String, message: String },

    /// `hooks.options` was declared but is not a function
    HookNotFunction,

    /// Count mode on an action that cannot count
    CountNotAllowed { method: String, path: String },

    /// Failed to parse a configuration document
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownModel { model } => {
                write!(f, "Model `{}` must exist to build route", model)
            }
            ConfigError::MissingModel { path } => {
                write!(f, "No `model` specified in route options for '{}'", path)
            }
            ConfigError::InvalidPath { path, message } => {
                write!(f, "Invalid blueprint path '{}': {}", path, message)
            }
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid value for option '{}': {}", field, message)
            }
            ConfigError::HookNotFunction => write!(f, "options hook must be a function"),
            ConfigError::CountNotAllowed { method, path } => {
                write!(
                    f,
                    "This {} route can't count ('{}'): only find and populate listings can",
                    method, path
                )
            }
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::IoError { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for BlueprintError {
    fn from(err: ConfigError) -> Self {
        BlueprintError::Config(err)
    }
}

// =============================================================================
// Classification Errors
// =============================================================================

/// No blueprint action matches a route's method and path shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// The method is not one of POST, GET, DELETE, PUT or PATCH
    UnsupportedMethod { method: String },

    /// The method is supported but the path shape is not
    NoPattern { method: String, path: String },
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationError::UnsupportedMethod { method } => write!(
                f,
                "Method {} isn't a blueprint method. Must be POST, GET, DELETE, PUT, or PATCH",
                method
            ),
            ClassificationError::NoPattern { method, path } => write!(
                f,
                "This {} route ('{}') does not match a blueprint pattern",
                method, path
            ),
        }
    }
}

impl std::error::Error for ClassificationError {}

impl From<ClassificationError> for BlueprintError {
    fn from(err: ClassificationError) -> Self {
        BlueprintError::Classification(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Values rejected by the storage layer
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for BlueprintError {
    fn from(err: ValidationError) -> Self {
        BlueprintError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by a `Model` implementation
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Values do not satisfy the model's constraints
    #[error("invalid values: {message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The link already exists in the collection
    #[error("'{child}' is already linked through '{alias}'")]
    DuplicateLink { alias: String, child: String },

    /// The alias is not an association of the model
    #[error("model '{model}' has no association '{alias}'")]
    UnknownAssociation { model: String, alias: String },

    /// The record addressed by a link operation does not exist
    #[error("no '{model}' record with key '{key}'")]
    MissingRecord { model: String, key: String },

    /// Anything else the backend failed at
    #[error("{backend} failure: {message}")]
    Backend { backend: String, message: String },
}

impl StorageError {
    /// Duplicate-link failures are what an idempotent `add` swallows
    pub fn is_duplicate_link(&self) -> bool {
        matches!(self, StorageError::DuplicateLink { .. })
    }
}

impl From<StorageError> for BlueprintError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation { message, details } => {
                BlueprintError::Validation(ValidationError { message, details })
            }
            StorageError::UnknownAssociation { .. } | StorageError::MissingRecord { .. } => {
                BlueprintError::not_found(err.to_string())
            }
            StorageError::DuplicateLink { .. } => BlueprintError::bad_request(err.to_string()),
            StorageError::Backend { .. } => BlueprintError::internal(err.to_string()),
        }
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<std::io::Error> for BlueprintError {
    fn from(err: std::io::Error) -> Self {
        BlueprintError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for BlueprintError {
    fn from(err: serde_yaml::Error) -> Self {
        BlueprintError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for blueprint operations
pub type BlueprintResult<T> = Result<T, BlueprintError>;

/// Result type returned by `Model` implementations
pub type StorageResult<T> = Result<T, StorageError>;
