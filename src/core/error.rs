//! Typed error handling for the member service layer
//!
//! Every fallible operation of the crate returns [`ServiceError`]. The enum is
//! also the centralized error-to-HTTP translator: handlers return
//! `Result<_, ServiceError>` and axum turns the error into a JSON body with the
//! matching status code.
//!
//! # Error Categories
//!
//! - `NotFound`: a unique-key lookup matched zero rows
//! - `BadRequest`: malformed caller input
//! - `Forbidden`: the principal may not perform the mutation
//! - `StoreRead` / `StoreWrite`: the document store call failed
//! - `ExternalService`: object storage, search index or bus failure
//! - `Config` / `Internal`: startup and framework errors
//!
//! # Example
//!
//! ```rust,ignore
//! match store.get_by_unique_key("handleLower", &"alice".into()).await {
//!     Ok(member) => println!("Found: {}", member.handle),
//!     Err(ServiceError::NotFound { key, value, .. }) => println!("no member with {key}={value}"),
//!     Err(e) => eprintln!("Other error: {e}"),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Result alias used throughout the crate
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result alias for axum handlers; the error side is rendered by [`IntoResponse`]
pub type HandlerResult<T> = Result<T, ServiceError>;

/// The error type of the member service layer
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A unique-key lookup matched no record
    #[error("{collection} with {key} '{value}' not found")]
    NotFound {
        collection: String,
        key: String,
        value: String,
    },

    /// Malformed caller input
    #[error("{0}")]
    BadRequest(String),

    /// The caller is not allowed to perform the operation
    #[error("{0}")]
    Forbidden(String),

    /// Reading from the document store failed
    #[error("failed to read from {collection}: {message}")]
    StoreRead { collection: String, message: String },

    /// Writing to the document store failed
    #[error("failed to write to {collection}: {message}")]
    StoreWrite { collection: String, message: String },

    /// An external collaborator (object storage, search index, bus) failed
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected failure inside the service
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ServiceError {
    pub fn not_found(collection: &str, key: &str, value: impl ToString) -> Self {
        ServiceError::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn store_read(collection: &str, message: impl ToString) -> Self {
        ServiceError::StoreRead {
            collection: collection.to_string(),
            message: message.to_string(),
        }
    }

    pub fn store_write(collection: &str, message: impl ToString) -> Self {
        ServiceError::StoreWrite {
            collection: collection.to_string(),
            message: message.to_string(),
        }
    }

    pub fn external(service: &str, message: impl ToString) -> Self {
        ServiceError::ExternalService {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::StoreRead { .. } | ServiceError::StoreWrite { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Config(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound { .. } => "NOT_FOUND",
            ServiceError::BadRequest(_) => "BAD_REQUEST",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::StoreRead { .. } => "STORE_READ_ERROR",
            ServiceError::StoreWrite { .. } => "STORE_WRITE_ERROR",
            ServiceError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            ServiceError::Config(_) => "CONFIG_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::external("http", err)
    }
}
