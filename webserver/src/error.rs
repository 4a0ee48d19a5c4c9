//! WebServer-specific error types and HTTP mapping
//!
//! Domain failures stay transport-free in the factory crate; this module is
//! the single place where they are translated into status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use factory::FactoryError;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WebServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    /// Request could not be decoded (missing part, bad JSON, bad id)
    BadRequest(String),
    /// Domain failure from the factory engine
    Domain(FactoryError),
}

impl From<FactoryError> for ApiError {
    fn from(err: FactoryError) -> Self {
        Self::Domain(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                FactoryError::ItemNotFound { .. } | FactoryError::BatchNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                FactoryError::EmptyCart | FactoryError::AlreadyDone { .. } => StatusCode::CONFLICT,
                FactoryError::UnknownMaterial { .. } | FactoryError::SharedError(_) => {
                    StatusCode::BAD_REQUEST
                }
                FactoryError::InvalidMesh { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                FactoryError::StorageError { .. } | FactoryError::MetadataError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Domain(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            if let ApiError::Domain(err) = &self {
                tracing::error!("❌ Request failed: {err}");
            }
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
