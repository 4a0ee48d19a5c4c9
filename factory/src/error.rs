//! Factory-specific error types

use shared::SharedError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Batch not found: {id}")]
    BatchNotFound { id: String },

    #[error("Cart is empty, nothing to launch")]
    EmptyCart,

    #[error("Item already produced: {id}")]
    AlreadyDone { id: String },

    #[error("Unknown material: {material}")]
    UnknownMaterial { material: String },

    #[error("Invalid mesh payload: {message}")]
    InvalidMesh { message: String },

    #[error("Storage operation failed: {operation} on {path}")]
    StorageError {
        operation: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata record error: {0}")]
    MetadataError(#[from] serde_json::Error),

    #[error("Shared component error")]
    SharedError(#[from] SharedError),
}

impl FactoryError {
    /// Wrap an I/O failure with the operation and path it hit.
    pub fn storage(operation: &str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::StorageError {
            operation: operation.to_string(),
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn item_not_found(id: impl ToString) -> Self {
        Self::ItemNotFound { id: id.to_string() }
    }

    pub fn batch_not_found(id: impl ToString) -> Self {
        Self::BatchNotFound { id: id.to_string() }
    }

    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh { message: message.into() }
    }
}

pub type FactoryResult<T> = Result<T, FactoryError>;
