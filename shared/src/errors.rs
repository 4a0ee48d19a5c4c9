//! Shared error types for the fabrication backend

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid batch identifier: {token}")]
    InvalidBatchId { token: String },

    #[error("Invalid item identifier: {input}")]
    InvalidItemId { input: String },

    #[error("Invalid part configuration: {message}")]
    InvalidConfig { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
