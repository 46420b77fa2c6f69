//! Error types for object storage operations

use aws_sdk_s3::{
    error::SdkError,
    operation::{
        delete_object::DeleteObjectError, head_object::HeadObjectError,
        put_object::PutObjectError,
    },
};
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage service error
    #[error("Storage service error: {0}")]
    S3Error(String),

    /// Object already exists in bucket
    #[error("Object already exists: {0}")]
    ObjectExists(String),

    /// Object does not exist in bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Upstream service error (5xx from the storage service)
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SdkError<HeadObjectError>> for StorageError {
    fn from(error: SdkError<HeadObjectError>) -> Self {
        match &error {
            SdkError::ServiceError(err) if err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(format!("{:?}", err.err()))
            }
            SdkError::ServiceError(err) => Self::S3Error(format!("{:?}", err.err())),
            _ => Self::S3Error(error.to_string()),
        }
    }
}

impl From<SdkError<PutObjectError>> for StorageError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        match &error {
            SdkError::ServiceError(err) if err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(err.err().to_string())
            }
            SdkError::ServiceError(err) => Self::S3Error(err.err().to_string()),
            _ => Self::S3Error(error.to_string()),
        }
    }
}

impl From<SdkError<DeleteObjectError>> for StorageError {
    fn from(error: SdkError<DeleteObjectError>) -> Self {
        match &error {
            SdkError::ServiceError(err) if err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(err.err().to_string())
            }
            SdkError::ServiceError(err) => Self::S3Error(err.err().to_string()),
            _ => Self::S3Error(error.to_string()),
        }
    }
}
