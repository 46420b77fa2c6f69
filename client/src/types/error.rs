//! Error types for client operations

use common_types::{ApiErrorBody, ErrorField};
use http::StatusCode;
use thiserror::Error;

use crate::media_storage::StorageError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while talking to the backend or the storage service
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request never produced a response
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The response body did not have the expected shape
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// The backend answered with a non-success status
    #[error("Request failed with status {status}")]
    Api {
        /// Response status
        status: StatusCode,
        /// Error envelope, empty when the body was not one
        body: ApiErrorBody,
    },

    /// The backend answered with success but flagged an error in the body
    #[error("Request rejected: {}", .0.error.as_deref().unwrap_or("unknown error"))]
    Rejected(ApiErrorBody),

    /// A payload could not be converted to or from JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The outbound payload failed validation
    #[error("Invalid payload: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Storage service error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The action requires a logged-in session
    #[error("Not logged in")]
    Unauthenticated,
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Http(error.into())
        }
    }
}

impl ClientError {
    /// The human-readable text the server put in `field`, if this error
    /// carries a server body
    #[must_use]
    pub fn server_message(&self, field: ErrorField) -> Option<&str> {
        match self {
            Self::Api { body, .. } | Self::Rejected(body) => body.message(field),
            _ => None,
        }
    }

    /// Text shown in the status banner: the server's message in `field`,
    /// then any other server message, otherwise this error's own description
    #[must_use]
    pub fn banner_message(&self, field: ErrorField) -> String {
        let fallback = match field {
            ErrorField::Error => ErrorField::Detail,
            ErrorField::Detail => ErrorField::Error,
        };

        self.server_message(field)
            .or_else(|| self.server_message(fallback))
            .map_or_else(|| self.to_string(), ToString::to_string)
    }
}
