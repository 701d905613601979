use crate::cipher::{AuthenticationError, EncryptionError, MalformedKey};
use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Poll not found")]
    PollNotFound,
    #[error("Voter not found")]
    VoterNotFound,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Invalid vote token")]
    InvalidToken,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PollError::PollNotFound => (StatusCode::NOT_FOUND, "Poll not found"),
            PollError::VoterNotFound => (StatusCode::NOT_FOUND, "Voter not found"),
            PollError::InvalidKey => (StatusCode::BAD_REQUEST, "Invalid key"),
            PollError::InvalidToken => (StatusCode::NOT_FOUND, "Invalid vote token"),
            PollError::InvalidState(_) => (StatusCode::CONFLICT, "Operation not allowed"),
            PollError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            PollError::BackendError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage error"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}

impl From<StorageError> for PollError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(_) => PollError::PollNotFound,
            StorageError::Backend(msg) => PollError::BackendError(msg),
        }
    }
}

impl From<AuthenticationError> for PollError {
    fn from(_: AuthenticationError) -> Self {
        PollError::InvalidKey
    }
}

impl From<EncryptionError> for PollError {
    fn from(error: EncryptionError) -> Self {
        PollError::BackendError(error.to_string())
    }
}

impl From<MalformedKey> for PollError {
    fn from(_: MalformedKey) -> Self {
        PollError::InvalidKey
    }
}
