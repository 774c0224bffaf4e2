//! Error types for the todo API client.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because the view
//! layer scopes them differently from a generic failure. All other non-2xx
//! responses land in `HttpError` with the raw status code and body for
//! debugging. `Validation` is the only variant raised before a request is
//! built.

use thiserror::Error;

use crate::auth::AuthError;

/// Errors returned by the todo API client and view state.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected locally; no request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The server returned 401 or 403.
    #[error("not authorized: {body}")]
    Unauthorized { body: String },

    /// The server returned 404 — the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401, 403 or 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The credential provider failed while fetching a token.
    #[error("credential provider failed: {0}")]
    Credential(#[from] AuthError),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

impl ApiError {
    /// Short, non-technical message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Please enter a title.",
            ApiError::Unauthorized { .. } | ApiError::Credential(_) => {
                "Your session has expired. Please sign in again."
            }
            ApiError::NotFound => "That item no longer exists.",
            ApiError::HttpError { .. }
            | ApiError::Transport(_)
            | ApiError::DeserializationError(_)
            | ApiError::SerializationError(_) => "Something went wrong. Please try again.",
        }
    }
}
