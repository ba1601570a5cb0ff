use evently_core::persistence::DraftStoreError;
use evently_core::services::{GateError, ServiceError, UploadError};

use crate::envelope::{code_for_status, parse_error_body};

/// Errors from the HTTP adapter layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Draft directory unavailable: {0}")]
    DraftDir(#[from] DraftStoreError),
}

impl ClientError {
    /// Whether repeating the request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::InvalidBaseUrl(_) | Self::DraftDir(_) => false,
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, body } => match parse_error_body(&body) {
                Some(parsed) => parsed.into(),
                None => ServiceError::new(
                    code_for_status(status),
                    format!("Request failed with HTTP {status}"),
                ),
            },
            other => ServiceError::network(other.to_string()),
        }
    }
}

impl From<ClientError> for UploadError {
    fn from(err: ClientError) -> Self {
        let message = match &err {
            ClientError::Api { body, .. } => parse_error_body(body)
                .map(|parsed| parsed.error)
                .unwrap_or_else(|| err.to_string()),
            _ => err.to_string(),
        };
        if err.is_transient() {
            UploadError::Transient(message)
        } else {
            UploadError::Rejected(message)
        }
    }
}

impl From<ClientError> for GateError {
    fn from(err: ClientError) -> Self {
        GateError(err.to_string())
    }
}
