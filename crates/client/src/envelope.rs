//! Response envelopes of the events API.
//!
//! Successful responses wrap their payload as `{ "data": ... }`; failures
//! carry `{ "error": "...", "code": "..." }` with an optional `field`.

use serde::Deserialize;

use evently_core::services::ServiceError;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(default)]
    pub field: Option<String>,
}

impl From<ErrorBody> for ServiceError {
    fn from(body: ErrorBody) -> Self {
        let err = ServiceError::new(body.code, body.error);
        match body.field {
            Some(field) if !field.trim().is_empty() => err.with_field(field.trim()),
            _ => err,
        }
    }
}

/// Parse an error body, if the server sent a structured one.
pub fn parse_error_body(body: &str) -> Option<ErrorBody> {
    serde_json::from_str(body).ok()
}

/// Error code for a status that came without a structured body.
pub fn code_for_status(status: u16) -> &'static str {
    match status {
        400 | 422 => "VALIDATION_ERROR",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        409 => "CONFLICT",
        429 => "RATE_LIMITED",
        _ => "INTERNAL_ERROR",
    }
}
