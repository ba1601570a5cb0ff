//! External collaborators consumed by the wizard.
//!
//! The wizard never talks to the network directly. It calls these traits,
//! which the `evently-client` crate implements over HTTP and tests implement
//! in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::draft::{Attribution, PendingFile};
use crate::submission::SubmissionPayload;

// ---------------------------------------------------------------------------
// Event creation
// ---------------------------------------------------------------------------

/// The record returned by the create operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Structured failure of the create operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Machine-readable code, e.g. `VALIDATION_ERROR`.
    pub code: String,
    pub message: String,
    /// Field path the server blamed, when it named one.
    pub field: Option<String>,
}

/// Code used when the request never produced a structured response.
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// A failure below the HTTP layer (DNS, connect, timeout).
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NETWORK_ERROR_CODE, message)
    }
}

/// Create operation of the remote event collection.
#[async_trait]
pub trait EventService: Send + Sync {
    async fn create(&self, payload: SubmissionPayload) -> Result<CreatedEvent, ServiceError>;
}

// ---------------------------------------------------------------------------
// Asset upload
// ---------------------------------------------------------------------------

/// Destination bucket of an uploaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    EventImage,
    SpeakerPhoto,
}

impl AssetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventImage => "event_image",
            Self::SpeakerPhoto => "speaker_photo",
        }
    }
}

/// Metadata of a stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub url: String,
    pub storage_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub attribution: Option<Attribution>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// Worth retrying: timeouts, connection resets, 5xx, rate limiting.
    #[error("Transient upload failure: {0}")]
    Transient(String),

    /// The server refused the file (too large, wrong type, ...).
    #[error("Upload rejected: {0}")]
    Rejected(String),
}

impl UploadError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Black-box asset storage.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(
        &self,
        file: &PendingFile,
        category: AssetCategory,
    ) -> Result<UploadedAsset, UploadError>;
}

// ---------------------------------------------------------------------------
// Subscription gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Subscription check failed: {0}")]
pub struct GateError(pub String);

/// Billing check consulted before a wizard may be opened.
#[async_trait]
pub trait SubscriptionGate: Send + Sync {
    async fn can_create_event(&self, user_id: &str) -> Result<bool, GateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_display() {
        let err = ServiceError::new("CONFLICT", "Duplicate event").with_field("title");
        assert_eq!(err.to_string(), "CONFLICT: Duplicate event");
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn only_transient_uploads_are_retryable() {
        assert!(UploadError::Transient("timeout".into()).is_transient());
        assert!(!UploadError::Rejected("too large".into()).is_transient());
    }

    #[test]
    fn category_names() {
        assert_eq!(AssetCategory::EventImage.as_str(), "event_image");
        assert_eq!(AssetCategory::SpeakerPhoto.as_str(), "speaker_photo");
    }
}
