use crate::persistence::DraftStoreError;
use crate::services::{GateError, ServiceError, UploadError};
use crate::steps::StepId;
use crate::types::UserId;

/// Shown whenever a draft write fails.
pub const DRAFT_SAVE_FAILED: &str =
    "Your draft could not be saved. You can keep editing, but changes may be lost on reload.";

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("An upload is still in progress")]
    UploadInProgress,

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("Event limit reached for user {user_id}")]
    LimitReached { user_id: UserId },

    #[error("No submission is in flight")]
    NoSubmission,

    #[error("The wizard is closed")]
    Closed,

    #[error("Unknown upload ticket {0}")]
    UnknownUpload(u64),

    #[error("The upload target no longer exists")]
    UploadTargetGone,

    #[error("Submission rejected ({}): {}", .error.code, .error.message)]
    Submission {
        error: ServiceError,
        /// Step the rejection was routed to, when the service named a field.
        step: Option<StepId>,
    },

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    DraftStore(#[from] DraftStoreError),

    #[error("Failed to build submission payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl WizardError {
    /// Short, actionable text for the end user.
    ///
    /// Technical details stay in the `Display` output, which goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::UploadInProgress => {
                "Please wait for the upload to finish before continuing.".into()
            }
            Self::SubmissionInFlight => "Your event is being created, please wait.".into(),
            Self::LimitReached { .. } => {
                "You have reached your plan's event limit. Upgrade to create more events.".into()
            }
            Self::NoSubmission => "There is nothing to submit yet.".into(),
            Self::Closed => "This wizard has been closed. Start a new event to continue.".into(),
            Self::UnknownUpload(_) | Self::UploadTargetGone => {
                "The image was removed before its upload finished. Please add it again.".into()
            }
            Self::Submission { error, .. } => match error.code.as_str() {
                "VALIDATION_ERROR" => match &error.field {
                    Some(field) => format!(
                        "Please check the {} field and try again.",
                        field.replace('_', " ")
                    ),
                    None => "Some event details were rejected. Please review and resubmit.".into(),
                },
                "CONFLICT" => {
                    "A similar event already exists. Change the title or date and try again.".into()
                }
                "UNAUTHORIZED" => "Your session has expired. Sign in again, then resubmit.".into(),
                "FORBIDDEN" => "You are not allowed to create this event.".into(),
                _ => "We could not create your event. Please try again in a moment.".into(),
            },
            Self::Gate(_) => {
                "We could not check your subscription. Please try again in a moment.".into()
            }
            Self::Upload(UploadError::Rejected(_)) => {
                "This file could not be uploaded. Try a smaller JPEG or PNG image.".into()
            }
            Self::Upload(UploadError::Transient(_)) => {
                "The upload failed. Check your connection and try again.".into()
            }
            Self::DraftStore(_) => DRAFT_SAVE_FAILED.into(),
            Self::Payload(_) => {
                "Something went wrong preparing your event. Please try again.".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_message_depends_on_code() {
        let err = WizardError::Submission {
            error: ServiceError::new("VALIDATION_ERROR", "price: must be > 0")
                .with_field("early_bird_price"),
            step: Some(StepId::Tickets),
        };
        assert_eq!(
            err.user_message(),
            "Please check the early bird price field and try again."
        );
        assert_eq!(
            err.to_string(),
            "Submission rejected (VALIDATION_ERROR): price: must be > 0"
        );

        let err = WizardError::Submission {
            error: ServiceError::new("INTERNAL", "db down"),
            step: None,
        };
        assert!(!err.user_message().contains("db down"));
    }

    #[test]
    fn user_messages_hide_technical_text() {
        let errors = [
            WizardError::Upload(UploadError::Transient("connection reset by peer".into())),
            WizardError::Gate(GateError("HTTP 502".into())),
            WizardError::DraftStore(DraftStoreError::Unavailable("disk full".into())),
        ];
        for err in errors {
            let message = err.user_message();
            assert!(!message.is_empty());
            assert!(!message.contains("peer"));
            assert!(!message.contains("502"));
            assert!(!message.contains("disk full"));
        }
    }
}
