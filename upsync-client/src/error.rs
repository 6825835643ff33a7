//! Error types for upsync-client
//!
//! Every failure of the public operations resolves to one of these enums.
//! Their `Display` output is the exact user-facing text.

use crate::validation::{FieldErrors, FormField};
use thiserror::Error;
use upsync_common::events::SubmissionPhase;

/// Shown when a submission request got no response
pub const OFFLINE_MESSAGE: &str =
    "Application is probably offline, check your internet connection and try it again.";
/// Shown when the list endpoint answered with an error or an invalid payload
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Error while downloading data";
/// Shown when the list endpoint could not be reached
pub const DOWNLOAD_UNREACHABLE_MESSAGE: &str =
    "Data could not be loaded, check your internet connection and try it again.";
/// Create phase answered with a non-success status
pub const SUBMIT_REJECTED_MESSAGE: &str = "Error while submitting form";
/// Create phase answered 200 without an upload id
pub const SUBMIT_NO_UPLOAD_ID_MESSAGE: &str = "Submitting Failed";
/// Upload phase failed without a server explanation
pub const UPLOAD_FAILED_MESSAGE: &str = "Uploading failed";

/// Transport-level failure reported by an [`HttpGateway`](crate::gateway::HttpGateway)
///
/// An HTTP response with any status is NOT an error at this level.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Request was sent but no response arrived (refused, reset, timed out)
    #[error("No response from {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Request could not be built or was never sent
    #[error("Request could not be sent: {0}")]
    Request(String),
}

/// Failure of one list refresh
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Non-200 status, invalid payload shape, or a malformed request
    #[error("Error while downloading data")]
    Rejected,

    /// No response from the list endpoint
    #[error("Data could not be loaded, check your internet connection and try it again.")]
    Unreachable,
}

/// Where the UI should place a submission error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Banner for the whole attempt
    Attempt,
    /// Next to one form field
    Field(FormField),
    /// Per-field messages from client-side validation
    Fields,
}

/// Failure of one submission attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    /// Client-side validation blocked the attempt before any request
    #[error("Form has invalid fields")]
    Validation(FieldErrors),

    /// Record creation failed; no upload was attempted
    #[error("{message}")]
    CreateRejected { status: Option<u16>, message: String },

    /// The file upload failed after the record was created
    #[error("{message}")]
    UploadRejected { status: Option<u16>, message: String },

    /// A request of the attempt got no response
    #[error("Application is probably offline, check your internet connection and try it again.")]
    Unreachable { phase: SubmissionPhase },

    /// `submit` was called while another attempt was in flight
    #[error("A submission is already in progress")]
    AlreadySubmitting,
}

impl SubmissionError {
    pub fn scope(&self) -> ErrorScope {
        match self {
            SubmissionError::Validation(_) => ErrorScope::Fields,
            SubmissionError::UploadRejected { .. } => ErrorScope::Field(FormField::File),
            SubmissionError::CreateRejected { .. }
            | SubmissionError::Unreachable { .. }
            | SubmissionError::AlreadySubmitting => ErrorScope::Attempt,
        }
    }

    /// Field placement map; empty for attempt-scoped errors
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            SubmissionError::Validation(errors) => errors.clone(),
            SubmissionError::UploadRejected { message, .. } => {
                FieldErrors::from([(FormField::File, message.clone())])
            }
            _ => FieldErrors::new(),
        }
    }

    /// Banner text; `None` for field-scoped errors
    pub fn attempt_message(&self) -> Option<String> {
        match self.scope() {
            ErrorScope::Attempt => Some(self.to_string()),
            _ => None,
        }
    }
}
