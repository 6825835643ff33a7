//! Submission-related type definitions

use serde::{Deserialize, Serialize};

/// Phase of one submission attempt
///
/// `Idle → Creating → Uploading → (Idle | Failed)`; a new attempt may start
/// from `Idle` or `Failed`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionPhase {
    /// No attempt in flight
    #[default]
    Idle,
    /// Waiting for the record-creation response
    Creating,
    /// Sending the file to the upload endpoint
    Uploading,
    /// Last attempt ended with an error
    Failed,
}

impl SubmissionPhase {
    /// True while a request of the attempt is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SubmissionPhase::Creating | SubmissionPhase::Uploading)
    }
}

impl std::fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionPhase::Idle => write!(f, "Idle"),
            SubmissionPhase::Creating => write!(f, "Creating"),
            SubmissionPhase::Uploading => write!(f, "Uploading"),
            SubmissionPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// What triggered a list refresh
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum RefreshTrigger {
    /// Interval timer (including the immediate first tick)
    Timer,
    /// External "refresh requested" signal
    Signal,
    /// Re-sync after a successful submission
    Submission,
    /// Direct call
    Manual,
}
