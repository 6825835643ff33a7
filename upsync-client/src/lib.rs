//! # Upsync Client
//!
//! Client core for submitting a named record plus a binary file to a remote
//! service and keeping a local list of submitted records synchronized.
//!
//! **Components:**
//! - [`validation`]: client-side checks of a candidate and of downloaded payloads
//! - [`store`]: reducer-backed in-memory state with sorted/raw selectors
//! - [`gateway`]: HTTP transport contract and its reqwest implementation
//! - [`sync`]: timer- and signal-driven list downloads
//! - [`submission`]: two-phase create-then-upload protocol with progress

pub mod error;
pub mod gateway;
pub mod store;
pub mod submission;
pub mod sync;
pub mod validation;

pub use error::{ErrorScope, GatewayError, SubmissionError, SyncError};
pub use gateway::{GatewayResponse, HttpGateway, ProgressFn, ReqwestGateway};
pub use store::{ItemStore, StoreAction, SyncState};
pub use submission::{SubmissionOrchestrator, SubmissionReceipt, SuccessStrategy};
pub use sync::{DataSyncScheduler, SchedulerHandle};
pub use validation::{validate, BinaryPayload, FieldErrors, FormField, UploadCandidate};
