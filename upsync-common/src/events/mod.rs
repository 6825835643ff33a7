//! Event types for the upsync event system
//!
//! Provides shared event definitions and the EventBus connecting the data
//! components with whatever presentation layer is attached.

mod submission_types;

pub use submission_types::{RefreshTrigger, SubmissionPhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Upsync event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UpsyncEvent {
    /// Item store applied a transition
    ItemsChanged {
        /// Number of records after the transition
        item_count: usize,
        /// Download in flight
        loading: bool,
        /// Time of the last successful full replace
        last_update: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },

    /// A list download was issued
    SyncStarted {
        trigger: RefreshTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A list download replaced the store contents
    SyncSucceeded {
        item_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A list download failed; `message` is user-facing
    SyncFailed {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// External signal asking for one immediate refresh
    ///
    /// Only honoured while auto-sync is active.
    RefreshRequested { timestamp: DateTime<Utc> },

    /// Submission state machine moved
    SubmissionPhaseChanged {
        phase: SubmissionPhase,
        timestamp: DateTime<Utc>,
    },

    /// Upload progress, republished on every transport callback
    UploadProgress {
        /// Percentage in `[0, 100]`
        percent: f64,
        bytes_sent: u64,
        bytes_total: u64,
    },

    /// Record created and file uploaded ("Form was submitted")
    SubmissionSucceeded {
        upload_id: String,
        name: String,
        /// Display name of the uploaded file
        file: String,
        timestamp: DateTime<Utc>,
    },

    /// Submission attempt failed
    SubmissionFailed {
        message: String,
        /// Form field the message belongs to; `None` for attempt-wide errors
        field: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl UpsyncEvent {
    /// Build a refresh signal stamped with the current time
    pub fn refresh_requested() -> Self {
        UpsyncEvent::RefreshRequested {
            timestamp: Utc::now(),
        }
    }

    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            UpsyncEvent::ItemsChanged { .. } => "ItemsChanged",
            UpsyncEvent::SyncStarted { .. } => "SyncStarted",
            UpsyncEvent::SyncSucceeded { .. } => "SyncSucceeded",
            UpsyncEvent::SyncFailed { .. } => "SyncFailed",
            UpsyncEvent::RefreshRequested { .. } => "RefreshRequested",
            UpsyncEvent::SubmissionPhaseChanged { .. } => "SubmissionPhaseChanged",
            UpsyncEvent::UploadProgress { .. } => "UploadProgress",
            UpsyncEvent::SubmissionSucceeded { .. } => "SubmissionSucceeded",
            UpsyncEvent::SubmissionFailed { .. } => "SubmissionFailed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use upsync_common::events::{EventBus, UpsyncEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(UpsyncEvent::refresh_requested()).ok();
/// assert_eq!(rx.try_recv().unwrap().event_type(), "RefreshRequested");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UpsyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<UpsyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: UpsyncEvent,
    ) -> Result<usize, broadcast::error::SendError<UpsyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: UpsyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Raise the external "refresh requested" signal
    pub fn request_refresh(&self) {
        self.emit_lossy(UpsyncEvent::refresh_requested());
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
