//! Item store
//!
//! Single writer of [`SyncState`]. Components never hold references into the
//! state; they dispatch [`StoreAction`] values and read snapshots.
//!
//! The transition function [`reduce`] is pure. [`ItemStore`] applies it under
//! a `tokio::sync::watch` channel, so every dispatch is atomic and the last
//! applied transition wins.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::trace;
use upsync_common::events::{EventBus, UpsyncEvent};
use upsync_common::Record;

/// Synchronized list plus download bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// True only while a download is in flight
    pub loading: bool,
    /// Time of the last successful full replace
    pub last_update: Option<DateTime<Utc>>,
    /// Records in arrival order
    pub items: Vec<Record>,
}

/// Discrete state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    LoadingStarted,
    /// Ends a failed download; items and last_update are untouched
    LoadingFinished,
    /// Replaces the whole list
    ItemsFetched {
        items: Vec<Record>,
        fetched_at: DateTime<Utc>,
    },
    /// Optimistic append; superseded by the next fetch
    ItemAppended(Record),
}

/// Pure transition function
pub fn reduce(state: SyncState, action: StoreAction) -> SyncState {
    match action {
        StoreAction::LoadingStarted => SyncState {
            loading: true,
            ..state
        },
        StoreAction::LoadingFinished => SyncState {
            loading: false,
            ..state
        },
        StoreAction::ItemsFetched { items, fetched_at } => SyncState {
            loading: false,
            last_update: Some(fetched_at),
            items,
        },
        StoreAction::ItemAppended(record) => {
            let mut items = state.items;
            items.push(record);
            SyncState { items, ..state }
        }
    }
}

/// Records sorted by name (stable, ascending, byte-wise lexical)
pub fn sorted_by_name(items: &[Record]) -> Vec<Record> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

/// Observable state container
pub struct ItemStore {
    state: watch::Sender<SyncState>,
    event_bus: EventBus,
}

impl ItemStore {
    pub fn new(event_bus: EventBus) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self { state, event_bus }
    }

    /// Apply one transition and notify subscribers
    pub fn dispatch(&self, action: StoreAction) {
        trace!(?action, "ItemStore dispatch");
        self.state
            .send_modify(|state| *state = reduce(std::mem::take(state), action));

        let snapshot = self.state.borrow();
        self.event_bus.emit_lossy(UpsyncEvent::ItemsChanged {
            item_count: snapshot.items.len(),
            loading: snapshot.loading,
            last_update: snapshot.last_update,
            timestamp: Utc::now(),
        });
    }

    /// Receive a snapshot after every transition
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Full copy of the current state
    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Records sorted by name; derived on every call
    pub fn items_sorted(&self) -> Vec<Record> {
        sorted_by_name(&self.state.borrow().items)
    }

    /// Records in arrival order
    pub fn items(&self) -> Vec<Record> {
        self.state.borrow().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_update
    }
}
