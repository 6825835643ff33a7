//! Data synchronization scheduler
//!
//! Downloads the record list into the [`ItemStore`]:
//! - on demand through [`DataSyncScheduler::refresh`]
//! - once immediately and then on a fixed interval while started
//! - once per `RefreshRequested` signal on the event bus while started
//!
//! Timer and signal listener are gated together by `sync.auto_sync`.
//! Overlapping refreshes are independent requests; the store keeps whichever
//! transition lands last.

use crate::error::{GatewayError, SyncError};
use crate::gateway::HttpGateway;
use crate::store::{ItemStore, StoreAction};
use crate::validation::parse_payload;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use upsync_common::config::{EndpointConfig, SyncConfig};
use upsync_common::events::{EventBus, RefreshTrigger, UpsyncEvent};
use upsync_common::time;

/// Scheduler of list downloads
pub struct DataSyncScheduler {
    endpoint: String,
    config: SyncConfig,
    gateway: Arc<dyn HttpGateway>,
    store: Arc<ItemStore>,
    event_bus: EventBus,
    last_error: RwLock<Option<SyncError>>,
}

impl DataSyncScheduler {
    pub fn new(
        endpoints: &EndpointConfig,
        config: SyncConfig,
        gateway: Arc<dyn HttpGateway>,
        store: Arc<ItemStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            endpoint: endpoints.data.clone(),
            config,
            gateway,
            store,
            event_bus,
            last_error: RwLock::new(None),
        }
    }

    /// Download the list once and replace the store contents
    ///
    /// Returns the number of records received.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        self.refresh_with(RefreshTrigger::Manual).await
    }

    /// Error of the most recent completed refresh, cleared by a success
    pub fn last_error(&self) -> Option<SyncError> {
        self.last_error.read().map(|e| *e).unwrap_or(None)
    }

    /// Message for the download error banner
    pub fn last_error_message(&self) -> Option<String> {
        self.last_error().map(|e| e.to_string())
    }

    pub(crate) async fn refresh_with(&self, trigger: RefreshTrigger) -> Result<usize, SyncError> {
        debug!(?trigger, url = %self.endpoint, "Refreshing record list");
        self.store.dispatch(StoreAction::LoadingStarted);
        self.event_bus.emit_lossy(UpsyncEvent::SyncStarted {
            trigger,
            timestamp: time::now(),
        });

        let outcome = match self.gateway.get_json(&self.endpoint).await {
            Ok(response) if response.is_ok() => match parse_payload(&response.body) {
                Some(items) => Ok(items),
                None => {
                    warn!(url = %self.endpoint, "Downloaded payload has an invalid shape");
                    Err(SyncError::Rejected)
                }
            },
            Ok(response) => {
                warn!(url = %self.endpoint, status = response.status, "List request rejected");
                Err(SyncError::Rejected)
            }
            Err(GatewayError::Transport { reason, .. }) => {
                warn!(url = %self.endpoint, %reason, "List endpoint unreachable");
                Err(SyncError::Unreachable)
            }
            Err(GatewayError::Request(reason)) => {
                warn!(url = %self.endpoint, %reason, "List request could not be sent");
                Err(SyncError::Rejected)
            }
        };

        match outcome {
            Ok(items) => {
                let count = items.len();
                self.store.dispatch(StoreAction::ItemsFetched {
                    items,
                    fetched_at: time::now(),
                });
                self.set_last_error(None);
                self.event_bus.emit_lossy(UpsyncEvent::SyncSucceeded {
                    item_count: count,
                    timestamp: time::now(),
                });
                info!(count, "Record list synchronized");
                Ok(count)
            }
            Err(error) => {
                self.store.dispatch(StoreAction::LoadingFinished);
                self.set_last_error(Some(error));
                self.event_bus.emit_lossy(UpsyncEvent::SyncFailed {
                    message: error.to_string(),
                    timestamp: time::now(),
                });
                Err(error)
            }
        }
    }

    fn set_last_error(&self, error: Option<SyncError>) {
        if let Ok(mut slot) = self.last_error.write() {
            *slot = error;
        }
    }

    /// Issue a refresh on its own task so stopping the scheduler never aborts it
    fn spawn_refresh(self: &Arc<Self>, trigger: RefreshTrigger) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are already recorded in last_error and on the bus
            let _ = this.refresh_with(trigger).await;
        });
    }

    /// Start timer and signal triggers
    ///
    /// With auto-sync disabled nothing is started and the handle is inactive.
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let token = CancellationToken::new();

        if !self.config.auto_sync {
            info!("Auto-sync disabled by configuration");
            return SchedulerHandle { token, task: None };
        }

        info!(interval_ms = self.config.interval_ms, "Starting DataSyncScheduler");

        let this = Arc::clone(self);
        let cancelled = token.clone();
        let mut signals = self.event_bus.subscribe();
        let period = time::millis_to_duration(self.config.interval_ms);

        let task = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = timer.tick() => this.spawn_refresh(RefreshTrigger::Timer),
                    received = signals.recv() => match received {
                        Ok(UpsyncEvent::RefreshRequested { .. }) => {
                            this.spawn_refresh(RefreshTrigger::Signal)
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Scheduler lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            debug!("DataSyncScheduler stopped");
        });

        SchedulerHandle {
            token,
            task: Some(task),
        }
    }
}

/// Running timer/signal loop of a [`DataSyncScheduler`]
pub struct SchedulerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// False when auto-sync was disabled at start
    pub fn is_active(&self) -> bool {
        self.task.is_some() && !self.token.is_cancelled()
    }

    /// Stop scheduling future refreshes; in-flight ones run to completion
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
