//! Submission orchestrator
//!
//! Drives the two-phase protocol for one [`UploadCandidate`]:
//!
//! 1. **Create**: `POST {name, height}` to the submit endpoint. Succeeds only
//!    on HTTP 200 with a non-empty `uploadId`.
//! 2. **Upload**: multipart `POST` of the file to `<upload>/<uploadId>`,
//!    republishing progress on every transport callback. Succeeds only on
//!    HTTP 200 with a truthy `result`.
//!
//! Phase 2 never starts unless phase 1 succeeded. On success the configured
//! [`SuccessStrategy`] runs exactly once. Every failure path resets progress
//! and resolves to one [`SubmissionError`].

use crate::error::{
    GatewayError, SubmissionError, SUBMIT_NO_UPLOAD_ID_MESSAGE, SUBMIT_REJECTED_MESSAGE,
    UPLOAD_FAILED_MESSAGE,
};
use crate::gateway::{HttpGateway, ProgressFn};
use crate::store::{ItemStore, StoreAction};
use crate::sync::DataSyncScheduler;
use crate::validation::{validate, BinaryPayload, UploadCandidate};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use upsync_common::api::{CreateRecordRequest, CreateRecordResponse, HeightInput, UploadResponse};
use upsync_common::config::{EndpointConfig, SubmissionConfig};
use upsync_common::events::{EventBus, RefreshTrigger, SubmissionPhase, UpsyncEvent};
use upsync_common::{time, Record};

/// What happens to the local list after a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessStrategy {
    /// Append the submitted record from client-known values
    AppendRecord,
    /// Download the full list again
    Resync,
}

impl SuccessStrategy {
    pub fn from_config(config: &SubmissionConfig) -> Self {
        if config.append_on_success {
            SuccessStrategy::AppendRecord
        } else {
            SuccessStrategy::Resync
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub upload_id: String,
    /// Record as known to the client; `None` when the height was not integral
    pub record: Option<Record>,
    /// Strategy that actually ran
    pub applied: SuccessStrategy,
}

/// Percentage of an upload, clamped to `[0, 100]`
pub fn progress_percent(bytes_sent: u64, bytes_total: u64) -> f64 {
    if bytes_total == 0 {
        return 100.0;
    }
    (bytes_sent as f64 / bytes_total as f64 * 100.0).clamp(0.0, 100.0)
}

pub struct SubmissionOrchestrator {
    submit_endpoint: String,
    upload_endpoint: String,
    validation_enabled: bool,
    strategy: SuccessStrategy,
    gateway: Arc<dyn HttpGateway>,
    store: Arc<ItemStore>,
    scheduler: Arc<DataSyncScheduler>,
    event_bus: EventBus,
    phase: watch::Sender<SubmissionPhase>,
    progress: Arc<watch::Sender<f64>>,
}

impl SubmissionOrchestrator {
    pub fn new(
        endpoints: &EndpointConfig,
        config: &SubmissionConfig,
        gateway: Arc<dyn HttpGateway>,
        store: Arc<ItemStore>,
        scheduler: Arc<DataSyncScheduler>,
        event_bus: EventBus,
    ) -> Self {
        let (phase, _) = watch::channel(SubmissionPhase::Idle);
        let (progress, _) = watch::channel(0.0);
        Self {
            submit_endpoint: endpoints.submit.clone(),
            upload_endpoint: endpoints.upload.trim_end_matches('/').to_string(),
            validation_enabled: config.validation_enabled,
            strategy: SuccessStrategy::from_config(config),
            gateway,
            store,
            scheduler,
            event_bus,
            phase,
            progress: Arc::new(progress),
        }
    }

    /// Replace the success handler without touching the protocol
    pub fn with_strategy(mut self, strategy: SuccessStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> SuccessStrategy {
        self.strategy
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.borrow()
    }

    /// True while a submission is in flight; the UI disables submitting
    pub fn is_submitting(&self) -> bool {
        self.phase().is_in_flight()
    }

    /// Current upload percentage, 0 when idle
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// Validate, create the record, upload its file, then apply the success strategy
    pub async fn submit(
        &self,
        candidate: UploadCandidate,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let errors = validate(&candidate, self.validation_enabled);
        if !errors.is_empty() {
            debug!(fields = errors.len(), "Submission blocked by validation");
            return Err(SubmissionError::Validation(errors));
        }

        if !self.begin() {
            warn!("submit called while another submission is in flight");
            return Err(SubmissionError::AlreadySubmitting);
        }

        let outcome = self.run(&candidate).await;
        self.progress.send_replace(0.0);

        match outcome {
            Ok(upload_id) => {
                // Stays in flight until the success strategy has finished
                let receipt = self.on_success(upload_id, &candidate).await;
                self.set_phase(SubmissionPhase::Idle);
                Ok(receipt)
            }
            Err(error) => {
                self.set_phase(SubmissionPhase::Failed);
                warn!(%error, scope = ?error.scope(), "Submission failed");
                self.event_bus.emit_lossy(UpsyncEvent::SubmissionFailed {
                    message: error.to_string(),
                    field: error
                        .field_errors()
                        .keys()
                        .next()
                        .map(|field| field.as_str().to_string()),
                    timestamp: time::now(),
                });
                Err(error)
            }
        }
    }

    /// Atomically move from a resting phase to `Creating`
    fn begin(&self) -> bool {
        let started = self.phase.send_if_modified(|phase| {
            if phase.is_in_flight() {
                false
            } else {
                *phase = SubmissionPhase::Creating;
                true
            }
        });
        if started {
            self.emit_phase(SubmissionPhase::Creating);
        }
        started
    }

    fn set_phase(&self, phase: SubmissionPhase) {
        self.phase.send_replace(phase);
        self.emit_phase(phase);
    }

    fn emit_phase(&self, phase: SubmissionPhase) {
        self.event_bus.emit_lossy(UpsyncEvent::SubmissionPhaseChanged {
            phase,
            timestamp: time::now(),
        });
    }

    async fn run(&self, candidate: &UploadCandidate) -> Result<String, SubmissionError> {
        // Only reachable with validation disabled
        let Some(file) = candidate.file.as_ref() else {
            return Err(SubmissionError::CreateRejected {
                status: None,
                message: SUBMIT_REJECTED_MESSAGE.to_string(),
            });
        };

        let upload_id = self.create(candidate).await?;
        self.set_phase(SubmissionPhase::Uploading);
        self.upload(&upload_id, file).await?;
        Ok(upload_id)
    }

    async fn create(&self, candidate: &UploadCandidate) -> Result<String, SubmissionError> {
        let construction_error = || SubmissionError::CreateRejected {
            status: None,
            message: SUBMIT_REJECTED_MESSAGE.to_string(),
        };

        let request = CreateRecordRequest {
            name: candidate.name.clone(),
            height: candidate.height.clone(),
        };
        let body = serde_json::to_value(&request).map_err(|_| construction_error())?;

        debug!(url = %self.submit_endpoint, name = %candidate.name, "Creating record");
        match self.gateway.post_json(&self.submit_endpoint, &body).await {
            Ok(response) if response.is_success() => {
                match CreateRecordResponse::from_body(&response.body).upload_id {
                    Some(upload_id) if response.is_ok() => Ok(upload_id),
                    _ => Err(SubmissionError::CreateRejected {
                        status: Some(response.status),
                        message: SUBMIT_NO_UPLOAD_ID_MESSAGE.to_string(),
                    }),
                }
            }
            Ok(response) => Err(SubmissionError::CreateRejected {
                status: Some(response.status),
                message: SUBMIT_REJECTED_MESSAGE.to_string(),
            }),
            Err(GatewayError::Transport { .. }) => Err(SubmissionError::Unreachable {
                phase: SubmissionPhase::Creating,
            }),
            Err(GatewayError::Request(_)) => Err(construction_error()),
        }
    }

    async fn upload(&self, upload_id: &str, file: &BinaryPayload) -> Result<(), SubmissionError> {
        let url = format!("{}/{}", self.upload_endpoint, upload_id);

        let progress = Arc::clone(&self.progress);
        let event_bus = self.event_bus.clone();
        let on_progress: ProgressFn = Arc::new(move |bytes_sent, bytes_total| {
            let percent = progress_percent(bytes_sent, bytes_total);
            progress.send_replace(percent);
            event_bus.emit_lossy(UpsyncEvent::UploadProgress {
                percent,
                bytes_sent,
                bytes_total,
            });
        });

        debug!(url = %url, file = %file.name, size = file.size, "Uploading file");
        match self.gateway.post_file(&url, file, on_progress).await {
            Ok(response) if response.is_success() => {
                if response.is_ok() && UploadResponse::from_body(&response.body).result {
                    Ok(())
                } else {
                    Err(SubmissionError::UploadRejected {
                        status: Some(response.status),
                        message: UPLOAD_FAILED_MESSAGE.to_string(),
                    })
                }
            }
            Ok(response) => Err(SubmissionError::UploadRejected {
                status: Some(response.status),
                message: UploadResponse::from_body(&response.body)
                    .message
                    .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string()),
            }),
            Err(GatewayError::Transport { .. }) => Err(SubmissionError::Unreachable {
                phase: SubmissionPhase::Uploading,
            }),
            Err(GatewayError::Request(_)) => Err(SubmissionError::UploadRejected {
                status: None,
                message: UPLOAD_FAILED_MESSAGE.to_string(),
            }),
        }
    }

    async fn on_success(&self, upload_id: String, candidate: &UploadCandidate) -> SubmissionReceipt {
        let file_name = candidate
            .file
            .as_ref()
            .map(|file| file.name.clone())
            .unwrap_or_default();
        let record = candidate
            .height
            .as_ref()
            .and_then(HeightInput::as_integer)
            .map(|height| Record::new(candidate.name.clone(), height, file_name.clone()));

        let applied = match (self.strategy, &record) {
            (SuccessStrategy::AppendRecord, Some(record)) => {
                self.store.dispatch(StoreAction::ItemAppended(record.clone()));
                SuccessStrategy::AppendRecord
            }
            (SuccessStrategy::AppendRecord, None) => {
                warn!("Height is not an integer, re-downloading instead of appending");
                self.resync().await;
                SuccessStrategy::Resync
            }
            (SuccessStrategy::Resync, _) => {
                self.resync().await;
                SuccessStrategy::Resync
            }
        };

        info!(upload_id = %upload_id, name = %candidate.name, ?applied, "Form was submitted");
        self.event_bus.emit_lossy(UpsyncEvent::SubmissionSucceeded {
            upload_id: upload_id.clone(),
            name: candidate.name.clone(),
            file: file_name,
            timestamp: time::now(),
        });

        SubmissionReceipt {
            upload_id,
            record,
            applied,
        }
    }

    async fn resync(&self) {
        // The scheduler records the failure for the download banner
        if let Err(error) = self.scheduler.refresh_with(RefreshTrigger::Submission).await {
            warn!(%error, "Re-sync after submission failed");
        }
    }
}
