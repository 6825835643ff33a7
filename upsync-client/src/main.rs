//! upsync - terminal front end for the upsync client core
//!
//! Subcommands:
//! - `list`: download once and print the records sorted by name
//! - `watch`: keep the list synchronized, re-render on every change
//! - `submit`: create a record and upload its file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use upsync_client::{
    BinaryPayload, DataSyncScheduler, ItemStore, ReqwestGateway, SubmissionError,
    SubmissionOrchestrator, SyncState, UploadCandidate,
};
use upsync_common::config::{log_source, ConfigOverrides};
use upsync_common::events::{EventBus, SubmissionPhase, UpsyncEvent};
use upsync_common::{time, ClientConfig};

const NO_DATA_MESSAGE: &str = "No data available";
const SUBMITTED_MESSAGE: &str = "Form was submitted";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "upsync")]
#[command(about = "Submit records with files and keep the record list synchronized")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "UPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// List endpoint URL
    #[arg(long, env = "UPSYNC_DATA_ENDPOINT")]
    data_endpoint: Option<String>,

    /// Record-creation endpoint URL
    #[arg(long, env = "UPSYNC_SUBMIT_ENDPOINT")]
    submit_endpoint: Option<String>,

    /// Upload endpoint URL; the upload id is appended as a path segment
    #[arg(long, env = "UPSYNC_UPLOAD_ENDPOINT")]
    upload_endpoint: Option<String>,

    /// Enable timer and signal driven refreshes
    #[arg(long, env = "UPSYNC_AUTO_SYNC")]
    auto_sync: Option<bool>,

    /// Refresh interval in milliseconds
    #[arg(long, env = "UPSYNC_SYNC_INTERVAL_MS")]
    sync_interval_ms: Option<u64>,

    /// Append the submitted record locally instead of downloading the list again
    #[arg(long, env = "UPSYNC_APPEND_ON_SUCCESS")]
    append_on_success: Option<bool>,

    /// Run client-side validation before submitting
    #[arg(long, env = "UPSYNC_VALIDATION_ENABLED")]
    validation_enabled: Option<bool>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "UPSYNC_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the list once and print it
    List,
    /// Keep the list synchronized; each line on stdin forces a refresh
    Watch,
    /// Create a record and upload its file
    Submit {
        #[arg(long)]
        name: String,
        /// Height as entered; validated client-side unless disabled
        #[arg(long, allow_hyphen_values = true)]
        height: String,
        #[arg(long)]
        file: PathBuf,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_endpoint: self.data_endpoint.clone(),
            submit_endpoint: self.submit_endpoint.clone(),
            upload_endpoint: self.upload_endpoint.clone(),
            auto_sync: self.auto_sync,
            sync_interval_ms: self.sync_interval_ms,
            append_on_success: self.append_on_success,
            validation_enabled: self.validation_enabled,
            log_level: self.log_level.clone(),
        }
    }
}

/// Components wired the way every subcommand needs them
struct Client {
    store: Arc<ItemStore>,
    scheduler: Arc<DataSyncScheduler>,
    orchestrator: SubmissionOrchestrator,
    event_bus: EventBus,
}

impl Client {
    fn new(config: &ClientConfig) -> Result<Self> {
        let event_bus = EventBus::new(1000);
        let gateway = Arc::new(
            ReqwestGateway::new(&config.gateway).context("Failed to build HTTP client")?,
        );
        let store = Arc::new(ItemStore::new(event_bus.clone()));
        let scheduler = Arc::new(DataSyncScheduler::new(
            &config.endpoints,
            config.sync.clone(),
            gateway.clone(),
            store.clone(),
            event_bus.clone(),
        ));
        let orchestrator = SubmissionOrchestrator::new(
            &config.endpoints,
            &config.submission,
            gateway,
            store.clone(),
            scheduler.clone(),
            event_bus.clone(),
        );

        Ok(Self {
            store,
            scheduler,
            orchestrator,
            event_bus,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Only the file is read here; overrides are applied before validation
    let (mut config, source) = ClientConfig::load_with_source(args.config.as_deref())?;
    config.apply_overrides(args.overrides());

    // Logs go to stderr so stdout stays clean for rendered output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting upsync v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    log_source(source.as_deref());
    config.validate()?;
    info!(
        data = %config.endpoints.data,
        submit = %config.endpoints.submit,
        upload = %config.endpoints.upload,
        "Endpoints configured"
    );

    let client = Client::new(&config)?;

    match args.command {
        Command::List => run_list(&client).await,
        Command::Watch => run_watch(&client).await,
        Command::Submit { name, height, file } => run_submit(&client, name, height, &file).await,
    }
}

async fn run_list(client: &Client) -> Result<()> {
    if let Err(error) = client.scheduler.refresh().await {
        println!("{}", error);
        return Err(error).context("Download failed");
    }
    render(&client.store.snapshot());
    Ok(())
}

async fn run_watch(client: &Client) -> Result<()> {
    let mut states = client.store.subscribe();
    let mut events = client.event_bus.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let handle = client.scheduler.start();
    debug!(
        subscribers = client.event_bus.subscriber_count(),
        capacity = client.event_bus.capacity(),
        "Event bus ready"
    );
    if !handle.is_active() {
        println!("Auto-sync is disabled; running a single refresh");
        if let Err(error) = client.scheduler.refresh().await {
            println!("{}", error);
        }
    }

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if !state.loading {
                    render(&state);
                }
            }
            event = events.recv() => {
                if let Ok(UpsyncEvent::SyncFailed { message, .. }) = event {
                    println!("{}", message);
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(_)) => client.event_bus.request_refresh(),
                Ok(None) => stdin_open = false,
                Err(error) => {
                    warn!(%error, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    handle.stop().await;
    Ok(())
}

async fn run_submit(client: &Client, name: String, height: String, path: &Path) -> Result<()> {
    let payload = read_payload(path)?;

    info!(strategy = ?client.orchestrator.strategy(), "Submitting {}", name);

    let mut progress = client.orchestrator.subscribe_progress();
    let mut phases = client.orchestrator.subscribe_phase();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = phases.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match *phases.borrow_and_update() {
                        SubmissionPhase::Creating => eprintln!("Creating record..."),
                        SubmissionPhase::Uploading => eprintln!("Uploading file..."),
                        _ => {}
                    }
                }
                changed = progress.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let percent = *progress.borrow_and_update();
                    if percent > 0.0 {
                        eprintln!("Uploading... {}%", percent.round());
                    }
                }
            }
        }
    });

    let outcome = client
        .orchestrator
        .submit(UploadCandidate::new(name, height, payload))
        .await;
    printer.abort();

    match outcome {
        Ok(receipt) => {
            println!("{}", SUBMITTED_MESSAGE);
            info!(upload_id = %receipt.upload_id, applied = ?receipt.applied, "Submission complete");
            render(&client.store.snapshot());
            Ok(())
        }
        Err(SubmissionError::Validation(errors)) => {
            for (field, message) in errors {
                println!("{}: {}", field.as_str(), message);
            }
            anyhow::bail!("Form has invalid fields")
        }
        Err(error) => {
            match error.attempt_message() {
                Some(message) => println!("{}", message),
                None => {
                    for (field, message) in error.field_errors() {
                        println!("{}: {}", field.as_str(), message);
                    }
                }
            }
            Err(error).context("Submission failed")
        }
    }
}

fn read_payload(path: &Path) -> Result<BinaryPayload> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = infer::get(&bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

    Ok(BinaryPayload::new(name, mime_type, bytes))
}

/// Print the sorted list as a table
fn render(state: &SyncState) {
    let items = upsync_client::store::sorted_by_name(&state.items);
    if items.is_empty() {
        println!("{}", NO_DATA_MESSAGE);
        return;
    }

    let name_width = items
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    println!("{:<name_width$}  {:>6}  File", "Name", "Height");
    for record in &items {
        println!(
            "{:<name_width$}  {:>6}  {}",
            record.name, record.height, record.file
        );
    }
    if let Some(last_update) = state.last_update {
        println!("Last update: {}", time::to_iso8601(&last_update));
    }
}
