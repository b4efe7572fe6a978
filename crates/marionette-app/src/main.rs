//! Marionette application binary - composition root.
//!
//! Ties the crates together into a single executable:
//! 1. Load and validate configuration from TOML (startup-fatal on error)
//! 2. Build the ingestion pipeline (store poller -> factory -> dispatch)
//! 3. Build the automation stage (queue -> limiter -> executor -> health)
//! 4. Start the background loops and the axum control API
//!
//! This binary wires an in-memory store and a logging input surface. A
//! deployment against a live chat client swaps those two seams for real
//! adapters; nothing else changes.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};

use marionette_api::state::AppState;
use marionette_automation::driver::ActionDriver;
use marionette_automation::executor::{Executor, ResultLog};
use marionette_automation::health::HealthMonitor;
use marionette_automation::locator::{LoggingSurface, SidebarLocator};
use marionette_automation::notify::WebhookNotifier;
use marionette_core::config::MarionetteConfig;
use marionette_core::control::PauseGate;
use marionette_core::types::{Contact, Room};
use marionette_pipeline::chain::HandlerChain;
use marionette_pipeline::dispatch::DispatchLoop;
use marionette_pipeline::factory::{Directory, MessageFactory};
use marionette_pipeline::handler::{build_records, DispatchContext};
use marionette_pipeline::limiter::RateLimiter;
use marionette_pipeline::poller::Poller;
use marionette_pipeline::queue::ActionQueue;
use marionette_pipeline::store::InMemoryStore;

/// Sender id the in-memory store uses for the logged-in account. A real
/// store adapter reports the account id it decrypted the store with.
const SELF_SENDER_ID: &str = "self";

/// Directory with no backing contact tables. Unresolved senders get a
/// placeholder from the factory; unresolved rooms are dropped by the
/// empty-room handler.
struct EmptyDirectory;

impl Directory for EmptyDirectory {
    fn contact(&self, _id: &str) -> Option<Contact> {
        None
    }

    fn room(&self, _id: &str) -> Option<Room> {
        None
    }
}

fn resolve_data_dir(configured: &str) -> PathBuf {
    if let Some(rest) = configured
        .strip_prefix("~/")
        .or_else(|| configured.strip_prefix("~\\"))
    {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(configured)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config first; everything else depends on it.
    let config_file = args.resolve_config_path();
    let mut config = MarionetteConfig::load(&config_file)?;
    config.api.port = args.resolve_port(config.api.port);
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.general.log_level.clone())
            }),
        )
        .init();

    tracing::info!("Starting Marionette v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    // Shared plumbing.
    let gate = PauseGate::new();
    let (event_tx, _) = broadcast::channel(256);
    let (envelope_tx, envelope_rx) = mpsc::channel(config.store.queue_capacity);
    let queue = Arc::new(ActionQueue::new(config.store.queue_capacity));
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let results = Arc::new(ResultLog::new(256));

    // Ingestion.
    let store = Arc::new(InMemoryStore::new());
    let factory = MessageFactory::new(Arc::new(EmptyDirectory), SELF_SENDER_ID);
    let poller = Poller::new(
        store,
        factory,
        &config.store,
        &data_dir,
        envelope_tx,
        event_tx.clone(),
        gate.clone(),
    );

    // Dispatch.
    let records = build_records(&config)?;
    let chain = Arc::new(HandlerChain::new(records));
    let ctx = DispatchContext {
        self_name: SELF_SENDER_ID.to_string(),
    };
    let dispatch = DispatchLoop::new(
        envelope_rx,
        Arc::clone(&chain),
        ctx,
        Arc::clone(&queue),
        event_tx.clone(),
    );

    // Automation.
    let locator = Arc::new(SidebarLocator::new(&config.locator));
    let driver = ActionDriver::new(
        locator,
        Arc::new(LoggingSurface),
        &config.locator,
        &config.executor,
    );
    let monitor = Arc::new(HealthMonitor::new(
        config.recovery.clone(),
        gate.clone(),
        Arc::new(WebhookNotifier::new(&config.notify)),
        event_tx.clone(),
    ));
    let executor = Arc::new(Executor::new(
        Arc::clone(&queue),
        limiter,
        driver,
        Arc::clone(&monitor),
        Arc::clone(&results),
        event_tx.clone(),
        gate.clone(),
        config.executor.clone(),
    ));

    // API.
    let state = AppState::new(
        Arc::new(config),
        config_file,
        Arc::clone(&queue),
        results,
        monitor,
        chain,
        event_tx,
    );

    // === Background tasks ===
    tokio::spawn(poller.run());
    tokio::spawn(dispatch.run());
    tokio::spawn(executor.run());

    let server = tokio::spawn(marionette_api::routes::start_server(state));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        result = server => {
            match result {
                Ok(Ok(())) => tracing::info!("API server stopped"),
                Ok(Err(err)) => tracing::error!(error = %err, "API server failed"),
                Err(err) => tracing::error!(error = %err, "API server task panicked"),
            }
        }
    }

    Ok(())
}
