//! Application state shared across all route handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use marionette_automation::executor::ResultLog;
use marionette_automation::health::HealthMonitor;
use marionette_core::config::MarionetteConfig;
use marionette_core::events::DomainEvent;
use marionette_pipeline::chain::HandlerChain;
use marionette_pipeline::queue::ActionQueue;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MarionetteConfig>,
    /// Path the configuration was loaded from, re-read on handler reload.
    pub config_path: Arc<PathBuf>,
    /// The global action queue, shared with dispatch and the executor.
    pub queue: Arc<ActionQueue>,
    /// Recent execution results, written by the executor.
    pub results: Arc<ResultLog>,
    /// Health state machine, shared with the executor.
    pub monitor: Arc<HealthMonitor>,
    /// The dispatch chain, shared with the dispatch loop for reloads.
    pub chain: Arc<HandlerChain>,
    /// Broadcast sender for the SSE stream.
    pub event_tx: tokio::sync::broadcast::Sender<DomainEvent>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<MarionetteConfig>,
        config_path: PathBuf,
        queue: Arc<ActionQueue>,
        results: Arc<ResultLog>,
        monitor: Arc<HealthMonitor>,
        chain: Arc<HandlerChain>,
        event_tx: tokio::sync::broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            config,
            config_path: Arc::new(config_path),
            queue,
            results,
            monitor,
            chain,
            event_tx,
            start_time: Instant::now(),
        }
    }
}
