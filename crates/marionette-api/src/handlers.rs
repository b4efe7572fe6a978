//! Route handler functions for all API endpoints.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use marionette_core::action::{Action, ActionKind, ExecutionResult};
use marionette_core::events::DomainEvent;
use marionette_core::types::{HealthState, Timestamp};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub state: HealthState,
    pub version: String,
    pub uptime_secs: u64,
    pub queue_depth: usize,
    pub consecutive_failures: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub resumed: bool,
    pub state: HealthState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    /// Active handler names after the swap, highest priority first.
    pub handlers: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health - health state, queue depth, uptime.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        state: state.monitor.state(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        queue_depth: state.queue.len().await,
        consecutive_failures: state.monitor.consecutive_failures(),
    })
}

/// POST /actions - submit an action from a remote caller.
///
/// The action joins the same global queue as handler-produced actions and
/// is subject to the same ordering and rate limiting.
pub async fn submit_action(
    State(state): State<AppState>,
    Json(kind): Json<ActionKind>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if let Some(target) = kind.target() {
        if target.is_empty() {
            return Err(ApiError::BadRequest("target must not be empty".to_string()));
        }
    }

    let action = Action::new(kind);
    let response = SubmitResponse {
        id: action.id,
        kind: action.kind.label().to_string(),
    };
    let event = DomainEvent::ActionEnqueued {
        action_id: action.id,
        kind: response.kind.clone(),
        timestamp: Timestamp::now(),
    };
    // Remote callers get an immediate 503 on a full queue; only the
    // dispatch loop enqueues with backpressure.
    if !state.queue.try_enqueue(action).await {
        return Err(ApiError::ServiceUnavailable("action queue full".to_string()));
    }
    let _ = state.event_tx.send(event);
    Ok(Json(response))
}

/// GET /results/recent - most recent execution results, newest first.
pub async fn recent_results(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<ExecutionResult>>, ApiError> {
    let limit = params.limit.unwrap_or(50);
    if limit == 0 || limit > 500 {
        return Err(ApiError::BadRequest(
            "limit must be between 1 and 500".to_string(),
        ));
    }
    Ok(Json(state.results.recent(limit)))
}

/// POST /recovery/resume - operator acknowledgment of a Failed episode.
pub async fn resume(State(state): State<AppState>) -> Result<Json<ResumeResponse>, ApiError> {
    // The monitor publishes the OperatorResumed event itself.
    if !state.monitor.resume() {
        return Err(ApiError::Conflict(format!(
            "cannot resume from state '{}'",
            state.monitor.state()
        )));
    }
    Ok(Json(ResumeResponse {
        resumed: true,
        state: state.monitor.state(),
    }))
}

/// POST /handlers/reload - re-read the config file and swap the handler
/// set.
///
/// In-flight dispatches finish on the snapshot they started with; the
/// next message sees the new set. The running process config is otherwise
/// untouched.
pub async fn reload_handlers(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let config = marionette_core::config::MarionetteConfig::load(&state.config_path)
        .map_err(|err| ApiError::BadRequest(format!("config reload failed: {err}")))?;
    let records = marionette_pipeline::handler::build_records(&config)
        .map_err(|err| ApiError::BadRequest(format!("handler rebuild failed: {err}")))?;
    state.chain.replace(records);
    let handlers = state.chain.handler_names();
    tracing::info!(?handlers, "Handler set reloaded");
    Ok(Json(ReloadResponse { handlers }))
}

/// GET /stream - SSE stream of domain events.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send> {
    let rx = state.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event("pipeline").data(data)))
        }
        // Lagged receivers skip missed events rather than erroring.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
