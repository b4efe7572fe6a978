//! Message handlers and the registration table.
//!
//! A handler inspects one envelope and decides which actions, if any, it
//! produces, and whether handlers after it should still run. Handlers are
//! constructed once from configuration and shared across dispatches.

pub mod empty_room;
pub mod keyword_reply;
pub mod self_message;

use std::sync::Arc;

use async_trait::async_trait;
use marionette_core::action::ActionKind;
use marionette_core::config::MarionetteConfig;
use tracing::{info, warn};

use crate::error::HandlerError;
use crate::message::MessageEnvelope;

/// Run-wide context shared by every handler invocation.
#[derive(Clone, Debug)]
pub struct DispatchContext {
    /// Display name of the logged-in account.
    pub self_name: String,
}

/// What one handler decided for one envelope.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Handled {
    /// Actions to append to the global queue, in order.
    pub actions: Vec<ActionKind>,
    /// When set, no lower-priority handler sees this envelope.
    pub stop: bool,
}

impl Handled {
    /// No actions, continue down the chain.
    pub fn pass() -> Self {
        Self::default()
    }

    /// No actions, stop the chain.
    pub fn stop() -> Self {
        Self {
            actions: Vec::new(),
            stop: true,
        }
    }

    /// Produce actions and continue down the chain.
    pub fn actions(actions: Vec<ActionKind>) -> Self {
        Self {
            actions,
            stop: false,
        }
    }
}

/// A single stage of the dispatch chain.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Stable identifier, also the key in the `[handlers]` config table.
    fn name(&self) -> &'static str;

    /// Priority used when the config does not override it. Higher runs
    /// earlier.
    fn default_priority(&self) -> i32;

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
        ctx: &DispatchContext,
    ) -> Result<Handled, HandlerError>;
}

/// A registered handler with its resolved priority.
#[derive(Clone)]
pub struct HandlerRecord {
    pub name: String,
    pub priority: i32,
    pub handler: Arc<dyn MessageHandler>,
}

impl HandlerRecord {
    pub fn new(handler: Arc<dyn MessageHandler>, priority: Option<i32>) -> Self {
        Self {
            name: handler.name().to_string(),
            priority: priority.unwrap_or_else(|| handler.default_priority()),
            handler,
        }
    }
}

impl std::fmt::Debug for HandlerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRecord")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Build the handler set the config enables.
///
/// Unknown handler names are skipped with a warning rather than failing
/// startup; a handler whose own settings are invalid is a hard error.
pub fn build_records(config: &MarionetteConfig) -> Result<Vec<HandlerRecord>, HandlerError> {
    let mut records = Vec::new();
    for (name, entry) in &config.handlers {
        if !entry.enabled {
            continue;
        }
        let handler: Arc<dyn MessageHandler> = match name.as_str() {
            self_message::NAME => Arc::new(self_message::SelfMessageHandler),
            empty_room::NAME => Arc::new(empty_room::EmptyRoomHandler),
            keyword_reply::NAME => {
                Arc::new(keyword_reply::KeywordReplyHandler::from_settings(&entry.settings)?)
            }
            other => {
                warn!(handler = other, "Unknown handler in configuration, skipping");
                continue;
            }
        };
        let record = HandlerRecord::new(handler, entry.priority);
        info!(handler = %record.name, priority = record.priority, "Registered handler");
        records.push(record);
    }
    Ok(records)
}
