//! The dispatch stage.
//!
//! Drains envelopes from the ingestion channel, runs each through the
//! handler chain, and appends the produced actions to the global queue.
//! Envelopes are processed one at a time so the queue sees actions in
//! message order.

use std::sync::Arc;

use marionette_core::events::DomainEvent;
use marionette_core::types::Timestamp;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::chain::HandlerChain;
use crate::handler::DispatchContext;
use crate::message::MessageEnvelope;
use crate::queue::ActionQueue;

pub struct DispatchLoop {
    rx: mpsc::Receiver<MessageEnvelope>,
    chain: Arc<HandlerChain>,
    ctx: DispatchContext,
    queue: Arc<ActionQueue>,
    events: broadcast::Sender<DomainEvent>,
}

impl DispatchLoop {
    pub fn new(
        rx: mpsc::Receiver<MessageEnvelope>,
        chain: Arc<HandlerChain>,
        ctx: DispatchContext,
        queue: Arc<ActionQueue>,
        events: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            rx,
            chain,
            ctx,
            queue,
            events,
        }
    }

    /// Process envelopes until the ingestion side closes the channel.
    pub async fn run(mut self) {
        info!(handlers = ?self.chain.handler_names(), "Dispatch loop started");
        while let Some(envelope) = self.rx.recv().await {
            self.dispatch_one(envelope).await;
        }
        info!("Ingestion channel closed, dispatch loop exiting");
    }

    async fn dispatch_one(&self, envelope: MessageEnvelope) {
        let outcome = self.chain.dispatch(&envelope, &self.ctx).await;
        debug!(
            row_id = envelope.row_id,
            actions = outcome.actions.len(),
            handler_errors = outcome.handler_errors,
            stopped_by = outcome.stopped_by.as_deref().unwrap_or(""),
            "Dispatched message"
        );
        let _ = self.events.send(DomainEvent::MessageDispatched {
            row_id: envelope.row_id,
            actions: outcome.actions.len(),
            handler_errors: outcome.handler_errors,
            timestamp: Timestamp::now(),
        });

        for action in outcome.actions {
            let event = DomainEvent::ActionEnqueued {
                action_id: action.id,
                kind: action.kind.label().to_string(),
                timestamp: Timestamp::now(),
            };
            // Backpressure: a full queue stalls dispatch (and, through the
            // bounded ingestion channel, the poller) rather than dropping
            // a handler-produced action.
            self.queue.enqueue(action).await;
            let _ = self.events.send(event);
        }
    }
}
