//! Priority-ordered handler chain.
//!
//! Handlers run highest priority first. Ties keep registration order. A
//! handler that fails is logged and skipped without affecting the rest of
//! the chain, and a handler that asks to stop short-circuits everything
//! after it.

use std::sync::{Arc, RwLock};

use marionette_core::action::Action;
use tracing::{error, instrument};

use crate::handler::{DispatchContext, HandlerRecord};
use crate::message::MessageEnvelope;

/// Result of running one envelope through the whole chain.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Actions produced, in handler order then per-handler order.
    pub actions: Vec<Action>,
    /// Handlers that returned an error on this envelope.
    pub handler_errors: usize,
    /// Name of the handler that stopped the chain, if any.
    pub stopped_by: Option<String>,
}

/// The dispatch chain. Cheap to share; the record list is swapped
/// atomically so a reconfiguration never tears a dispatch in progress.
pub struct HandlerChain {
    records: RwLock<Arc<Vec<HandlerRecord>>>,
}

impl HandlerChain {
    pub fn new(records: Vec<HandlerRecord>) -> Self {
        Self {
            records: RwLock::new(Arc::new(Self::sorted(records))),
        }
    }

    /// Replace the handler set. In-flight dispatches finish on the
    /// snapshot they started with.
    pub fn replace(&self, records: Vec<HandlerRecord>) {
        let sorted = Arc::new(Self::sorted(records));
        if let Ok(mut guard) = self.records.write() {
            *guard = sorted;
        }
    }

    fn sorted(mut records: Vec<HandlerRecord>) -> Vec<HandlerRecord> {
        // Stable sort keeps registration order within a priority tier.
        records.sort_by_key(|r| std::cmp::Reverse(r.priority));
        records
    }

    fn snapshot(&self) -> Arc<Vec<HandlerRecord>> {
        match self.records.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.snapshot().iter().map(|r| r.name.clone()).collect()
    }

    /// Run one envelope through the chain.
    #[instrument(skip_all, fields(row_id = envelope.row_id, kind = envelope.kind.label()))]
    pub async fn dispatch(
        &self,
        envelope: &MessageEnvelope,
        ctx: &DispatchContext,
    ) -> DispatchOutcome {
        let records = self.snapshot();
        let mut outcome = DispatchOutcome::default();

        for record in records.iter() {
            match record.handler.handle(envelope, ctx).await {
                Ok(handled) => {
                    outcome
                        .actions
                        .extend(handled.actions.into_iter().map(Action::new));
                    if handled.stop {
                        outcome.stopped_by = Some(record.name.clone());
                        break;
                    }
                }
                Err(err) => {
                    // One faulty handler must not take the chain down.
                    error!(
                        handler = %record.name,
                        row_id = envelope.row_id,
                        error = %err,
                        "Handler failed, continuing chain"
                    );
                    outcome.handler_errors += 1;
                }
            }
        }
        outcome
    }
}
