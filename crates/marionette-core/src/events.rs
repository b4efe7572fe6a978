use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ExecutionResult;
use crate::types::{HealthState, Timestamp};

/// Domain events emitted by the pipeline stages.
///
/// Events are published on a broadcast channel and consumed by:
/// - The SSE stream on the API surface (asynchronous remote callers)
/// - The log (via tracing at the emission site)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DomainEvent {
    /// A store row passed dedup and became a typed message envelope.
    MessageIngested {
        row_id: i64,
        kind: String,
        timestamp: Timestamp,
    },

    /// A handler chain pass finished for one message.
    MessageDispatched {
        row_id: i64,
        actions: usize,
        handler_errors: usize,
        timestamp: Timestamp,
    },

    /// An action entered the action queue.
    ActionEnqueued {
        action_id: Uuid,
        kind: String,
        timestamp: Timestamp,
    },

    /// The executor finished an action, successfully or not.
    ActionExecuted { result: ExecutionResult },

    /// The health monitor changed state.
    HealthChanged {
        from: HealthState,
        to: HealthState,
        timestamp: Timestamp,
    },

    /// An escalation was delivered to the operator channel.
    EscalationSent {
        message: String,
        timestamp: Timestamp,
    },

    /// An operator cleared a Failed episode.
    OperatorResumed { timestamp: Timestamp },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serde_tag() {
        let event = DomainEvent::MessageIngested {
            row_id: 42,
            kind: "text".to_string(),
            timestamp: Timestamp(1_700_000_000),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "message_ingested");
        assert_eq!(json["row_id"], 42);
    }

    #[test]
    fn test_health_changed_roundtrip() {
        let event = DomainEvent::HealthChanged {
            from: HealthState::Healthy,
            to: HealthState::Degraded,
            timestamp: Timestamp::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: DomainEvent = serde_json::from_str(&json).unwrap();
        match back {
            DomainEvent::HealthChanged { from, to, .. } => {
                assert_eq!(from, HealthState::Healthy);
                assert_eq!(to, HealthState::Degraded);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
