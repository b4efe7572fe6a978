//! Drops messages sent by the logged-in account itself.
//!
//! Runs first so nothing downstream ever reacts to the account's own
//! output, which would otherwise loop a reply handler back on itself.

use async_trait::async_trait;
use tracing::trace;

use crate::error::HandlerError;
use crate::handler::{DispatchContext, Handled, MessageHandler};
use crate::message::MessageEnvelope;

pub const NAME: &str = "self_message";

pub struct SelfMessageHandler;

#[async_trait]
impl MessageHandler for SelfMessageHandler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn default_priority(&self) -> i32 {
        100
    }

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
        _ctx: &DispatchContext,
    ) -> Result<Handled, HandlerError> {
        if envelope.is_self {
            trace!(row_id = envelope.row_id, "Dropping self-sent message");
            Ok(Handled::stop())
        } else {
            Ok(Handled::pass())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::types::{Contact, Timestamp};

    use crate::message::MessageKind;

    fn envelope(is_self: bool) -> MessageEnvelope {
        MessageEnvelope {
            row_id: 1,
            seq: 1,
            kind: MessageKind::Text {
                content: "hi".to_string(),
            },
            sender: Contact {
                id: "u_1".to_string(),
                display_name: "Alice".to_string(),
                remark: None,
            },
            room: None,
            is_chatroom: false,
            is_self,
            timestamp: Timestamp(0),
        }
    }

    fn ctx() -> DispatchContext {
        DispatchContext {
            self_name: "bot".to_string(),
        }
    }

    #[tokio::test]
    async fn test_self_message_stops_chain() {
        let handled = SelfMessageHandler
            .handle(&envelope(true), &ctx())
            .await
            .unwrap();
        assert!(handled.stop);
        assert!(handled.actions.is_empty());
    }

    #[tokio::test]
    async fn test_other_message_passes() {
        let handled = SelfMessageHandler
            .handle(&envelope(false), &ctx())
            .await
            .unwrap();
        assert_eq!(handled, Handled::pass());
    }
}
