//! Drops chatroom messages whose room could not be resolved.
//!
//! A room the directory does not know cannot be addressed on screen, so
//! letting such an envelope reach a reply handler would enqueue actions
//! the executor can never locate a target for.

use async_trait::async_trait;
use tracing::debug;

use crate::error::HandlerError;
use crate::handler::{DispatchContext, Handled, MessageHandler};
use crate::message::MessageEnvelope;

pub const NAME: &str = "empty_room";

pub struct EmptyRoomHandler;

#[async_trait]
impl MessageHandler for EmptyRoomHandler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn default_priority(&self) -> i32 {
        90
    }

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
        _ctx: &DispatchContext,
    ) -> Result<Handled, HandlerError> {
        if envelope.is_chatroom && envelope.room.is_none() {
            debug!(row_id = envelope.row_id, "Dropping message from unresolved room");
            Ok(Handled::stop())
        } else {
            Ok(Handled::pass())
        }
    }
}
