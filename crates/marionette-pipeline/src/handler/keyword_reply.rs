//! Keyword-triggered canned replies.
//!
//! Rules come from the handler's settings table as substring patterns
//! mapped to reply texts. The first matching rule wins; matching is
//! case-insensitive and only applies to text messages.

use async_trait::async_trait;
use marionette_core::action::ActionKind;
use tracing::debug;

use crate::error::HandlerError;
use crate::handler::{DispatchContext, Handled, MessageHandler};
use crate::message::{MessageEnvelope, MessageKind};

pub const NAME: &str = "keyword_reply";

pub struct KeywordReplyHandler {
    /// (lowercased pattern, reply) in config order.
    rules: Vec<(String, String)>,
    /// Mention the sender in chatroom replies.
    at_sender: bool,
}

impl KeywordReplyHandler {
    /// Parse the `rules` table and the optional `at_sender` flag from the
    /// handler settings.
    pub fn from_settings(settings: &toml::Table) -> Result<Self, HandlerError> {
        let mut rules = Vec::new();
        if let Some(value) = settings.get("rules") {
            let table = value.as_table().ok_or_else(|| {
                HandlerError::BadConfig("keyword_reply rules must be a table".to_string())
            })?;
            for (pattern, reply) in table {
                let reply = reply.as_str().ok_or_else(|| {
                    HandlerError::BadConfig(format!(
                        "keyword_reply rule '{pattern}' must map to a string"
                    ))
                })?;
                rules.push((pattern.to_lowercase(), reply.to_string()));
            }
        }
        let at_sender = settings
            .get("at_sender")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(Self { rules, at_sender })
    }
}

#[async_trait]
impl MessageHandler for KeywordReplyHandler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn default_priority(&self) -> i32 {
        10
    }

    async fn handle(
        &self,
        envelope: &MessageEnvelope,
        _ctx: &DispatchContext,
    ) -> Result<Handled, HandlerError> {
        let MessageKind::Text { content } = &envelope.kind else {
            return Ok(Handled::pass());
        };
        let lowered = content.to_lowercase();

        for (pattern, reply) in &self.rules {
            if lowered.contains(pattern) {
                debug!(
                    row_id = envelope.row_id,
                    pattern = %pattern,
                    "Keyword rule matched"
                );
                let at_user = (self.at_sender && envelope.is_chatroom)
                    .then(|| envelope.sender.display_name.clone());
                return Ok(Handled::actions(vec![ActionKind::SendText {
                    content: reply.clone(),
                    target: envelope.reply_target().to_string(),
                    is_chatroom: envelope.is_chatroom,
                    at_user,
                    quote: None,
                    quote_random: false,
                }]));
            }
        }
        Ok(Handled::pass())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::types::{Contact, Room, Timestamp};

    fn handler() -> KeywordReplyHandler {
        let mut rules = toml::Table::new();
        rules.insert("ping".to_string(), toml::Value::String("pong".to_string()));
        rules.insert(
            "help".to_string(),
            toml::Value::String("Ask a human.".to_string()),
        );
        let mut settings = toml::Table::new();
        settings.insert("rules".to_string(), toml::Value::Table(rules));
        settings.insert("at_sender".to_string(), toml::Value::Boolean(true));
        KeywordReplyHandler::from_settings(&settings).unwrap()
    }

    fn text_envelope(content: &str, room: Option<Room>) -> MessageEnvelope {
        let is_chatroom = room.is_some();
        MessageEnvelope {
            row_id: 3,
            seq: 3,
            kind: MessageKind::Text {
                content: content.to_string(),
            },
            sender: Contact {
                id: "u_1".to_string(),
                display_name: "Alice".to_string(),
                remark: None,
            },
            room,
            is_chatroom,
            is_self: false,
            timestamp: Timestamp(0),
        }
    }

    fn ctx() -> DispatchContext {
        DispatchContext {
            self_name: "bot".to_string(),
        }
    }

    #[tokio::test]
    async fn test_match_replies_to_sender_in_direct_chat() {
        let handled = handler()
            .handle(&text_envelope("PING me", None), &ctx())
            .await
            .unwrap();
        assert!(!handled.stop);
        assert_eq!(handled.actions.len(), 1);
        match &handled.actions[0] {
            ActionKind::SendText {
                content,
                target,
                is_chatroom,
                at_user,
                ..
            } => {
                assert_eq!(content, "pong");
                assert_eq!(target, "Alice");
                assert!(!is_chatroom);
                assert!(at_user.is_none(), "no mentions outside chatrooms");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_match_in_room_targets_room_and_mentions_sender() {
        let room = Room {
            id: "r_1".to_string(),
            display_name: "Team".to_string(),
            member_count: 3,
        };
        let handled = handler()
            .handle(&text_envelope("need help here", Some(room)), &ctx())
            .await
            .unwrap();
        match &handled.actions[0] {
            ActionKind::SendText {
                target, at_user, ..
            } => {
                assert_eq!(target, "Team");
                assert_eq!(at_user.as_deref(), Some("Alice"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_match_passes() {
        let handled = handler()
            .handle(&text_envelope("nothing relevant", None), &ctx())
            .await
            .unwrap();
        assert_eq!(handled, Handled::pass());
    }

    #[tokio::test]
    async fn test_non_text_is_ignored() {
        let mut envelope = text_envelope("ping", None);
        envelope.kind = MessageKind::Image {
            path: "/tmp/ping.png".to_string(),
        };
        let handled = handler().handle(&envelope, &ctx()).await.unwrap();
        assert_eq!(handled, Handled::pass());
    }

    #[test]
    fn test_settings_without_rules_is_empty_handler() {
        let handler = KeywordReplyHandler::from_settings(&toml::Table::new()).unwrap();
        assert!(handler.rules.is_empty());
        assert!(!handler.at_sender);
    }

    #[test]
    fn test_non_string_reply_is_rejected() {
        let mut rules = toml::Table::new();
        rules.insert("ping".to_string(), toml::Value::Integer(1));
        let mut settings = toml::Table::new();
        settings.insert("rules".to_string(), toml::Value::Table(rules));
        assert!(matches!(
            KeywordReplyHandler::from_settings(&settings),
            Err(HandlerError::BadConfig(_))
        ));
    }
}
