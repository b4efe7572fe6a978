//! Row classification.
//!
//! The factory turns raw [`StoreRow`]s into typed [`MessageEnvelope`]s. It
//! never fails a whole poll batch: a row it cannot classify becomes an
//! `Unknown` envelope and a row whose sender cannot be resolved gets a
//! placeholder contact, so downstream handlers always see every row.

use std::sync::Arc;

use marionette_core::types::{Contact, Room, Timestamp};
use tracing::debug;

use crate::message::{type_code, MessageEnvelope, MessageKind, StoreRow};

/// Lookup of store identifiers into display entities.
///
/// Backed by the chat client's contact tables in production and by a map
/// in tests.
pub trait Directory: Send + Sync {
    fn contact(&self, id: &str) -> Option<Contact>;
    fn room(&self, id: &str) -> Option<Room>;
}

/// Classifies rows into envelopes.
pub struct MessageFactory {
    directory: Arc<dyn Directory>,
    /// Store identifier of the logged-in account.
    self_id: String,
}

impl MessageFactory {
    pub fn new(directory: Arc<dyn Directory>, self_id: impl Into<String>) -> Self {
        Self {
            directory,
            self_id: self_id.into(),
        }
    }

    /// Classify one row. Infallible by design; see the module docs.
    pub fn classify(&self, row: &StoreRow) -> MessageEnvelope {
        let kind = Self::kind_of(row);
        let is_self = row.sender_id == self.self_id;

        let sender = self.directory.contact(&row.sender_id).unwrap_or_else(|| {
            debug!(sender = %row.sender_id, "Sender not in directory, using placeholder");
            Contact {
                id: row.sender_id.clone(),
                display_name: row.sender_id.clone(),
                remark: None,
            }
        });

        let is_chatroom = row.room_id.is_some();
        let room = row
            .room_id
            .as_deref()
            .and_then(|id| self.directory.room(id));

        MessageEnvelope {
            row_id: row.id,
            seq: row.seq,
            kind,
            sender,
            room,
            is_chatroom,
            is_self,
            timestamp: Timestamp(row.created_at),
        }
    }

    fn kind_of(row: &StoreRow) -> MessageKind {
        match row.type_code {
            type_code::TEXT | type_code::TEXT_ALT => MessageKind::Text {
                content: row.content.clone(),
            },
            type_code::IMAGE => MessageKind::Image {
                path: row.content.clone(),
            },
            type_code::FILE => MessageKind::File {
                path: row.content.clone(),
            },
            type_code::AUDIO => MessageKind::Audio {
                path: row.content.clone(),
            },
            type_code::VIDEO => MessageKind::Video {
                path: row.content.clone(),
            },
            type_code::EMOJI => MessageKind::Emoji {
                description: row.extra.clone().unwrap_or_else(|| row.content.clone()),
            },
            type_code::LINK => MessageKind::Link {
                title: row.content.clone(),
                url: row.extra.clone(),
            },
            type_code::SYSTEM => MessageKind::System {
                content: row.content.clone(),
            },
            code => MessageKind::Unknown {
                code,
                content: row.content.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) struct MapDirectory {
        pub contacts: HashMap<String, Contact>,
        pub rooms: HashMap<String, Room>,
    }

    impl Directory for MapDirectory {
        fn contact(&self, id: &str) -> Option<Contact> {
            self.contacts.get(id).cloned()
        }

        fn room(&self, id: &str) -> Option<Room> {
            self.rooms.get(id).cloned()
        }
    }

    fn directory() -> Arc<MapDirectory> {
        let mut contacts = HashMap::new();
        contacts.insert(
            "u_1".to_string(),
            Contact {
                id: "u_1".to_string(),
                display_name: "Alice".to_string(),
                remark: None,
            },
        );
        let mut rooms = HashMap::new();
        rooms.insert(
            "r_1".to_string(),
            Room {
                id: "r_1".to_string(),
                display_name: "Team".to_string(),
                member_count: 3,
            },
        );
        Arc::new(MapDirectory { contacts, rooms })
    }

    fn row(type_code: i64, content: &str, extra: Option<&str>) -> StoreRow {
        StoreRow {
            id: 1,
            seq: 1,
            type_code,
            sender_id: "u_1".to_string(),
            room_id: None,
            content: content.to_string(),
            extra: extra.map(str::to_string),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_text_classification() {
        let factory = MessageFactory::new(directory(), "me");
        let envelope = factory.classify(&row(type_code::TEXT, "hello", None));
        assert_eq!(
            envelope.kind,
            MessageKind::Text {
                content: "hello".to_string()
            }
        );
        assert_eq!(envelope.sender.display_name, "Alice");
        assert!(!envelope.is_self);
        assert!(!envelope.is_chatroom);
    }

    #[test]
    fn test_alt_text_code_maps_to_text() {
        let factory = MessageFactory::new(directory(), "me");
        let envelope = factory.classify(&row(type_code::TEXT_ALT, "hi", None));
        assert!(matches!(envelope.kind, MessageKind::Text { .. }));
    }

    #[test]
    fn test_link_carries_url_from_extra() {
        let factory = MessageFactory::new(directory(), "me");
        let envelope = factory.classify(&row(
            type_code::LINK,
            "Release notes",
            Some("https://example.com"),
        ));
        assert_eq!(
            envelope.kind,
            MessageKind::Link {
                title: "Release notes".to_string(),
                url: Some("https://example.com".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_code_is_carried() {
        let factory = MessageFactory::new(directory(), "me");
        let envelope = factory.classify(&row(777, "???", None));
        assert_eq!(
            envelope.kind,
            MessageKind::Unknown {
                code: 777,
                content: "???".to_string()
            }
        );
    }

    #[test]
    fn test_self_detection() {
        let factory = MessageFactory::new(directory(), "u_1");
        let envelope = factory.classify(&row(type_code::TEXT, "from me", None));
        assert!(envelope.is_self);
    }

    #[test]
    fn test_unresolved_sender_gets_placeholder() {
        let factory = MessageFactory::new(directory(), "me");
        let mut unknown = row(type_code::TEXT, "hi", None);
        unknown.sender_id = "u_ghost".to_string();
        let envelope = factory.classify(&unknown);
        assert_eq!(envelope.sender.display_name, "u_ghost");
    }

    #[test]
    fn test_room_resolution_and_chatroom_flag() {
        let factory = MessageFactory::new(directory(), "me");

        let mut in_room = row(type_code::TEXT, "hi", None);
        in_room.room_id = Some("r_1".to_string());
        let envelope = factory.classify(&in_room);
        assert!(envelope.is_chatroom);
        assert_eq!(envelope.room.as_ref().unwrap().display_name, "Team");

        let mut ghost_room = row(type_code::TEXT, "hi", None);
        ghost_room.room_id = Some("r_ghost".to_string());
        let envelope = factory.classify(&ghost_room);
        assert!(envelope.is_chatroom);
        assert!(envelope.room.is_none());
    }
}
