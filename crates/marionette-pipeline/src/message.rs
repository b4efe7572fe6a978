//! Raw store rows and typed message envelopes.
//!
//! A [`StoreRow`] is what the message store hands back verbatim; a
//! [`MessageEnvelope`] is the classified, reference-resolved form the
//! handler chain consumes. Envelopes are never mutated after creation.

use marionette_core::types::{Contact, Room, Timestamp};
use serde::{Deserialize, Serialize};

/// Store-native type discriminants, as persisted by the chat client.
///
/// The composite values are the client's own encoding; anything not listed
/// here classifies as [`MessageKind::Unknown`].
pub mod type_code {
    pub const TEXT: i64 = 1;
    pub const TEXT_ALT: i64 = 2;
    pub const IMAGE: i64 = 3;
    pub const AUDIO: i64 = 34;
    pub const VIDEO: i64 = 43;
    pub const EMOJI: i64 = 47;
    pub const SYSTEM: i64 = 10000;
    pub const FILE: i64 = 25_769_803_825;
    pub const LINK: i64 = 21_474_836_529;
}

/// One raw row as returned by `MessageStore::poll_since`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    /// Unique row id; the dedup key.
    pub id: i64,
    /// Monotonic store position; the poll cursor advances to the max seen.
    pub seq: i64,
    /// Type discriminant, see [`type_code`].
    pub type_code: i64,
    /// Store-side sender identifier.
    pub sender_id: String,
    /// Store-side room identifier; `None` for direct chats.
    pub room_id: Option<String>,
    /// Primary payload: text content, or a media path.
    pub content: String,
    /// Secondary payload: link URL, emoji description, and the like.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// Row creation time, seconds since epoch.
    pub created_at: i64,
}

/// Typed message variant with its payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    Text { content: String },
    Image { path: String },
    File { path: String },
    Audio { path: String },
    Video { path: String },
    Emoji { description: String },
    Link { title: String, url: Option<String> },
    System { content: String },
    /// Discriminant the factory does not recognize; carried rather than
    /// dropped so handlers can still observe it.
    Unknown { code: i64, content: String },
}

impl MessageKind {
    /// Short stable label for logs and events.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text { .. } => "text",
            MessageKind::Image { .. } => "image",
            MessageKind::File { .. } => "file",
            MessageKind::Audio { .. } => "audio",
            MessageKind::Video { .. } => "video",
            MessageKind::Emoji { .. } => "emoji",
            MessageKind::Link { .. } => "link",
            MessageKind::System { .. } => "system",
            MessageKind::Unknown { .. } => "unknown",
        }
    }
}

/// A classified message, ready for the handler chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Unique store row id.
    pub row_id: i64,
    /// Store cursor position of the row.
    pub seq: i64,
    pub kind: MessageKind,
    pub sender: Contact,
    /// Resolved room; `None` for direct chats and for rooms the directory
    /// could not resolve.
    pub room: Option<Room>,
    /// Whether the row carried a room reference at all.
    pub is_chatroom: bool,
    /// True when the logged-in account itself sent the message.
    pub is_self: bool,
    pub timestamp: Timestamp,
}

impl MessageEnvelope {
    /// The display name a reply to this message should address.
    pub fn reply_target(&self) -> &str {
        match &self.room {
            Some(room) => &room.display_name,
            None => self.sender.locate_name(),
        }
    }
}
