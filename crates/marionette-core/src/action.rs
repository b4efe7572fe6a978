//! Automation actions and their execution results.
//!
//! An [`Action`] is produced by a message handler (or the remote API),
//! buffered in the action queue, and consumed exactly once by the executor.
//! Targets are display names as shown by the target application, not stable
//! identifiers; resolution is best-effort when names collide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// One concrete automation request against the target application.
///
/// Variant fields mirror what the corresponding UI interaction needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    SendText {
        content: String,
        target: String,
        is_chatroom: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at_user: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quote: Option<String>,
        /// Quote a random recent message instead of a specific one.
        #[serde(default)]
        quote_random: bool,
    },
    SendImage {
        path: String,
        target: String,
        is_chatroom: bool,
    },
    SendFile {
        path: String,
        target: String,
        is_chatroom: bool,
    },
    Forward {},
    DownloadImage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        save_dir: Option<String>,
        #[serde(default = "default_max_count")]
        max_count: u32,
    },
    DownloadVideo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        save_dir: Option<String>,
        #[serde(default = "default_max_count")]
        max_count: u32,
    },
    DownloadFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        save_dir: Option<String>,
        #[serde(default = "default_max_count")]
        max_count: u32,
    },
    Pat {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        member: Option<String>,
        is_chatroom: bool,
    },
    InviteToRoom {
        member: String,
        target: String,
    },
    FriendRequestResponse {
        requester: String,
        accept: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply: Option<String>,
    },
    PublishMoment {
        images: Vec<String>,
        caption: String,
    },
    SetRoomAnnouncement {
        content: String,
        target: String,
        #[serde(default)]
        force_edit: bool,
    },
    RemoveRoomMember {
        member: String,
        target: String,
    },
    RenameRoom {
        target: String,
        new_name: String,
    },
    RenameRoomRemark {
        target: String,
        new_remark: String,
    },
    RenameSelfInRoom {
        target: String,
        new_nickname: String,
    },
    LeaveRoom {
        target: String,
    },
    SwitchConversation {
        target: String,
    },
}

fn default_max_count() -> u32 {
    1
}

impl ActionKind {
    /// Short stable label used in logs, events, and execution results.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::SendText { .. } => "send_text",
            ActionKind::SendImage { .. } => "send_image",
            ActionKind::SendFile { .. } => "send_file",
            ActionKind::Forward {} => "forward",
            ActionKind::DownloadImage { .. } => "download_image",
            ActionKind::DownloadVideo { .. } => "download_video",
            ActionKind::DownloadFile { .. } => "download_file",
            ActionKind::Pat { .. } => "pat",
            ActionKind::InviteToRoom { .. } => "invite_to_room",
            ActionKind::FriendRequestResponse { .. } => "friend_request_response",
            ActionKind::PublishMoment { .. } => "publish_moment",
            ActionKind::SetRoomAnnouncement { .. } => "set_room_announcement",
            ActionKind::RemoveRoomMember { .. } => "remove_room_member",
            ActionKind::RenameRoom { .. } => "rename_room",
            ActionKind::RenameRoomRemark { .. } => "rename_room_remark",
            ActionKind::RenameSelfInRoom { .. } => "rename_self_in_room",
            ActionKind::LeaveRoom { .. } => "leave_room",
            ActionKind::SwitchConversation { .. } => "switch_conversation",
        }
    }

    /// The display name the executor must resolve on screen, if the action
    /// addresses one.
    pub fn target(&self) -> Option<&str> {
        match self {
            ActionKind::SendText { target, .. }
            | ActionKind::SendImage { target, .. }
            | ActionKind::SendFile { target, .. }
            | ActionKind::Pat { target, .. }
            | ActionKind::InviteToRoom { target, .. }
            | ActionKind::SetRoomAnnouncement { target, .. }
            | ActionKind::RemoveRoomMember { target, .. }
            | ActionKind::RenameRoom { target, .. }
            | ActionKind::RenameRoomRemark { target, .. }
            | ActionKind::RenameSelfInRoom { target, .. }
            | ActionKind::LeaveRoom { target }
            | ActionKind::SwitchConversation { target } => Some(target),
            ActionKind::FriendRequestResponse { requester, .. } => Some(requester),
            ActionKind::DownloadImage { target, .. }
            | ActionKind::DownloadVideo { target, .. }
            | ActionKind::DownloadFile { target, .. } => target.as_deref(),
            ActionKind::Forward {} | ActionKind::PublishMoment { .. } => None,
        }
    }

    /// Whether the action delivers content into a conversation.
    ///
    /// Send-style actions get an extra humanizing delay before execution.
    pub fn is_send(&self) -> bool {
        matches!(
            self,
            ActionKind::SendText { .. }
                | ActionKind::SendImage { .. }
                | ActionKind::SendFile { .. }
                | ActionKind::Forward {}
                | ActionKind::PublishMoment { .. }
        )
    }
}

/// An action with identity and provenance, as carried by the action queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Timestamp::now(),
            kind,
        }
    }
}

/// Terminal outcome of one action's execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// An attempt succeeded.
    Success,
    /// The action failed for a reason other than spent attempts or a
    /// deadline.
    Failed,
    /// Every configured attempt failed, including a single-attempt bound.
    RetryExhausted,
    /// The whole-action deadline elapsed.
    TimedOut,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Record of one completed action, reported to the health monitor and
/// exposed on the API's recent-results ring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action_id: Uuid,
    /// `ActionKind::label` of the executed action.
    pub action: String,
    pub outcome: Outcome,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: Timestamp,
}

impl ExecutionResult {
    pub fn success(action: &Action, attempts: u32) -> Self {
        Self {
            action_id: action.id,
            action: action.kind.label().to_string(),
            outcome: Outcome::Success,
            attempts,
            error: None,
            finished_at: Timestamp::now(),
        }
    }

    pub fn failure(action: &Action, outcome: Outcome, attempts: u32, error: String) -> Self {
        Self {
            action_id: action.id,
            action: action.kind.label().to_string(),
            outcome,
            attempts,
            error: Some(error),
            finished_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_text(target: &str) -> ActionKind {
        ActionKind::SendText {
            content: "hello".to_string(),
            target: target.to_string(),
            is_chatroom: false,
            at_user: None,
            quote: None,
            quote_random: false,
        }
    }

    #[test]
    fn test_label_is_snake_case() {
        assert_eq!(send_text("Alice").label(), "send_text");
        assert_eq!(
            ActionKind::SetRoomAnnouncement {
                content: "rules".to_string(),
                target: "Team".to_string(),
                force_edit: false,
            }
            .label(),
            "set_room_announcement"
        );
    }

    #[test]
    fn test_target_extraction() {
        assert_eq!(send_text("Alice").target(), Some("Alice"));
        assert_eq!(ActionKind::Forward {}.target(), None);
        assert_eq!(
            ActionKind::PublishMoment {
                images: vec![],
                caption: "hi".to_string(),
            }
            .target(),
            None
        );
        assert_eq!(
            ActionKind::DownloadImage {
                target: None,
                url: Some("https://example.com/a.png".to_string()),
                save_dir: None,
                max_count: 1,
            }
            .target(),
            None
        );
        assert_eq!(
            ActionKind::FriendRequestResponse {
                requester: "Bob".to_string(),
                accept: true,
                reply: None,
            }
            .target(),
            Some("Bob")
        );
    }

    #[test]
    fn test_is_send_classification() {
        assert!(send_text("Alice").is_send());
        assert!(ActionKind::Forward {}.is_send());
        assert!(!ActionKind::LeaveRoom {
            target: "Team".to_string()
        }
        .is_send());
        assert!(!ActionKind::SwitchConversation {
            target: "Alice".to_string()
        }
        .is_send());
    }

    #[test]
    fn test_action_kind_tagged_serde() {
        let kind = ActionKind::Pat {
            target: "Team".to_string(),
            member: Some("Bob".to_string()),
            is_chatroom: true,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "pat");
        assert_eq!(json["member"], "Bob");

        let back: ActionKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn test_action_kind_wire_defaults() {
        // Remote callers may omit optional fields entirely.
        let kind: ActionKind = serde_json::from_str(
            r#"{"kind":"send_text","content":"hi","target":"Alice","is_chatroom":false}"#,
        )
        .unwrap();
        match kind {
            ActionKind::SendText {
                at_user,
                quote,
                quote_random,
                ..
            } => {
                assert!(at_user.is_none());
                assert!(quote.is_none());
                assert!(!quote_random);
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        let kind: ActionKind =
            serde_json::from_str(r#"{"kind":"download_file","url":"https://x/f.bin"}"#).unwrap();
        match kind {
            ActionKind::DownloadFile { max_count, .. } => assert_eq!(max_count, 1),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = serde_json::from_str::<ActionKind>(r#"{"kind":"reboot_target"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_action_ids_unique() {
        let a = Action::new(send_text("Alice"));
        let b = Action::new(send_text("Alice"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_action_serde_flattens_kind() {
        let action = Action::new(ActionKind::LeaveRoom {
            target: "Team".to_string(),
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["kind"], "leave_room");
        assert_eq!(json["target"], "Team");
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_execution_result_constructors() {
        let action = Action::new(send_text("Alice"));
        let ok = ExecutionResult::success(&action, 2);
        assert_eq!(ok.action_id, action.id);
        assert_eq!(ok.action, "send_text");
        assert!(ok.outcome.is_success());
        assert_eq!(ok.attempts, 2);
        assert!(ok.error.is_none());

        let failed = ExecutionResult::failure(
            &action,
            Outcome::RetryExhausted,
            3,
            "target not found".to_string(),
        );
        assert_eq!(failed.outcome, Outcome::RetryExhausted);
        assert_eq!(failed.attempts, 3);
        assert_eq!(failed.error.as_deref(), Some("target not found"));
    }
}
