//! Action scripts.
//!
//! Each action kind is a short script of locate, click, and keystroke
//! steps against the target window. The driver owns no policy: retries,
//! timeouts, and pacing belong to the executor.

use std::sync::Arc;
use std::time::Duration;

use marionette_core::action::{Action, ActionKind};
use marionette_core::config::{ExecutorConfig, LocatorConfig};
use tracing::debug;

use crate::error::ExecuteError;
use crate::locator::{InputSurface, TargetSpec, UiLocator};

pub struct ActionDriver {
    locator: Arc<dyn UiLocator>,
    surface: Arc<dyn InputSurface>,
    anchor: String,
    scroll_delay: Duration,
}

impl ActionDriver {
    pub fn new(
        locator: Arc<dyn UiLocator>,
        surface: Arc<dyn InputSurface>,
        locator_config: &LocatorConfig,
        executor_config: &ExecutorConfig,
    ) -> Self {
        Self {
            locator,
            surface,
            anchor: locator_config.anchor.clone(),
            scroll_delay: Duration::from_millis(executor_config.scroll_delay_ms),
        }
    }

    /// Liveness probe: the window responds and the conversation-list
    /// anchor is visible.
    pub async fn probe(&self) -> Result<(), ExecuteError> {
        self.surface.refocus().await?;
        self.locator.locate_anchor(&self.anchor).await?;
        Ok(())
    }

    /// Capture a re-authentication artifact if the window shows a login
    /// prompt. Used when escalating a dead target.
    pub async fn login_artifact(&self) -> Result<Option<String>, ExecuteError> {
        self.surface.capture_login_artifact().await
    }

    async fn open_conversation(&self, target: &str, is_chatroom: bool) -> Result<(), ExecuteError> {
        self.surface.refocus().await?;
        let region = self
            .locator
            .locate(&TargetSpec::new(target, is_chatroom))
            .await?;
        self.surface.click(&region).await?;
        Ok(())
    }

    async fn mention(&self, user: &str) -> Result<(), ExecuteError> {
        self.surface.type_text(&format!("@{user}")).await?;
        self.surface.hotkey(&["enter"]).await
    }

    async fn submit_text(&self, text: &str) -> Result<(), ExecuteError> {
        self.surface.type_text(text).await?;
        self.surface.hotkey(&["enter"]).await
    }

    async fn open_panel(&self, panel: &str) -> Result<(), ExecuteError> {
        let region = self.locator.locate_anchor(panel).await?;
        self.surface.click(&region).await?;
        Ok(())
    }

    /// Run the script for one action.
    pub async fn perform(&self, action: &Action) -> Result<(), ExecuteError> {
        debug!(action = action.kind.label(), id = %action.id, "Performing action");
        match &action.kind {
            ActionKind::SendText {
                content,
                target,
                is_chatroom,
                at_user,
                quote,
                quote_random: _,
            } => {
                self.open_conversation(target, *is_chatroom).await?;
                if let Some(quoted) = quote {
                    // Quote by searching the transcript for the cited text.
                    self.surface.hotkey(&["ctrl", "f"]).await?;
                    self.surface.type_text(quoted).await?;
                    self.surface.hotkey(&["enter"]).await?;
                    tokio::time::sleep(self.scroll_delay).await;
                }
                if let Some(user) = at_user {
                    if *is_chatroom {
                        self.mention(user).await?;
                    }
                }
                self.submit_text(content).await
            }

            ActionKind::SendImage {
                path,
                target,
                is_chatroom,
            }
            | ActionKind::SendFile {
                path,
                target,
                is_chatroom,
            } => {
                self.open_conversation(target, *is_chatroom).await?;
                self.open_panel("Attach").await?;
                self.surface.type_text(path).await?;
                self.surface.hotkey(&["enter"]).await?;
                self.surface.hotkey(&["enter"]).await
            }

            ActionKind::Forward {} => {
                // Forward operates on the currently selected message.
                self.surface.refocus().await?;
                self.open_panel("Forward").await?;
                self.surface.hotkey(&["enter"]).await
            }

            ActionKind::DownloadImage {
                target,
                url: _,
                save_dir,
                max_count,
            }
            | ActionKind::DownloadVideo {
                target,
                url: _,
                save_dir,
                max_count,
            }
            | ActionKind::DownloadFile {
                target,
                url: _,
                save_dir,
                max_count,
            } => {
                if let Some(target) = target {
                    self.open_conversation(target, false).await?;
                }
                for _ in 0..*max_count {
                    let latest = self.locator.locate_anchor("LatestAttachment").await?;
                    self.surface.click(&latest).await?;
                    self.surface.hotkey(&["ctrl", "s"]).await?;
                    if let Some(dir) = save_dir {
                        self.surface.type_text(dir).await?;
                    }
                    self.surface.hotkey(&["enter"]).await?;
                    tokio::time::sleep(self.scroll_delay).await;
                }
                Ok(())
            }

            ActionKind::Pat {
                target,
                member,
                is_chatroom,
            } => {
                self.open_conversation(target, *is_chatroom).await?;
                let name = member.as_deref().unwrap_or(target);
                let region = self.locator.locate(&TargetSpec::new(name, false)).await?;
                // A pat is a double click on the avatar.
                self.surface.click(&region).await?;
                self.surface.click(&region).await
            }

            ActionKind::InviteToRoom { member, target } => {
                self.open_conversation(target, true).await?;
                self.open_panel("AddMember").await?;
                self.submit_text(member).await?;
                self.surface.hotkey(&["enter"]).await
            }

            ActionKind::FriendRequestResponse {
                requester,
                accept,
                reply,
            } => {
                self.surface.refocus().await?;
                self.open_panel("NewFriends").await?;
                let region = self
                    .locator
                    .locate(&TargetSpec::new(requester, false))
                    .await?;
                self.surface.click(&region).await?;
                if *accept {
                    self.open_panel("Accept").await?;
                    if let Some(reply) = reply {
                        self.open_conversation(requester, false).await?;
                        self.submit_text(reply).await?;
                    }
                } else {
                    self.surface.hotkey(&["escape"]).await?;
                }
                Ok(())
            }

            ActionKind::PublishMoment { images, caption } => {
                self.surface.refocus().await?;
                self.open_panel("Moments").await?;
                self.open_panel("Compose").await?;
                for image in images {
                    self.open_panel("Attach").await?;
                    self.surface.type_text(image).await?;
                    self.surface.hotkey(&["enter"]).await?;
                }
                if !caption.is_empty() {
                    self.surface.type_text(caption).await?;
                }
                self.open_panel("Publish").await
            }

            ActionKind::SetRoomAnnouncement {
                content,
                target,
                force_edit,
            } => {
                self.open_conversation(target, true).await?;
                self.open_panel("Announcement").await?;
                if *force_edit {
                    self.open_panel("Edit").await?;
                    self.surface.hotkey(&["ctrl", "a"]).await?;
                }
                self.surface.type_text(content).await?;
                self.open_panel("Publish").await
            }

            ActionKind::RemoveRoomMember { member, target } => {
                self.open_conversation(target, true).await?;
                self.open_panel("RemoveMember").await?;
                self.submit_text(member).await?;
                self.surface.hotkey(&["enter"]).await
            }

            ActionKind::RenameRoom { target, new_name } => {
                self.open_conversation(target, true).await?;
                self.open_panel("RoomName").await?;
                self.surface.hotkey(&["ctrl", "a"]).await?;
                self.submit_text(new_name).await
            }

            ActionKind::RenameRoomRemark { target, new_remark } => {
                self.open_conversation(target, true).await?;
                self.open_panel("RoomRemark").await?;
                self.surface.hotkey(&["ctrl", "a"]).await?;
                self.submit_text(new_remark).await
            }

            ActionKind::RenameSelfInRoom {
                target,
                new_nickname,
            } => {
                self.open_conversation(target, true).await?;
                self.open_panel("MyAlias").await?;
                self.surface.hotkey(&["ctrl", "a"]).await?;
                self.submit_text(new_nickname).await
            }

            ActionKind::LeaveRoom { target } => {
                self.open_conversation(target, true).await?;
                self.open_panel("LeaveRoom").await?;
                self.surface.hotkey(&["enter"]).await
            }

            ActionKind::SwitchConversation { target } => {
                self.open_conversation(target, false).await
            }
        }
    }
}
