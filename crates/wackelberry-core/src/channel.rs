//! Messaging channel capability.
//!
//! The core consumes a channel; it never implements one. Production uses a
//! transport-specific implementation, tests use a recording double.

use std::{fmt, future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::ChannelError, position::Position, user::UserId};

/// Conversation on the messaging channel that receives replies and shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl From<UserId> for ChatId {
    /// A user's private chat shares the user's identifier.
    fn from(id: UserId) -> Self {
        Self(id.get())
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a live-share message, returned when the share starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    /// Chat the message lives in
    pub chat: ChatId,
    /// Channel-assigned message identifier
    pub message_id: i64,
}

/// Operations the core needs from a messaging channel.
///
/// All methods are independent; callers serialize calls that belong to the
/// same live share.
pub trait MessagingChannel: Send + Sync + 'static {
    /// Send a plain text message.
    fn send_text(
        &self,
        recipient: ChatId,
        text: &str,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Publish a new live share valid for `duration`.
    fn start_live_share(
        &self,
        recipient: ChatId,
        position: Position,
        duration: Duration,
    ) -> impl Future<Output = Result<MessageHandle, ChannelError>> + Send;

    /// Move an existing live share to `position`.
    fn edit_live_share(
        &self,
        handle: MessageHandle,
        position: Position,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Stop an existing live share. Callers treat failures as best-effort.
    fn stop_live_share(
        &self,
        handle: MessageHandle,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;
}
