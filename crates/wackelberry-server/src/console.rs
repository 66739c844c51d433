//! Line-oriented console front-end.
//!
//! Each input line carries one message:
//!
//! ```text
//! <user_id> <display name> /<command> [args]
//! ```
//!
//! The display name may contain spaces; it ends at the first word starting
//! with `/`. Every private chat has the id of its user. [`ConsoleChannel`]
//! stands in for the messaging service and logs what it would deliver.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicI64, Ordering},
    },
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use wackelberry_core::{
    Caller, ChannelError, ChatId, Environment, MessageHandle, MessagingChannel,
    ParseUserIdError, Position, PositionSource, UserId,
};

use crate::{
    commands::{Bot, Command},
    error::ServerError,
    storage::UserStorage,
};

/// A console line that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLineError {
    /// The line has no user id.
    #[error("missing user id")]
    MissingUserId,

    /// The first word is not a user id.
    #[error(transparent)]
    InvalidUserId(#[from] ParseUserIdError),

    /// No word starts with `/`.
    #[error("missing command")]
    MissingCommand,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    /// Sender
    pub caller: Caller,
    /// Command text, starting at the `/`
    pub text: String,
}

impl ConsoleLine {
    /// Parse a console line.
    ///
    /// A missing display name defaults to `user <id>`.
    pub fn parse(line: &str) -> Result<Self, ConsoleLineError> {
        let mut words = line.split_whitespace();
        let id: UserId = words.next().ok_or(ConsoleLineError::MissingUserId)?.parse()?;

        let mut name = Vec::new();
        let mut text = Vec::new();
        for word in words {
            if text.is_empty() && !word.starts_with('/') {
                name.push(word);
            } else {
                text.push(word);
            }
        }

        if text.is_empty() {
            return Err(ConsoleLineError::MissingCommand);
        }

        let name = if name.is_empty() { format!("user {id}") } else { name.join(" ") };
        Ok(Self { caller: Caller::new(id, name), text: text.join(" ") })
    }

    /// Private chat of the sender.
    pub fn chat(&self) -> ChatId {
        ChatId::from(self.caller.id)
    }
}

#[derive(Debug, Clone, Copy)]
struct ShareState {
    position: Position,
    /// `None` when the deadline is beyond what `Instant` can represent
    expires: Option<Instant>,
}

impl ShareState {
    fn is_live(&self, now: Instant) -> bool {
        self.expires.is_none_or(|at| at > now)
    }
}

/// Messaging channel that logs deliveries instead of sending them.
///
/// Behaves like a real service where it matters to the bot: an edit that
/// repeats the shown position is rejected as not modified, and editing a
/// stopped or expired share fails fatally. Only live shares are tracked;
/// a stop forgets the share and expired shares are pruned on the next start.
#[derive(Debug, Default)]
pub struct ConsoleChannel {
    next_message_id: AtomicI64,
    shares: Mutex<HashMap<i64, ShareState>>,
}

impl ConsoleChannel {
    /// Create a console channel.
    pub fn new() -> Self {
        Self::default()
    }

    fn shares(&self) -> MutexGuard<'_, HashMap<i64, ShareState>> {
        self.shares.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn tracked_shares(&self) -> usize {
        self.shares().len()
    }
}

impl MessagingChannel for ConsoleChannel {
    async fn send_text(&self, recipient: ChatId, text: &str) -> Result<(), ChannelError> {
        tracing::info!(chat_id = %recipient, "-> {text}");
        Ok(())
    }

    async fn start_live_share(
        &self,
        recipient: ChatId,
        position: Position,
        duration: Duration,
    ) -> Result<MessageHandle, ChannelError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Instant::now();
        {
            let mut shares = self.shares();
            shares.retain(|_, share| share.is_live(now));
            shares.insert(message_id, ShareState { position, expires: now.checked_add(duration) });
        }

        tracing::info!(
            chat_id = %recipient,
            message_id,
            latitude = position.latitude,
            longitude = position.longitude,
            live_period_secs = duration.as_secs(),
            "-> live location"
        );
        Ok(MessageHandle { chat: recipient, message_id })
    }

    async fn edit_live_share(
        &self,
        handle: MessageHandle,
        position: Position,
    ) -> Result<(), ChannelError> {
        let mut shares = self.shares();
        let share = shares
            .get_mut(&handle.message_id)
            .ok_or_else(|| ChannelError::Fatal("message to edit not found".to_string()))?;

        if !share.is_live(Instant::now()) {
            return Err(ChannelError::Fatal("message can't be edited".to_string()));
        }
        if share.position.same_as(&position) {
            return Err(ChannelError::Unmodified);
        }
        share.position = position;
        drop(shares);

        tracing::info!(
            chat_id = %handle.chat,
            message_id = handle.message_id,
            latitude = position.latitude,
            longitude = position.longitude,
            heading = position.heading,
            "-> live location moved"
        );
        Ok(())
    }

    async fn stop_live_share(&self, handle: MessageHandle) -> Result<(), ChannelError> {
        if self.shares().remove(&handle.message_id).is_none() {
            return Err(ChannelError::Fatal("message to stop not found".to_string()));
        }

        tracing::info!(
            chat_id = %handle.chat,
            message_id = handle.message_id,
            "-> live location stopped"
        );
        Ok(())
    }
}

/// Dispatch console lines from `input` until it is exhausted.
///
/// Blank lines and lines starting with `#` are skipped. Malformed lines are
/// logged and skipped. Each reply goes back through `channel` to the
/// sender's private chat.
pub async fn run_console<S, C, P, E, R>(
    bot: &Bot<S, C, P, E>,
    channel: &C,
    input: R,
) -> Result<(), ServerError>
where
    S: UserStorage,
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = match ConsoleLine::parse(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(error = %err, %line, "ignoring console line");
                continue;
            },
        };

        let Some(command) = Command::parse(&parsed.text) else {
            continue;
        };

        let chat = parsed.chat();
        let reply = bot.handle(&parsed.caller, chat, command).await;
        if let Err(err) = channel.send_text(chat, &reply.to_string()).await {
            tracing::warn!(chat_id = %chat, error = %err, "reply not delivered");
        }
    }

    tracing::info!("console input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_name_and_command() {
        let line = ConsoleLine::parse("42 Ada Lovelace /approve 7").unwrap();

        assert_eq!(line.caller, Caller::new(UserId::new(42), "Ada Lovelace"));
        assert_eq!(line.text, "/approve 7");
        assert_eq!(line.chat(), ChatId(42));
    }

    #[test]
    fn missing_name_defaults() {
        let line = ConsoleLine::parse("5 /live").unwrap();
        assert_eq!(line.caller.name, "user 5");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(ConsoleLine::parse(""), Err(ConsoleLineError::MissingUserId));
        assert_eq!(ConsoleLine::parse("5 Bob"), Err(ConsoleLineError::MissingCommand));
        assert!(matches!(
            ConsoleLine::parse("bob /live"),
            Err(ConsoleLineError::InvalidUserId(_))
        ));
    }

    #[tokio::test]
    async fn repeated_edit_is_not_modified() {
        let channel = ConsoleChannel::new();
        let at = Position::new(1.0, 2.0, 0);
        let handle =
            channel.start_live_share(ChatId(1), at, Duration::from_secs(60)).await.unwrap();

        assert_eq!(channel.edit_live_share(handle, at).await, Err(ChannelError::Unmodified));
        assert_eq!(channel.edit_live_share(handle, Position::new(1.5, 2.0, 0)).await, Ok(()));
    }

    #[tokio::test]
    async fn stopped_share_cannot_be_edited() {
        let channel = ConsoleChannel::new();
        let at = Position::new(1.0, 2.0, 0);
        let handle =
            channel.start_live_share(ChatId(1), at, Duration::from_secs(60)).await.unwrap();

        channel.stop_live_share(handle).await.unwrap();
        let result = channel.edit_live_share(handle, Position::new(3.0, 3.0, 0)).await;

        assert!(matches!(result, Err(ChannelError::Fatal(_))));
        assert!(channel.stop_live_share(handle).await.is_err());
        assert_eq!(channel.tracked_shares(), 0);
    }

    #[tokio::test]
    async fn expired_shares_are_pruned_on_next_start() {
        let channel = ConsoleChannel::new();
        let at = Position::new(1.0, 2.0, 0);

        for _ in 0..5 {
            let expired = channel.start_live_share(ChatId(1), at, Duration::ZERO).await.unwrap();
            let result = channel.edit_live_share(expired, Position::new(3.0, 3.0, 0)).await;
            assert!(matches!(result, Err(ChannelError::Fatal(_))));
        }
        assert_eq!(channel.tracked_shares(), 1);

        channel.start_live_share(ChatId(2), at, Duration::from_secs(60)).await.unwrap();
        assert_eq!(channel.tracked_shares(), 1);
    }
}
