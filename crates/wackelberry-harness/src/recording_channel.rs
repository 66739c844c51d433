//! Messaging channel double that records every call.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use wackelberry_core::{ChannelError, ChatId, MessageHandle, MessagingChannel, Position};

/// One call made against a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    /// `send_text`
    SendText {
        /// Recipient chat
        recipient: ChatId,
        /// Message text
        text: String,
    },
    /// `start_live_share`
    StartShare {
        /// Recipient chat
        recipient: ChatId,
        /// Initial position
        position: Position,
        /// Share validity
        duration: Duration,
    },
    /// `edit_live_share`
    EditShare {
        /// Edited share
        handle: MessageHandle,
        /// New position
        position: Position,
    },
    /// `stop_live_share`
    StopShare {
        /// Stopped share
        handle: MessageHandle,
    },
}

#[derive(Default)]
struct ChannelState {
    calls: Vec<ChannelCall>,
    next_message_id: i64,
    failing_recipients: HashMap<ChatId, ChannelError>,
    start_error: Option<ChannelError>,
    stop_error: Option<ChannelError>,
    edit_results: VecDeque<Result<(), ChannelError>>,
}

/// Channel double for tests.
///
/// Every call is recorded, including failed ones. Failures are scripted:
/// per-recipient text failures, a start failure, a stop failure, and a queue
/// of edit results (edits succeed once the queue is empty). Clones share
/// state.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl RecordingChannel {
    /// Channel on which every call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `send_text` to `recipient` fail with `error`.
    pub fn fail_sends_to(&self, recipient: ChatId, error: ChannelError) {
        self.lock().failing_recipients.insert(recipient, error);
    }

    /// Make every `start_live_share` fail with `error`.
    pub fn fail_start(&self, error: ChannelError) {
        self.lock().start_error = Some(error);
    }

    /// Make every `stop_live_share` fail with `error`.
    pub fn fail_stop(&self, error: ChannelError) {
        self.lock().stop_error = Some(error);
    }

    /// Queue results for upcoming `edit_live_share` calls.
    pub fn script_edits(&self, results: impl IntoIterator<Item = Result<(), ChannelError>>) {
        self.lock().edit_results.extend(results);
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.lock().calls.clone()
    }

    /// Texts sent to `recipient`, in order.
    pub fn texts_to(&self, recipient: ChatId) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::SendText { recipient: r, text } if *r == recipient => {
                    Some(text.clone())
                },
                _ => None,
            })
            .collect()
    }

    /// Positions of all edit calls, in order.
    pub fn edits(&self) -> Vec<Position> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::EditShare { position, .. } => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// Number of `start_live_share` calls.
    pub fn start_count(&self) -> usize {
        self.count(|call| matches!(call, ChannelCall::StartShare { .. }))
    }

    /// Number of `stop_live_share` calls.
    pub fn stop_count(&self) -> usize {
        self.count(|call| matches!(call, ChannelCall::StopShare { .. }))
    }

    fn count(&self, predicate: impl Fn(&ChannelCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessagingChannel for RecordingChannel {
    async fn send_text(&self, recipient: ChatId, text: &str) -> Result<(), ChannelError> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::SendText { recipient, text: text.to_string() });

        match state.failing_recipients.get(&recipient) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn start_live_share(
        &self,
        recipient: ChatId,
        position: Position,
        duration: Duration,
    ) -> Result<MessageHandle, ChannelError> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::StartShare { recipient, position, duration });

        if let Some(error) = state.start_error.clone() {
            return Err(error);
        }

        state.next_message_id += 1;
        Ok(MessageHandle { chat: recipient, message_id: state.next_message_id })
    }

    async fn edit_live_share(
        &self,
        handle: MessageHandle,
        position: Position,
    ) -> Result<(), ChannelError> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::EditShare { handle, position });
        state.edit_results.pop_front().unwrap_or(Ok(()))
    }

    async fn stop_live_share(&self, handle: MessageHandle) -> Result<(), ChannelError> {
        let mut state = self.lock();
        state.calls.push(ChannelCall::StopShare { handle });

        match state.stop_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
