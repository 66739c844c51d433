//! Live-share runtime.
//!
//! [`LiveShareManager`] drives one [`BroadcastSession`] per chat. The initial
//! sample and the initial share happen inline in [`LiveShareManager::start`]
//! so a failure reaches the caller. The tick loop then runs as a spawned
//! task: it sleeps for the update interval, samples the position source,
//! and executes whatever actions the session emits.
//!
//! # Cancellation
//!
//! Each active session owns a `watch` channel. [`LiveShareManager::cancel`]
//! flips it; the task observes the change at its next suspension point,
//! issues a best-effort stop, and ends with [`EndReason::Cancelled`].
//!
//! # Registry
//!
//! The manager keeps the chats with an active session. A slot is reserved
//! before the first await in `start` and released when the session ends,
//! whichever way it ends, so a chat never runs two sessions at once.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
};
use wackelberry_core::{
    BroadcastAction, BroadcastConfig, BroadcastSession, ChatId, EndReason, Environment,
    MessagingChannel, Position, PositionSource, SessionStats,
};

use crate::error::LiveShareError;

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Chat the session shared to
    pub chat: ChatId,
    /// Why the session ended
    pub reason: EndReason,
    /// Counters at the end of the session
    pub stats: SessionStats,
    /// Last position the channel accepted
    pub last_published: Option<Position>,
}

/// Handle to a running session.
#[derive(Debug)]
pub struct LiveShareHandle {
    chat: ChatId,
    task: JoinHandle<SessionReport>,
}

impl LiveShareHandle {
    /// Chat the session shares to.
    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Returns true once the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    pub async fn join(self) -> Result<SessionReport, LiveShareError> {
        self.task.await.map_err(|err| LiveShareError::TaskFailed(err.to_string()))
    }
}

#[derive(Default)]
struct Registry {
    active: Mutex<HashMap<ChatId, watch::Sender<bool>>>,
    idle: Notify,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<ChatId, watch::Sender<bool>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reserved registry slot. Dropping it releases the chat.
struct Slot {
    registry: Arc<Registry>,
    chat: ChatId,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let now_idle = {
            let mut active = self.registry.lock();
            active.remove(&self.chat);
            active.is_empty()
        };

        if now_idle {
            self.registry.idle.notify_waiters();
        }
    }
}

/// Starts, tracks, and cancels live shares.
pub struct LiveShareManager<C, P, E>
where
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
{
    channel: Arc<C>,
    source: Arc<P>,
    env: E,
    config: BroadcastConfig,
    registry: Arc<Registry>,
}

impl<C, P, E> LiveShareManager<C, P, E>
where
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
{
    /// Create a manager publishing through `channel` from `source`.
    pub fn new(channel: Arc<C>, source: Arc<P>, env: E, config: BroadcastConfig) -> Self {
        Self { channel, source, env, config, registry: Arc::new(Registry::default()) }
    }

    /// Settings applied to every new session.
    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Returns true if `chat` has an active session.
    pub fn is_sharing(&self, chat: ChatId) -> bool {
        self.registry.lock().contains_key(&chat)
    }

    /// Number of active sessions.
    pub fn active_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Publish a live share to `chat` and keep it updated in the background.
    ///
    /// # Errors
    ///
    /// - [`LiveShareError::AlreadySharing`] if `chat` has an active session
    /// - [`LiveShareError::Channel`] if the initial share was rejected
    pub async fn start(&self, chat: ChatId) -> Result<LiveShareHandle, LiveShareError> {
        let (slot, cancel) = self.reserve(chat)?;

        let mut session = BroadcastSession::new(chat, self.config);
        let sample = self.source.sample().await;

        let mut initial = Vec::new();
        for action in session.start(sample) {
            match action {
                BroadcastAction::StartShare { chat, position, duration } => {
                    let result = self.channel.start_live_share(chat, position, duration).await;
                    initial.extend(session.on_started(result));
                },
                other => initial.push(other),
            }
        }

        if let Some(EndReason::StartFailed(err)) = session.end_reason() {
            tracing::warn!(chat_id = %chat, error = %err, "live share not started");
            return Err(LiveShareError::Channel(err.clone()));
        }

        tracing::info!(
            chat_id = %chat,
            ticks = session.remaining_ticks(),
            interval_secs = session.update_interval().as_secs(),
            "live share started"
        );

        let task = SessionTask {
            channel: Arc::clone(&self.channel),
            source: Arc::clone(&self.source),
            env: self.env.clone(),
            session,
            cancel,
            _slot: slot,
        };

        Ok(LiveShareHandle { chat, task: tokio::spawn(task.run(initial)) })
    }

    /// Ask the session of `chat` to stop.
    ///
    /// Returns once the request is recorded; the session ends at its next
    /// suspension point.
    pub fn cancel(&self, chat: ChatId) -> Result<(), LiveShareError> {
        match self.registry.lock().get(&chat) {
            Some(cancel) => {
                cancel.send_replace(true);
                tracing::debug!(chat_id = %chat, "live share cancellation requested");
                Ok(())
            },
            None => Err(LiveShareError::NotSharing(chat)),
        }
    }

    /// Ask every active session to stop. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let active = self.registry.lock();
        for cancel in active.values() {
            cancel.send_replace(true);
        }
        active.len()
    }

    /// Wait until no session is active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.registry.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.registry.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn reserve(&self, chat: ChatId) -> Result<(Slot, watch::Receiver<bool>), LiveShareError> {
        let mut active = self.registry.lock();
        if active.contains_key(&chat) {
            return Err(LiveShareError::AlreadySharing(chat));
        }

        let (sender, receiver) = watch::channel(false);
        active.insert(chat, sender);

        Ok((Slot { registry: Arc::clone(&self.registry), chat }, receiver))
    }
}

/// Background half of a session.
struct SessionTask<C, P, E> {
    channel: Arc<C>,
    source: Arc<P>,
    env: E,
    session: BroadcastSession,
    cancel: watch::Receiver<bool>,
    _slot: Slot,
}

impl<C, P, E> SessionTask<C, P, E>
where
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
{
    async fn run(mut self, initial: Vec<BroadcastAction>) -> SessionReport {
        self.execute(initial).await;

        let interval = self.session.update_interval();
        let reason = loop {
            if let Some(reason) = self.session.end_reason() {
                break reason.clone();
            }

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.changed() => true,
                () = self.env.sleep(interval) => false,
            };

            let actions = if cancelled {
                self.session.cancel()
            } else {
                let sample = self.source.sample().await;
                self.session.on_tick(sample)
            };
            self.execute(actions).await;
        };

        SessionReport {
            chat: self.session.chat(),
            reason,
            stats: self.session.stats(),
            last_published: self.session.last_published(),
        }
    }

    async fn execute(&mut self, actions: Vec<BroadcastAction>) {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                BroadcastAction::StartShare { chat, position, duration } => {
                    let result = self.channel.start_live_share(chat, position, duration).await;
                    queue.extend(self.session.on_started(result));
                },
                BroadcastAction::EditShare { handle, position } => {
                    let result = self.channel.edit_live_share(handle, position).await;
                    if let Err(err) = &result {
                        tracing::debug!(chat_id = %handle.chat, error = %err, "edit rejected");
                    }
                    queue.extend(self.session.on_edit_result(result));
                },
                BroadcastAction::StopShare { handle } => {
                    if let Err(err) = self.channel.stop_live_share(handle).await {
                        tracing::warn!(chat_id = %handle.chat, error = %err, "stop failed");
                    }
                },
                BroadcastAction::Finished(reason) => {
                    let stats = self.session.stats();
                    tracing::info!(
                        chat_id = %self.session.chat(),
                        reason = ?reason,
                        ticks = stats.ticks,
                        edits = stats.edits,
                        skipped = stats.skipped,
                        degraded = stats.degraded,
                        "live share finished"
                    );
                },
            }
        }
    }
}
