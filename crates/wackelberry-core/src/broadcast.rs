//! Live-share state machine.
//!
//! A [`BroadcastSession`] owns one bounded-duration live share for one chat.
//! It is Sans-IO: every input (a position sample, a channel result, a cancel
//! request) returns the [`BroadcastAction`]s the runtime must execute, and the
//! runtime feeds the results back in. The runtime also owns the clock: it
//! sleeps `update_interval` before each [`BroadcastSession::on_tick`].
//!
//! # Lifecycle
//!
//! ```text
//! Idle --start--> Starting --on_started(Ok)--> Live
//!                    |                          |--budget spent--> Finished(Expired)
//!                    |                          |--fatal edit----> StopShare, ChannelFailed
//!                    |                          '--cancel--------> StopShare, Cancelled
//!                    '--on_started(Err)--> Finished(StartFailed)
//! ```
//!
//! # Invariants
//!
//! - At most `tick_budget()` ticks are processed.
//! - A tick whose sample equals the last published one emits no edit.
//! - At most one edit is in flight; ticks are ignored until its result is fed
//!   back.

use std::time::Duration;

use crate::{
    channel::{ChatId, MessageHandle},
    error::{ChannelError, ConfigError, PositionError},
    position::Position,
};

/// Timing and fallback settings of a live share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadcastConfig {
    /// Sleep between two samples
    pub update_interval: Duration,
    /// Validity of the live share on the channel
    pub total_duration: Duration,
    /// Published whenever the position source has no fix
    pub fallback: Position,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(15),
            total_duration: Duration::from_secs(3600),
            fallback: Position::new(37.7749, -122.4194, 0),
        }
    }
}

impl BroadcastConfig {
    /// Number of sample/compare cycles: `floor(total_duration / update_interval)`.
    ///
    /// Zero when the interval is zero.
    pub fn tick_budget(&self) -> u32 {
        let interval = self.update_interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        u32::try_from(self.total_duration.as_nanos() / interval).unwrap_or(u32::MAX)
    }

    /// Reject settings the runtime cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }

        let Position { latitude, longitude, .. } = self.fallback;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::FallbackOutOfRange { latitude, longitude });
        }

        Ok(())
    }
}

/// Side effects requested by a [`BroadcastSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastAction {
    /// Publish a new live share; feed the result to `on_started`.
    StartShare {
        /// Chat receiving the share
        chat: ChatId,
        /// Initial position
        position: Position,
        /// Validity of the share
        duration: Duration,
    },

    /// Move the live share; feed the result to `on_edit_result`.
    EditShare {
        /// Share to edit
        handle: MessageHandle,
        /// New position
        position: Position,
    },

    /// Stop the live share. Best-effort: the result is not fed back.
    StopShare {
        /// Share to stop
        handle: MessageHandle,
    },

    /// The session is over. No further actions will be produced.
    Finished(EndReason),
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Tick budget exhausted; the share expires on its own
    Expired,
    /// An edit failed fatally
    ChannelFailed(ChannelError),
    /// Stopped on request
    Cancelled,
    /// The initial share could not be published
    StartFailed(ChannelError),
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing published yet
    Idle,
    /// Initial share requested
    Starting,
    /// Share published, ticking
    Live,
    /// Terminated
    Finished,
}

/// Counters describing what a session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Ticks processed
    pub ticks: u32,
    /// Edits requested
    pub edits: u32,
    /// Ticks debounced because the sample did not change
    pub skipped: u32,
    /// Samples replaced by the fallback position
    pub degraded: u32,
}

/// One live share for one chat.
#[derive(Debug, Clone)]
pub struct BroadcastSession {
    chat: ChatId,
    config: BroadcastConfig,
    phase: SessionPhase,
    handle: Option<MessageHandle>,
    last_published: Option<Position>,
    in_flight: Option<Position>,
    remaining_ticks: u32,
    stats: SessionStats,
    end_reason: Option<EndReason>,
}

impl BroadcastSession {
    /// Create an idle session for `chat`.
    pub fn new(chat: ChatId, config: BroadcastConfig) -> Self {
        Self {
            chat,
            config,
            phase: SessionPhase::Idle,
            handle: None,
            last_published: None,
            in_flight: None,
            remaining_ticks: config.tick_budget(),
            stats: SessionStats::default(),
            end_reason: None,
        }
    }

    /// Begin the share with the first sample.
    pub fn start(&mut self, sample: Result<Position, PositionError>) -> Vec<BroadcastAction> {
        if self.phase != SessionPhase::Idle {
            return Vec::new();
        }

        let position = self.resolve(sample);
        self.in_flight = Some(position);
        self.phase = SessionPhase::Starting;

        vec![BroadcastAction::StartShare {
            chat: self.chat,
            position,
            duration: self.config.total_duration,
        }]
    }

    /// Feed back the result of [`BroadcastAction::StartShare`].
    pub fn on_started(
        &mut self,
        result: Result<MessageHandle, ChannelError>,
    ) -> Vec<BroadcastAction> {
        if self.phase != SessionPhase::Starting {
            return Vec::new();
        }

        let published = self.in_flight.take();
        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.last_published = published;
                self.phase = SessionPhase::Live;
                self.expire_if_spent()
            },
            Err(err) => self.finish(EndReason::StartFailed(err)),
        }
    }

    /// Process one tick with a fresh sample.
    ///
    /// Emits an edit only if the sample differs from the last published one.
    pub fn on_tick(&mut self, sample: Result<Position, PositionError>) -> Vec<BroadcastAction> {
        if self.phase != SessionPhase::Live || self.in_flight.is_some() {
            return Vec::new();
        }
        let Some(handle) = self.handle else {
            return Vec::new();
        };

        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.stats.ticks += 1;

        let position = self.resolve(sample);
        if self.last_published.is_some_and(|last| last.same_as(&position)) {
            self.stats.skipped += 1;
            return self.expire_if_spent();
        }

        self.in_flight = Some(position);
        self.stats.edits += 1;
        vec![BroadcastAction::EditShare { handle, position }]
    }

    /// Feed back the result of [`BroadcastAction::EditShare`].
    pub fn on_edit_result(&mut self, result: Result<(), ChannelError>) -> Vec<BroadcastAction> {
        let Some(position) = self.in_flight.take() else {
            return Vec::new();
        };

        match result {
            Ok(()) | Err(ChannelError::Unmodified) => {
                self.last_published = Some(position);
            },
            Err(err) if err.is_fatal() => {
                let mut actions = self.stop_action();
                actions.extend(self.finish(EndReason::ChannelFailed(err)));
                return actions;
            },
            Err(err) => {
                tracing::debug!(chat_id = %self.chat, error = %err, "transient edit failure");
            },
        }

        self.expire_if_spent()
    }

    /// Stop the session on request.
    ///
    /// A live share gets a best-effort stop. Cancelling a finished session
    /// does nothing.
    pub fn cancel(&mut self) -> Vec<BroadcastAction> {
        if self.phase == SessionPhase::Finished {
            return Vec::new();
        }

        self.in_flight = None;
        let mut actions = self.stop_action();
        actions.extend(self.finish(EndReason::Cancelled));
        actions
    }

    /// Chat this session shares to.
    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Returns true once a [`BroadcastAction::Finished`] was emitted.
    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    /// Handle of the published share, once started.
    pub fn handle(&self) -> Option<MessageHandle> {
        self.handle
    }

    /// Last position the channel accepted.
    pub fn last_published(&self) -> Option<Position> {
        self.last_published
    }

    /// Ticks left in the budget.
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Interval the runtime sleeps before each tick.
    pub fn update_interval(&self) -> Duration {
        self.config.update_interval
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Why the session ended, once finished.
    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    fn resolve(&mut self, sample: Result<Position, PositionError>) -> Position {
        match sample {
            Ok(position) => position,
            Err(err) => {
                self.stats.degraded += 1;
                tracing::warn!(chat_id = %self.chat, error = %err, "using fallback position");
                self.config.fallback
            },
        }
    }

    fn stop_action(&self) -> Vec<BroadcastAction> {
        match (self.phase, self.handle) {
            (SessionPhase::Live, Some(handle)) => vec![BroadcastAction::StopShare { handle }],
            _ => Vec::new(),
        }
    }

    fn expire_if_spent(&mut self) -> Vec<BroadcastAction> {
        if self.remaining_ticks == 0 { self.finish(EndReason::Expired) } else { Vec::new() }
    }

    fn finish(&mut self, reason: EndReason) -> Vec<BroadcastAction> {
        debug_assert_ne!(self.phase, SessionPhase::Finished);

        self.phase = SessionPhase::Finished;
        self.end_reason = Some(reason.clone());
        vec![BroadcastAction::Finished(reason)]
    }
}
