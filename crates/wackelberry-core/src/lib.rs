//! Core logic of the wackelberry location bot.
//!
//! Sans-IO building blocks shared by the production server and the test
//! harness:
//!
//! - [`user`]: user records, derived status, indexed directory snapshot
//! - [`access`]: register / approve / live-share authorization rules
//! - [`broadcast`]: the live-share state machine with debouncing and a tick
//!   budget
//! - [`channel`] and [`position`]: capabilities the runtime plugs in
//! - [`env`]: time and randomness abstraction
//!
//! Nothing here performs I/O. Runtimes execute the actions these types emit
//! and feed results back, so the same logic runs in production and under a
//! virtual clock.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod access;
pub mod broadcast;
pub mod channel;
pub mod env;
pub mod error;
pub mod position;
pub mod user;

pub use access::{Caller, RegisterOutcome};
pub use broadcast::{
    BroadcastAction, BroadcastConfig, BroadcastSession, EndReason, SessionPhase, SessionStats,
};
pub use channel::{ChatId, MessageHandle, MessagingChannel};
pub use env::Environment;
pub use error::{AccessError, ChannelError, ConfigError, Operation, PositionError};
pub use position::{Position, PositionSource};
pub use user::{ParseUserIdError, UserDirectory, UserId, UserRecord, UserStatus};
