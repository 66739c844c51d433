//! Deterministic simulation harness for wackelberry testing.
//!
//! Test doubles for every capability the core consumes:
//!
//! - [`SimEnv`]: virtual clock and seeded RNG; sleeps complete instantly (or
//!   never, for cancellation tests)
//! - [`RecordingChannel`]: records every messaging call and returns scripted
//!   failures
//! - [`ScriptedSource`]: replays a script of position samples

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recording_channel;
pub mod scripted_source;
pub mod sim_env;

pub use recording_channel::{ChannelCall, RecordingChannel};
pub use scripted_source::ScriptedSource;
pub use sim_env::SimEnv;
