//! Error types for the wackelberry core.
//!
//! Strongly-typed errors for the three seams of the core: access rules
//! (register/approve/live-share authorization), the messaging channel, and
//! the position source.

use std::fmt;

use thiserror::Error;

use crate::user::{UserId, UserStatus};

/// Access-controlled operation, named in permission errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Approving a pending user
    Approve,
    /// Starting a live share
    LiveShare,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => f.write_str("approve"),
            Self::LiveShare => f.write_str("live sharing"),
        }
    }
}

/// Errors produced by the access rules.
///
/// None of these are fatal to the process. The command layer turns each of
/// them into a reply to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The argument is not a parsable user identifier.
    #[error("invalid user identifier: {0:?}")]
    InvalidArgument(String),

    /// The caller's status does not allow the operation.
    #[error("permission denied: {operation} is not allowed for {status} users")]
    PermissionDenied {
        /// Operation that was attempted
        operation: Operation,
        /// Caller's status at the time of the attempt
        status: UserStatus,
    },

    /// The target is blocked and can never be approved.
    #[error("user {0} is blocked")]
    InvalidState(UserId),

    /// The target is neither pending nor an admin.
    #[error("user {0} is not awaiting approval")]
    NotFound(UserId),
}

/// Errors reported by a messaging channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The edit carried exactly the content already shown.
    ///
    /// Channels reject no-op edits; a live share treats this like a
    /// debounced tick.
    #[error("message is not modified")]
    Unmodified,

    /// Temporary failure (rate limit, network hiccup). Retrying later may
    /// succeed.
    #[error("transient channel error: {0}")]
    Transient(String),

    /// Permanent failure (share expired or stopped, chat gone, forbidden).
    #[error("fatal channel error: {0}")]
    Fatal(String),
}

impl ChannelError {
    /// Returns true if a live share must end after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Errors reported by a position source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// No usable fix is available right now.
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// Invalid live-share configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A zero update interval would spin without sleeping.
    #[error("update interval must be greater than zero")]
    ZeroInterval,

    /// The fallback coordinate is not a valid latitude/longitude pair.
    #[error("fallback position out of range: {latitude}, {longitude}")]
    FallbackOutOfRange {
        /// Configured latitude
        latitude: f64,
        /// Configured longitude
        longitude: f64,
    },
}
