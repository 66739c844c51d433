//! Server error types.

use std::fmt;

use thiserror::Error;
use wackelberry_core::{AccessError, ChannelError, ChatId, ConfigError};

use crate::storage::StorageError;

/// Errors from a user-facing command.
///
/// The command layer turns every variant into a reply; none of them reach
/// the admin fanout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The access rules rejected the command.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The user document could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from starting or stopping a live share.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiveShareError {
    /// The chat already has an active live share.
    #[error("chat {0} already has an active live share")]
    AlreadySharing(ChatId),

    /// The chat has no active live share.
    #[error("chat {0} has no active live share")]
    NotSharing(ChatId),

    /// The initial share could not be published.
    #[error("could not start live share: {0}")]
    Channel(ChannelError),

    /// The session task panicked or was aborted.
    #[error("live share task failed: {0}")]
    TaskFailed(String),
}

/// Errors that can occur while starting or running the bot.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (bad interval, bad fallback position, bad path).
    ///
    /// Fatal: prevents startup. Fix configuration and restart.
    Config(String),

    /// User storage could not be opened.
    ///
    /// Fatal at startup; individual commands report storage errors as
    /// replies instead.
    Storage(StorageError),

    /// Console I/O error.
    Io(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for ServerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
