//! User-visible texts.
//!
//! Every command produces exactly one [`Reply`] to the caller. Messages that
//! go to someone other than the caller are [`Notice`]s. Both render through
//! `Display`, so the wording lives in one place.

use std::{fmt, time::Duration};

use wackelberry_core::{AccessError, Operation, UserId, UserStatus};

use crate::error::{CommandError, LiveShareError};

/// Answer to the user who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `/register` by an approved user or an admin
    AlreadyRegistered,
    /// `/register` while awaiting approval
    RegistrationPending,
    /// `/register` by a blocked user
    Blocked,
    /// `/register` created a pending record
    RegistrationSent,

    /// `/approve` by a non-admin
    NotAllowedToApprove,
    /// `/approve` without an argument
    ApproveUsage,
    /// `/approve` with an argument that is not a user id
    InvalidUserId,
    /// `/approve` targeting a blocked user
    TargetBlocked(UserId),
    /// `/approve` targeting a user that is not pending
    NoSuchPendingUser,
    /// `/approve` succeeded
    Approved {
        /// Approved user's display name
        name: String,
        /// Approved user's id
        id: UserId,
    },

    /// `/live` by a user who may not share
    NotApprovedForLive,
    /// `/live` published a live share
    LiveStarted {
        /// Validity of the share
        duration: Duration,
    },
    /// `/live` while the chat already has a live share
    AlreadySharing,
    /// `/live` could not publish the initial share
    LiveUnavailable,
    /// `/stop` ended the live share
    LiveStopped,
    /// `/stop` without an active live share
    NotSharing,

    /// `/status`
    Status(UserStatus),

    /// The user document could not be read or written
    StorageFailure,
    /// Unrecognized command
    UnknownCommand(String),
}

impl Reply {
    /// Reply for a `/register` whose caller already had `status`.
    pub fn for_existing_registration(status: UserStatus) -> Self {
        match status {
            UserStatus::Pending => Self::RegistrationPending,
            UserStatus::Blocked => Self::Blocked,
            UserStatus::Approved | UserStatus::Admin | UserStatus::Unknown => {
                Self::AlreadyRegistered
            },
        }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Access(AccessError::PermissionDenied {
                operation: Operation::Approve,
                ..
            }) => Self::NotAllowedToApprove,
            CommandError::Access(AccessError::PermissionDenied {
                operation: Operation::LiveShare,
                ..
            }) => Self::NotApprovedForLive,
            CommandError::Access(AccessError::InvalidArgument(_)) => Self::InvalidUserId,
            CommandError::Access(AccessError::InvalidState(id)) => Self::TargetBlocked(id),
            CommandError::Access(AccessError::NotFound(_)) => Self::NoSuchPendingUser,
            CommandError::Storage(_) => Self::StorageFailure,
        }
    }
}

impl From<LiveShareError> for Reply {
    fn from(err: LiveShareError) -> Self {
        match err {
            LiveShareError::AlreadySharing(_) => Self::AlreadySharing,
            LiveShareError::NotSharing(_) => Self::NotSharing,
            LiveShareError::Channel(_) | LiveShareError::TaskFailed(_) => Self::LiveUnavailable,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered => f.write_str("✅ You're already registered."),
            Self::RegistrationPending => f.write_str("🕒 Your registration is pending."),
            Self::Blocked => f.write_str("⛔ You're blocked from using this bot."),
            Self::RegistrationSent => {
                f.write_str("📨 Registration request sent. Please wait for approval.")
            },
            Self::NotAllowedToApprove => f.write_str("⛔ You're not allowed to approve users."),
            Self::ApproveUsage => f.write_str("Usage: /approve <user_id>"),
            Self::InvalidUserId => f.write_str("❌ Invalid user ID."),
            Self::TargetBlocked(id) => {
                write!(f, "⛔ User {id} is blocked and cannot be approved.")
            },
            Self::NoSuchPendingUser => f.write_str("ℹ️ No such user in pending list."),
            Self::Approved { name, id } => {
                write!(f, "✅ Approval recorded for {name} (ID: {id}).")
            },
            Self::NotApprovedForLive => {
                f.write_str("❌ You're not approved to access the location. Use /register.")
            },
            Self::LiveStarted { duration } => {
                write!(f, "📍 Live location started for {}.", Span(*duration))
            },
            Self::AlreadySharing => f.write_str("📍 Live location is already being shared here."),
            Self::LiveUnavailable => f.write_str("⚠️ Could not start the live location."),
            Self::LiveStopped => f.write_str("🛑 Live location stopped."),
            Self::NotSharing => f.write_str("ℹ️ No live location is being shared here."),
            Self::Status(status) => write!(f, "ℹ️ Your status: {status}."),
            Self::StorageFailure => {
                f.write_str("⚠️ Something went wrong. Please try again later.")
            },
            Self::UnknownCommand(name) => {
                write!(f, "Unknown command {name}. Try /register, /approve, /live or /status.")
            },
        }
    }
}

/// Message sent to someone other than the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// To every admin: a user asked to register
    RegistrationRequested {
        /// Requester's display name
        name: String,
        /// Requester's id
        id: UserId,
    },
    /// To every admin: a user was approved
    Approved {
        /// Approved user's display name
        name: String,
        /// Approved user's id
        id: UserId,
    },
    /// To the approved user
    Welcome,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistrationRequested { name, id } => {
                write!(f, "👤 New registration request from {name} (ID: {id})")
            },
            Self::Approved { name, id } => write!(f, "✅ Approved {name} (ID: {id})"),
            Self::Welcome => {
                f.write_str("✅ Your registration has been approved! You can now use /live.")
            },
        }
    }
}

/// Whole minutes when the duration divides evenly, seconds otherwise.
struct Span(Duration);

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_secs() {
            1 => f.write_str("1 second"),
            60 => f.write_str("1 minute"),
            secs if secs > 0 && secs.is_multiple_of(60) => write!(f, "{} minutes", secs / 60),
            secs => write!(f, "{secs} seconds"),
        }
    }
}
