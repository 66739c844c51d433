//! Access rules for registration, approval, and live sharing.
//!
//! Pure functions over a [`UserDirectory`] snapshot. They never perform I/O:
//! the caller loads the snapshot, applies one of these rules while holding
//! the store's lock, and persists the directory if it became dirty.
//!
//! # State machine
//!
//! ```text
//! unknown --register--> pending --approve (admin caller, not blocked)--> approved
//! ```
//!
//! `blocked` and `admin` are only ever set out of band. A record with the
//! `blocked` flag is never approvable, whatever its other flags say.

use crate::{
    error::{AccessError, Operation},
    user::{UserDirectory, UserId, UserRecord, UserStatus},
};

/// Identity of the user issuing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Caller's identifier
    pub id: UserId,
    /// Caller's display name, used when a record is created
    pub name: String,
}

impl Caller {
    /// Create a caller identity.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Result of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A pending record was created.
    Created(UserRecord),
    /// The caller already has a status; nothing changed.
    AlreadyRegistered(UserStatus),
}

/// Register `caller`, creating a pending record if they are unknown.
///
/// Idempotent: a second call for the same caller returns
/// [`RegisterOutcome::AlreadyRegistered`] and leaves the directory clean.
pub fn register(directory: &mut UserDirectory, caller: &Caller) -> RegisterOutcome {
    let status = directory.status(caller.id);
    if status.is_registered() {
        return RegisterOutcome::AlreadyRegistered(status);
    }

    let record = UserRecord::pending(caller.id, caller.name.clone());
    directory.insert(record.clone());

    tracing::debug!(user_id = %caller.id, "created pending record");
    RegisterOutcome::Created(record)
}

/// Approve the user named by `target` on behalf of `caller`.
///
/// Checks, in order: the caller is an admin, `target` parses, the target is
/// not blocked, the target is pending or an admin. On success the target's
/// record has `approved = true, pending = false` and a copy is returned.
pub fn approve(
    directory: &mut UserDirectory,
    caller: UserId,
    target: &str,
) -> Result<UserRecord, AccessError> {
    let caller_status = directory.status(caller);
    if caller_status != UserStatus::Admin {
        return Err(AccessError::PermissionDenied {
            operation: Operation::Approve,
            status: caller_status,
        });
    }

    let target: UserId =
        target.parse().map_err(|_| AccessError::InvalidArgument(target.to_string()))?;

    let status = match directory.get(target) {
        Some(record) if record.blocked => return Err(AccessError::InvalidState(target)),
        Some(record) => record.status(),
        None => UserStatus::Unknown,
    };

    if !matches!(status, UserStatus::Pending | UserStatus::Admin) {
        return Err(AccessError::NotFound(target));
    }

    let record = directory.get_mut(target).ok_or(AccessError::NotFound(target))?;
    record.approved = true;
    record.pending = false;

    tracing::debug!(user_id = %target, approved_by = %caller, "approved user");
    Ok(record.clone())
}

/// Check that `caller` may start a live share.
///
/// Returns the caller's status on success.
pub fn authorize_live_share(
    directory: &UserDirectory,
    caller: UserId,
) -> Result<UserStatus, AccessError> {
    let status = directory.status(caller);
    if status.can_share() {
        Ok(status)
    } else {
        Err(AccessError::PermissionDenied { operation: Operation::LiveShare, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: UserId = UserId::new(1);

    fn admin_directory() -> UserDirectory {
        UserDirectory::from_records([UserRecord {
            admin: true,
            pending: false,
            ..UserRecord::pending(ADMIN, "Admin")
        }])
    }

    #[test]
    fn register_unknown_creates_pending() {
        let mut directory = UserDirectory::new();
        let caller = Caller::new(UserId::new(10), "Ten");

        let outcome = register(&mut directory, &caller);

        assert_eq!(outcome, RegisterOutcome::Created(UserRecord::pending(caller.id, "Ten")));
        assert_eq!(directory.status(caller.id), UserStatus::Pending);
        assert!(directory.is_dirty());
    }

    #[test]
    fn register_is_noop_for_known_statuses() {
        let mut directory = admin_directory();
        let outcome = register(&mut directory, &Caller::new(ADMIN, "Admin"));

        assert_eq!(outcome, RegisterOutcome::AlreadyRegistered(UserStatus::Admin));
        assert!(!directory.is_dirty());
    }

    #[test]
    fn approve_requires_admin_caller() {
        let mut directory = admin_directory();
        directory.insert(UserRecord::pending(UserId::new(2), "Two"));
        directory.mark_clean();

        let err = approve(&mut directory, UserId::new(2), "2").unwrap_err();
        assert_eq!(
            err,
            AccessError::PermissionDenied {
                operation: Operation::Approve,
                status: UserStatus::Pending
            }
        );
        assert!(!directory.is_dirty());
    }

    #[test]
    fn approve_rejects_unparsable_target() {
        let mut directory = admin_directory();
        let err = approve(&mut directory, ADMIN, "bob").unwrap_err();
        assert_eq!(err, AccessError::InvalidArgument("bob".to_string()));
    }

    #[test]
    fn approve_pending_sets_flags() {
        let mut directory = admin_directory();
        directory.insert(UserRecord::pending(UserId::new(2), "Two"));

        let record = approve(&mut directory, ADMIN, "2").unwrap();

        assert!(record.approved);
        assert!(!record.pending);
        assert_eq!(directory.status(UserId::new(2)), UserStatus::Approved);
    }

    #[test]
    fn approve_blocked_flag_wins_over_pending() {
        let mut directory = admin_directory();
        directory.insert(UserRecord { blocked: true, ..UserRecord::pending(UserId::new(3), "X") });
        directory.mark_clean();

        let err = approve(&mut directory, ADMIN, "3").unwrap_err();

        assert_eq!(err, AccessError::InvalidState(UserId::new(3)));
        assert!(!directory.is_dirty());
    }

    #[test]
    fn approve_unknown_or_approved_is_not_found() {
        let mut directory = admin_directory();
        directory.insert(UserRecord {
            approved: true,
            pending: false,
            ..UserRecord::pending(UserId::new(4), "Four")
        });

        let missing = approve(&mut directory, ADMIN, "99");
        assert_eq!(missing, Err(AccessError::NotFound(UserId::new(99))));

        let already = approve(&mut directory, ADMIN, "4");
        assert_eq!(already, Err(AccessError::NotFound(UserId::new(4))));
    }

    #[test]
    fn approve_admin_target_is_allowed() {
        let mut directory = admin_directory();
        let record = approve(&mut directory, ADMIN, "1").unwrap();
        assert!(record.approved && record.admin);
    }

    #[test]
    fn live_share_needs_approved_or_admin() {
        let mut directory = admin_directory();
        directory.insert(UserRecord::pending(UserId::new(2), "Two"));

        assert_eq!(authorize_live_share(&directory, ADMIN), Ok(UserStatus::Admin));
        assert_eq!(
            authorize_live_share(&directory, UserId::new(2)),
            Err(AccessError::PermissionDenied {
                operation: Operation::LiveShare,
                status: UserStatus::Pending
            })
        );
        assert!(authorize_live_share(&directory, UserId::new(3)).is_err());
    }
}
