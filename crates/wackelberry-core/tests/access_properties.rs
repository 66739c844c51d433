//! Property-based tests for the access rules.
//!
//! These verify invariants that must hold for every directory shape, not
//! just the hand-picked scenarios in the unit tests.

use proptest::prelude::*;
use wackelberry_core::{
    AccessError, Caller, Operation, RegisterOutcome, UserDirectory, UserId, UserRecord,
    UserStatus, access,
};

fn arb_record() -> impl Strategy<Value = UserRecord> {
    (-50i64..50, any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(id, approved, pending, admin, blocked)| UserRecord {
            id: UserId::new(id),
            name: format!("user {id}"),
            approved,
            pending,
            admin,
            blocked,
        },
    )
}

fn arb_directory() -> impl Strategy<Value = UserDirectory> {
    prop::collection::vec(arb_record(), 0..20).prop_map(UserDirectory::from_records)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: status follows admin > approved > pending > blocked
    #[test]
    fn prop_status_precedence(record in arb_record()) {
        let expected = if record.admin {
            UserStatus::Admin
        } else if record.approved {
            UserStatus::Approved
        } else if record.pending {
            UserStatus::Pending
        } else if record.blocked {
            UserStatus::Blocked
        } else {
            UserStatus::Unknown
        };

        let directory = UserDirectory::from_records([record.clone()]);
        prop_assert_eq!(directory.status(record.id), expected);
    }

    /// Property: a second register never changes the directory
    #[test]
    fn prop_register_idempotent(mut directory in arb_directory(), id in -60i64..60) {
        let caller = Caller::new(UserId::new(id), "Caller");

        register_once(&mut directory, &caller);
        let after_first: Vec<UserRecord> = directory.records().cloned().collect();
        directory.mark_clean();

        let second = access::register(&mut directory, &caller);

        prop_assert!(matches!(second, RegisterOutcome::AlreadyRegistered(_)));
        prop_assert!(!directory.is_dirty());
        prop_assert_eq!(directory.records().cloned().collect::<Vec<_>>(), after_first);
    }

    /// Property: approve succeeds only for admin callers
    #[test]
    fn prop_approve_requires_admin(
        mut directory in arb_directory(),
        caller in -60i64..60,
        target in -60i64..60,
    ) {
        let caller = UserId::new(caller);
        let caller_status = directory.status(caller);

        let result = access::approve(&mut directory, caller, &target.to_string());

        if caller_status != UserStatus::Admin {
            let denied = AccessError::PermissionDenied {
                operation: Operation::Approve,
                status: caller_status,
            };
            prop_assert_eq!(result, Err(denied));
            prop_assert!(!directory.is_dirty());
        }
    }

    /// Property: a record with the blocked flag is never approvable by an admin
    #[test]
    fn prop_blocked_never_approved(mut directory in arb_directory(), target in arb_record()) {
        let admin = UserId::new(1000);
        directory.insert(UserRecord { admin: true, ..UserRecord::pending(admin, "Admin") });

        let target = UserRecord { blocked: true, ..target };
        directory.insert(target.clone());
        directory.mark_clean();

        let result = access::approve(&mut directory, admin, &target.id.to_string());

        prop_assert_eq!(result, Err(AccessError::InvalidState(target.id)));
        prop_assert!(!directory.is_dirty());
        prop_assert_eq!(directory.get(target.id), Some(&target));
    }

    /// Property: successful approval always yields approved, not pending
    #[test]
    fn prop_approve_success_shape(mut directory in arb_directory(), target in -50i64..50) {
        let admin = UserId::new(1000);
        directory.insert(UserRecord { admin: true, ..UserRecord::pending(admin, "Admin") });

        if let Ok(record) = access::approve(&mut directory, admin, &target.to_string()) {
            prop_assert!(record.approved);
            prop_assert!(!record.pending);
            prop_assert!(!record.blocked);
            prop_assert!(directory.status(record.id).can_share());
        }
    }
}

fn register_once(directory: &mut UserDirectory, caller: &Caller) {
    let before = directory.status(caller.id);
    let outcome = access::register(directory, caller);

    match outcome {
        RegisterOutcome::Created(record) => {
            assert_eq!(before, UserStatus::Unknown);
            assert_eq!(record.status(), UserStatus::Pending);
        },
        RegisterOutcome::AlreadyRegistered(status) => assert_eq!(status, before),
    }
}
